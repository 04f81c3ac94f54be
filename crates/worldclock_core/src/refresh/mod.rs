//! Periodic refresh of time-displaying surfaces.
//!
//! # Responsibility
//! - Provide a replaceable wall-clock source.
//! - Drive the foreground tick that makes displayed times advance.
//! - Plan and re-register background widget refreshes through the host's
//!   alarm facility.
//! - Redraw widget surfaces as soon as the list or home zone changes.
//!
//! # Invariants
//! - Nothing in this module writes the zone list or the home zone.

pub mod follow;
pub mod ticker;
pub mod time_source;
pub mod widget_refresh;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Returns the start of the wall-clock minute after `now`.
///
/// A `now` exactly on a boundary yields the following minute.
pub fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let minute = TimeDelta::minutes(1);
    let floored = now.duration_trunc(minute).unwrap_or(now);
    floored + minute
}
