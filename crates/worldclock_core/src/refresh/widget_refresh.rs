//! Background widget refresh planning.
//!
//! # Responsibility
//! - Decide when the next widget refresh should fire.
//! - Re-register that firing through the host alarm facility on every
//!   widget lifecycle callback, then ask the host to redraw.
//!
//! # Invariants
//! - `on_alarm` re-registers the next firing before refreshing surfaces.
//! - Denied exact scheduling degrades to an inexact firing ~60s out.
//! - Only surfaces are refreshed; list/home state is never written here.

use super::next_minute_boundary;
use super::time_source::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Delay used when the host refuses exact scheduling.
pub const INEXACT_REFRESH_DELAY_SECS: i64 = 60;

/// When and how precisely the next refresh is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    /// Fire exactly at the given minute boundary.
    Exact(DateTime<Utc>),
    /// Fire at roughly the given instant.
    Inexact(DateTime<Utc>),
}

impl RefreshPlan {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Exact(at) | Self::Inexact(at) => *at,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

/// Plans the next refresh from `now`.
pub fn plan_next_refresh(now: DateTime<Utc>, exact_allowed: bool) -> RefreshPlan {
    if exact_allowed {
        RefreshPlan::Exact(next_minute_boundary(now))
    } else {
        inexact_plan(now)
    }
}

fn inexact_plan(now: DateTime<Utc>) -> RefreshPlan {
    RefreshPlan::Inexact(now + TimeDelta::seconds(INEXACT_REFRESH_DELAY_SECS))
}

/// Host alarm registration failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Host refused the request, e.g. exact alarms not permitted.
    Denied(String),
    /// Alarm facility could not be reached.
    Unavailable(String),
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied(reason) => write!(f, "alarm scheduling denied: {reason}"),
            Self::Unavailable(reason) => write!(f, "alarm facility unavailable: {reason}"),
        }
    }
}

impl Error for ScheduleError {}

/// Host facility that wakes the widget receiver at a given instant.
///
/// Registering a new firing replaces any pending one.
pub trait AlarmScheduler {
    fn can_schedule_exact(&self) -> bool;
    fn schedule_exact(&self, at: DateTime<Utc>) -> Result<(), ScheduleError>;
    fn schedule_inexact(&self, at: DateTime<Utc>) -> Result<(), ScheduleError>;
    fn cancel(&self);
}

/// Host hook that redraws every placed widget instance.
pub trait SurfaceRefresher {
    fn refresh_all(&self) -> Result<(), String>;
}

/// Result of handling one alarm firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmReport {
    /// Next registered firing; `None` when registration failed.
    pub next: Option<RefreshPlan>,
    /// Whether every surface redrew successfully.
    pub refreshed: bool,
}

/// Drives the self-rescheduling widget refresh cycle.
pub struct WidgetRefresher<A, R> {
    alarms: A,
    surfaces: R,
    clock: Arc<dyn Clock>,
}

impl<A: AlarmScheduler, R: SurfaceRefresher> WidgetRefresher<A, R> {
    pub fn new(alarms: A, surfaces: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            alarms,
            surfaces,
            clock,
        }
    }

    pub fn alarms(&self) -> &A {
        &self.alarms
    }

    pub fn surfaces(&self) -> &R {
        &self.surfaces
    }

    /// First widget placed: start the refresh cycle.
    pub fn on_enabled(&self) -> Result<RefreshPlan, ScheduleError> {
        self.schedule_next()
    }

    /// Host-initiated update: make sure a firing is pending.
    pub fn on_update(&self) -> Result<RefreshPlan, ScheduleError> {
        self.schedule_next()
    }

    /// Alarm fired: register the next firing, then redraw.
    pub fn on_alarm(&self) -> AlarmReport {
        let next = self.schedule_next().ok();

        let refreshed = match self.surfaces.refresh_all() {
            Ok(()) => {
                info!("event=widget_refresh module=refresh status=ok");
                true
            }
            Err(err) => {
                error!("event=widget_refresh module=refresh status=error error={err}");
                false
            }
        };

        AlarmReport { next, refreshed }
    }

    /// Last widget removed: stop the cycle.
    pub fn on_disabled(&self) {
        self.alarms.cancel();
        info!("event=widget_schedule module=refresh status=cancelled");
    }

    /// Registers the next firing, preferring an exact minute boundary.
    pub fn schedule_next(&self) -> Result<RefreshPlan, ScheduleError> {
        let now = self.clock.now();

        if self.alarms.can_schedule_exact() {
            let plan = plan_next_refresh(now, true);
            match self.alarms.schedule_exact(plan.at()) {
                Ok(()) => {
                    info!(
                        "event=widget_schedule module=refresh status=ok mode=exact at={}",
                        plan.at().to_rfc3339()
                    );
                    return Ok(plan);
                }
                Err(err) => {
                    warn!(
                        "event=widget_schedule module=refresh status=fallback mode=exact error={err}"
                    );
                }
            }
        } else {
            warn!("event=widget_schedule module=refresh status=fallback reason=exact_not_permitted");
        }

        let plan = inexact_plan(now);
        match self.alarms.schedule_inexact(plan.at()) {
            Ok(()) => {
                info!(
                    "event=widget_schedule module=refresh status=ok mode=inexact at={}",
                    plan.at().to_rfc3339()
                );
                Ok(plan)
            }
            Err(err) => {
                error!("event=widget_schedule module=refresh status=error mode=inexact error={err}");
                Err(err)
            }
        }
    }
}
