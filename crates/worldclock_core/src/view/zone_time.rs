//! Per-zone wall time and zone catalogue lookups.
//!
//! Offset and local-time computation is delegated to the `chrono-tz`
//! database; this module only formats the results.

use crate::model::zone::ZoneId;
use chrono::{DateTime, Offset, Utc};
use chrono_tz::{Tz, TZ_VARIANTS};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Display-ready time of one zone at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTime {
    pub zone: ZoneId,
    /// Full name with underscores as spaces.
    pub display_name: String,
    /// Last path segment with underscores as spaces.
    pub city_name: String,
    /// 24-hour `HH:MM`.
    pub local_time: String,
    /// `UTC+HH:MM` / `UTC-HH:MM`.
    pub offset_label: String,
    pub offset_seconds: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// Zone id is not present in the timezone database.
    UnknownZone(ZoneId),
}

impl Display for ClockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownZone(zone) => write!(f, "unknown timezone: {zone}"),
        }
    }
}

impl Error for ClockError {}

/// Looks a zone id up in the timezone database.
pub fn resolve_zone(zone: &ZoneId) -> Result<Tz, ClockError> {
    zone.as_str()
        .parse::<Tz>()
        .map_err(|_| ClockError::UnknownZone(zone.clone()))
}

/// Computes the wall time of `zone` at `now`.
pub fn zone_time(zone: &ZoneId, now: DateTime<Utc>) -> Result<ZoneTime, ClockError> {
    let tz = resolve_zone(zone)?;
    let local = now.with_timezone(&tz);
    let offset_seconds = local.offset().fix().local_minus_utc();

    Ok(ZoneTime {
        zone: zone.clone(),
        display_name: zone.display_name(),
        city_name: zone.city_name(),
        local_time: local.format("%H:%M").to_string(),
        offset_label: format_offset(offset_seconds),
        offset_seconds,
    })
}

/// Formats a UTC offset; zero renders as `UTC+00:00`.
pub fn format_offset(offset_seconds: i32) -> String {
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let total = offset_seconds.unsigned_abs();
    format!("UTC{sign}{:02}:{:02}", total / 3600, (total % 3600) / 60)
}

/// Region-qualified zone names (containing `/`), sorted.
pub fn available_zones() -> Vec<ZoneId> {
    let mut names = TZ_VARIANTS
        .iter()
        .map(|tz| tz.name())
        .filter(|name| name.contains('/'))
        .collect::<Vec<_>>();
    names.sort_unstable();
    names.into_iter().filter_map(|name| ZoneId::new(name).ok()).collect()
}

/// Case-insensitive search over `available_zones`.
///
/// Matches either the raw name or its underscore-to-space form, so
/// `new york` finds `America/New_York`.
pub fn search_zones(query: &str) -> Vec<ZoneId> {
    let needle = query.trim().to_lowercase();
    let zones = available_zones();
    if needle.is_empty() {
        return zones;
    }
    zones
        .into_iter()
        .filter(|zone| {
            let name = zone.as_str().to_lowercase();
            name.contains(&needle) || name.replace('_', " ").contains(&needle)
        })
        .collect()
}
