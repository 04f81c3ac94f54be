//! Persisted encoding of the ordered zone list.
//!
//! # Responsibility
//! - Encode the list as a JSON array of zone names.
//! - Decode current JSON values and values written by the older
//!   `|||`-joined format.
//!
//! # Invariants
//! - Decoded lists never contain blank or duplicate entries.
//! - `None` from `decode_zone_list` means "nothing stored".

use crate::model::zone::ZoneId;
use log::warn;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Separator used by the older delimiter-joined list format.
pub const LEGACY_SEPARATOR: &str = "|||";

/// Errors from zone list encoding/decoding.
#[derive(Debug)]
pub enum CodecError {
    Json(serde_json::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "zone list is not valid JSON: {err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Encodes zones in display order.
pub fn encode_zone_list(zones: &[ZoneId]) -> Result<String, CodecError> {
    Ok(serde_json::to_string(zones)?)
}

/// Decodes a stored list value.
///
/// Returns `Ok(None)` for an empty value so callers can fall back to the
/// default zone set. A stored `[]` decodes to an empty list and stays empty:
/// removing the last zone keeps the list empty instead of bringing the
/// defaults back, as the older delimiter format did by writing `""`.
pub fn decode_zone_list(raw: &str) -> Result<Option<Vec<ZoneId>>, CodecError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let names = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<String>>(trimmed)?
    } else {
        trimmed
            .split(LEGACY_SEPARATOR)
            .map(str::to_string)
            .collect()
    };

    Ok(Some(dedupe(names)))
}

fn dedupe(names: Vec<String>) -> Vec<ZoneId> {
    let mut seen = HashSet::new();
    let mut zones = Vec::with_capacity(names.len());
    for name in names {
        let Ok(zone) = ZoneId::new(&name) else {
            warn!("event=zone_decode module=codec status=skip reason=blank_entry");
            continue;
        };
        if seen.insert(zone.clone()) {
            zones.push(zone);
        } else {
            warn!("event=zone_decode module=codec status=skip reason=duplicate zone={zone}");
        }
    }
    zones
}
