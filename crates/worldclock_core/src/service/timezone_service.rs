//! Timezone list use-case service.
//!
//! # Responsibility
//! - Own the ordered zone list and the optional home zone.
//! - Run every mutation as a single atomic store edit.
//! - Expose list/home projections of the store's change channel.
//!
//! # Invariants
//! - The stored list never contains the same zone twice.
//! - Out-of-range reorders, duplicate adds and absent removes write nothing.
//! - Removing the home zone from the list does not clear the home zone.

use crate::model::zone::{default_zones, ZoneId};
use crate::observe::Subscription;
use crate::service::zone_codec::{decode_zone_list, encode_zone_list, CodecError};
use crate::store::{PreferenceStore, Preferences, StoreError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Preference key holding the encoded zone list.
pub const SELECTED_TIMEZONES_KEY: &str = "selected_timezones";
/// Preference key holding the home zone name.
pub const HOME_TIMEZONE_KEY: &str = "home_timezone";

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from timezone service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Store read/write failed; nothing was changed.
    Store(StoreError),
    /// Persisted list value cannot be decoded.
    InvalidData(CodecError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(err) => write!(f, "invalid persisted timezone data: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::InvalidData(err) => Some(err),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CodecError> for ServiceError {
    fn from(value: CodecError) -> Self {
        Self::InvalidData(value)
    }
}

/// Zone list and home zone as one committed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneState {
    pub zones: Vec<ZoneId>,
    pub home: Option<ZoneId>,
}

/// Use-case service for the user's zone list and home zone.
pub struct TimezoneService<S: PreferenceStore> {
    store: Arc<S>,
}

impl<S: PreferenceStore> Clone for TimezoneService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PreferenceStore> TimezoneService<S> {
    /// Creates a service over an injected store handle.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the zone list in display order.
    ///
    /// Falls back to the default zone set when nothing has been stored.
    pub fn list(&self) -> ServiceResult<Vec<ZoneId>> {
        let prefs = self.store.read()?;
        Ok(zones_from(&prefs)?)
    }

    /// Returns the home zone, if one is set.
    pub fn home(&self) -> ServiceResult<Option<ZoneId>> {
        let prefs = self.store.read()?;
        Ok(home_from(&prefs))
    }

    /// Appends `zone` unless already present and returns the resulting list.
    ///
    /// The first mutation uses the default zone set as its base.
    pub fn add(&self, zone: &ZoneId) -> ServiceResult<Vec<ZoneId>> {
        self.mutate_list("zone_add", zone.as_str(), |zones| {
            if zones.contains(zone) {
                return false;
            }
            zones.push(zone.clone());
            true
        })
    }

    /// Removes `zone` from the list; absent zones are a no-op.
    pub fn remove(&self, zone: &ZoneId) -> ServiceResult<Vec<ZoneId>> {
        self.mutate_list("zone_remove", zone.as_str(), |zones| {
            let before = zones.len();
            zones.retain(|existing| existing != zone);
            zones.len() != before
        })
    }

    /// Moves the entry at `from` to position `to`, shifting the entries between.
    ///
    /// Indices outside the current list, or `from == to`, leave it unchanged.
    pub fn reorder(&self, from: usize, to: usize) -> ServiceResult<Vec<ZoneId>> {
        let target = format!("{from}->{to}");
        self.mutate_list("zone_reorder", &target, |zones| {
            if from == to || from >= zones.len() || to >= zones.len() {
                return false;
            }
            let moved = zones.remove(from);
            zones.insert(to, moved);
            true
        })
    }

    /// Toggles the home zone: clears it when `zone` is already home,
    /// otherwise makes `zone` home. Returns the resulting home zone.
    pub fn set_home(&self, zone: &ZoneId) -> ServiceResult<Option<ZoneId>> {
        self.mutate_home("home_toggle", |current| {
            if current == Some(zone) {
                None
            } else {
                Some(zone.clone())
            }
        })
    }

    /// Clears the home zone unconditionally.
    pub fn clear_home(&self) -> ServiceResult<Option<ZoneId>> {
        self.mutate_home("home_clear", |_| None)
    }

    /// Live zone list: the current list first, then every committed change.
    ///
    /// Undecodable stored data is observed as the default zone set.
    pub fn subscribe_list(&self) -> Subscription<Vec<ZoneId>> {
        self.store.changes().subscribe_map(observed_zones)
    }

    /// Live home zone: the current value first, then every committed change.
    pub fn subscribe_home(&self) -> Subscription<Option<ZoneId>> {
        self.store.changes().subscribe_map(home_from)
    }

    /// Live list and home together; a change to either delivers one value.
    pub fn subscribe_state(&self) -> Subscription<ZoneState> {
        self.store
            .changes()
            .subscribe_map(|prefs: &Preferences| ZoneState {
                zones: observed_zones(prefs),
                home: home_from(prefs),
            })
    }

    fn mutate_list(
        &self,
        event: &'static str,
        target: &str,
        mut change: impl FnMut(&mut Vec<ZoneId>) -> bool,
    ) -> ServiceResult<Vec<ZoneId>> {
        let mut outcome: ServiceResult<(Vec<ZoneId>, bool)> = Ok((Vec::new(), false));
        let edited = self.store.edit(&mut |prefs: &mut Preferences| {
            outcome = apply_list_change(prefs, &mut change);
        });

        match edited.map_err(ServiceError::from).and(outcome) {
            Ok((zones, changed)) => {
                info!(
                    "event={event} module=service status=ok target={target} changed={changed} count={}",
                    zones.len()
                );
                Ok(zones)
            }
            Err(err) => {
                error!("event={event} module=service status=error target={target} error={err}");
                Err(err)
            }
        }
    }

    fn mutate_home(
        &self,
        event: &'static str,
        next: impl Fn(Option<&ZoneId>) -> Option<ZoneId>,
    ) -> ServiceResult<Option<ZoneId>> {
        let mut home = None;
        let edited = self.store.edit(&mut |prefs: &mut Preferences| {
            let current = home_from(prefs);
            home = next(current.as_ref());
            match &home {
                Some(zone) => prefs.set(HOME_TIMEZONE_KEY, zone.as_str()),
                None => {
                    prefs.remove(HOME_TIMEZONE_KEY);
                }
            }
        });

        match edited {
            Ok(_) => {
                info!(
                    "event={event} module=service status=ok home={}",
                    home.as_ref().map_or("none", ZoneId::as_str)
                );
                Ok(home)
            }
            Err(err) => {
                error!("event={event} module=service status=error error={err}");
                Err(err.into())
            }
        }
    }
}

fn apply_list_change(
    prefs: &mut Preferences,
    change: &mut impl FnMut(&mut Vec<ZoneId>) -> bool,
) -> ServiceResult<(Vec<ZoneId>, bool)> {
    let mut zones = zones_from(prefs)?;
    let changed = change(&mut zones);
    if changed {
        prefs.set(SELECTED_TIMEZONES_KEY, encode_zone_list(&zones)?);
    }
    Ok((zones, changed))
}

fn zones_from(prefs: &Preferences) -> Result<Vec<ZoneId>, CodecError> {
    let stored = match prefs.get(SELECTED_TIMEZONES_KEY) {
        Some(raw) => decode_zone_list(raw)?,
        None => None,
    };
    Ok(stored.unwrap_or_else(default_zones))
}

fn observed_zones(prefs: &Preferences) -> Vec<ZoneId> {
    zones_from(prefs).unwrap_or_else(|err| {
        warn!("event=zone_observe module=service status=fallback error={err}");
        default_zones()
    })
}

fn home_from(prefs: &Preferences) -> Option<ZoneId> {
    prefs
        .get(HOME_TIMEZONE_KEY)
        .and_then(|raw| ZoneId::new(raw).ok())
}
