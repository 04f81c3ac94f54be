//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose zone list, home zone, clock and widget use cases to Dart via FRB.
//! - Own the single store handle shared by the app screen and the widget.
//! - Let Dart await list/home commits and clock ticks instead of polling.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported through response envelopes, never as panics.

use chrono::{DateTime, Utc};
use log::warn;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use worldclock_core::{
    build_widget_snapshot, core_version as core_version_inner,
    default_log_level as default_log_level_inner, init_logging as init_logging_inner,
    ping as ping_inner, plan_next_refresh, search_zones, zone_time, ServiceError,
    SqlitePreferenceStore, SystemClock, Tick, TickMode, Ticker, TimezoneService, ZoneId,
    ZoneState,
};

const DB_FILE_NAME: &str = "worldclock.sqlite3";
const DB_PATH_ENV: &str = "WORLDCLOCK_DB_PATH";

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static SERVICE: Mutex<Option<TimezoneService<SqlitePreferenceStore>>> = Mutex::new(None);
static TICKER: Mutex<Option<Ticker>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling log files.
/// - Returns empty string on success and the error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Log level the host should use when it has no preference.
#[flutter_rust_bridge::frb(sync)]
pub fn default_log_level() -> String {
    default_log_level_inner().to_owned()
}

/// Zone list envelope returned by list mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonesResponse {
    pub ok: bool,
    /// Zone ids in display order; empty on failure.
    pub zones: Vec<String>,
    pub message: String,
}

/// Home zone envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeResponse {
    pub ok: bool,
    pub home: Option<String>,
    pub message: String,
}

/// One main-screen card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTimeItem {
    pub zone_id: String,
    pub display_name: String,
    pub city_name: String,
    pub local_time: String,
    pub offset_label: String,
    pub is_home: bool,
}

/// Main-screen cards envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTimesResponse {
    pub ok: bool,
    /// Cards in display order; empty on failure.
    pub items: Vec<ZoneTimeItem>,
    pub message: String,
}

/// One picker entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSearchItem {
    pub zone_id: String,
    pub display_name: String,
    /// Already in the zone list; the picker shows it disabled.
    pub is_selected: bool,
}

/// Picker search envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSearchResponse {
    pub ok: bool,
    pub items: Vec<ZoneSearchItem>,
    pub message: String,
}

/// Zone list and home zone as last committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStateResponse {
    pub ok: bool,
    /// Differs from the state the caller passed in.
    pub changed: bool,
    pub zones: Vec<String>,
    pub home: Option<String>,
    pub message: String,
}

/// Latest clock tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickResponse {
    pub ok: bool,
    /// A tick newer than the caller's sequence arrived.
    pub fired: bool,
    pub sequence: u64,
    pub at_epoch_ms: i64,
    pub message: String,
}

/// One widget row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRowItem {
    pub zone_id: String,
    pub label: String,
    pub offset_label: String,
    pub time: String,
    pub is_home: bool,
}

/// Widget render envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetResponse {
    pub ok: bool,
    pub rows: Vec<WidgetRowItem>,
    pub overflow_label: Option<String>,
    /// Placeholder text when no zone is selected.
    pub empty_label: Option<String>,
    pub message: String,
}

/// Next widget alarm for the host to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPlanResponse {
    pub at_epoch_ms: i64,
    pub exact: bool,
}

/// Returns the zone list (defaults when nothing was saved).
#[flutter_rust_bridge::frb(sync)]
pub fn zones_list() -> ZonesResponse {
    zones_response("zones_list", with_service(|service| service.list()))
}

/// Appends a zone; already-present zones are left where they are.
#[flutter_rust_bridge::frb(sync)]
pub fn zones_add(zone_id: String) -> ZonesResponse {
    let result = parse_zone(&zone_id)
        .and_then(|zone| with_service(|service| service.add(&zone)));
    zones_response("zones_add", result)
}

/// Removes a zone; absent zones are a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn zones_remove(zone_id: String) -> ZonesResponse {
    let result = parse_zone(&zone_id)
        .and_then(|zone| with_service(|service| service.remove(&zone)));
    zones_response("zones_remove", result)
}

/// Moves the zone at `from_index` to `to_index`; invalid indices are a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn zones_reorder(from_index: u32, to_index: u32) -> ZonesResponse {
    let result = with_service(|service| service.reorder(from_index as usize, to_index as usize));
    zones_response("zones_reorder", result)
}

/// Returns the current home zone.
#[flutter_rust_bridge::frb(sync)]
pub fn home_get() -> HomeResponse {
    home_response("home_get", with_service(|service| service.home()))
}

/// Toggles `zone_id` as home zone.
#[flutter_rust_bridge::frb(sync)]
pub fn home_toggle(zone_id: String) -> HomeResponse {
    let result = parse_zone(&zone_id)
        .and_then(|zone| with_service(|service| service.set_home(&zone)));
    home_response("home_toggle", result)
}

/// Clears the home zone.
#[flutter_rust_bridge::frb(sync)]
pub fn home_clear() -> HomeResponse {
    home_response("home_clear", with_service(|service| service.clear_home()))
}

/// Searches the zone catalogue for the picker screen.
///
/// Zones already in the list are flagged so the picker can disable them.
#[flutter_rust_bridge::frb(sync)]
pub fn zone_search(query: String) -> ZoneSearchResponse {
    match with_service(|service| service.list()) {
        Ok(selected) => ZoneSearchResponse {
            ok: true,
            items: search_zones(&query)
                .into_iter()
                .map(|zone| ZoneSearchItem {
                    is_selected: selected.contains(&zone),
                    display_name: zone.display_name(),
                    zone_id: zone.as_str().to_string(),
                })
                .collect(),
            message: String::new(),
        },
        Err(err) => ZoneSearchResponse {
            ok: false,
            items: Vec::new(),
            message: format!("zone_search failed: {err}"),
        },
    }
}

/// Main-screen cards for the saved zones at `now_epoch_ms` (or now).
///
/// Zones unknown to the timezone database are skipped.
#[flutter_rust_bridge::frb(sync)]
pub fn zone_times(now_epoch_ms: Option<i64>) -> ZoneTimesResponse {
    let state = with_service(|service| Ok((service.list()?, service.home()?)));
    zone_times_response(state, resolve_now(now_epoch_ms))
}

fn zone_times_response(
    state: Result<(Vec<ZoneId>, Option<ZoneId>), String>,
    now: DateTime<Utc>,
) -> ZoneTimesResponse {
    let (zones, home) = match state {
        Ok(state) => state,
        Err(err) => {
            return ZoneTimesResponse {
                ok: false,
                items: Vec::new(),
                message: format!("zone_times failed: {err}"),
            }
        }
    };

    let items = zones
        .iter()
        .filter_map(|zone| match zone_time(zone, now) {
            Ok(time) => Some(ZoneTimeItem {
                is_home: home.as_ref() == Some(zone),
                zone_id: time.zone.as_str().to_string(),
                display_name: time.display_name,
                city_name: time.city_name,
                local_time: time.local_time,
                offset_label: time.offset_label,
            }),
            Err(err) => {
                warn!("event=zone_times module=ffi status=skip error={err}");
                None
            }
        })
        .collect();

    ZoneTimesResponse {
        ok: true,
        items,
        message: String::new(),
    }
}

/// Widget content for an instance `height_dp` tall.
#[flutter_rust_bridge::frb(sync)]
pub fn widget_snapshot(height_dp: f32) -> WidgetResponse {
    match with_service(|service| Ok((service.list()?, service.home()?))) {
        Ok((zones, home)) => {
            let snapshot = build_widget_snapshot(&zones, home.as_ref(), Utc::now(), height_dp);
            WidgetResponse {
                ok: true,
                rows: snapshot
                    .rows
                    .into_iter()
                    .map(|row| WidgetRowItem {
                        zone_id: row.zone.as_str().to_string(),
                        label: row.label,
                        offset_label: row.offset_label,
                        time: row.time,
                        is_home: row.is_home,
                    })
                    .collect(),
                overflow_label: snapshot.overflow_label,
                empty_label: snapshot.empty_label,
                message: String::new(),
            }
        }
        Err(err) => WidgetResponse {
            ok: false,
            rows: Vec::new(),
            overflow_label: None,
            empty_label: None,
            message: format!("widget_snapshot failed: {err}"),
        },
    }
}

/// When the host should next wake the widget.
///
/// `exact_allowed` reflects whether the platform currently permits exact
/// alarms; when it does not, the plan is an inexact wake-up ~60s out.
#[flutter_rust_bridge::frb(sync)]
pub fn widget_next_refresh(exact_allowed: bool) -> RefreshPlanResponse {
    let plan = plan_next_refresh(Utc::now(), exact_allowed);
    RefreshPlanResponse {
        at_epoch_ms: plan.at().timestamp_millis(),
        exact: plan.is_exact(),
    }
}

/// Waits up to `timeout_ms` for the list or home zone to differ from the
/// state the caller shows, then returns the current state.
///
/// Runs on the FRB worker pool, so Dart awaits it; calling again with the
/// returned state keeps following commits. A commit between two calls is
/// reported immediately by the next call.
pub fn state_watch(
    known_zones: Vec<String>,
    known_home: Option<String>,
    timeout_ms: u32,
) -> ZoneStateResponse {
    let changes = match with_service(|service| Ok(service.subscribe_state())) {
        Ok(changes) => changes,
        Err(err) => {
            return ZoneStateResponse {
                ok: false,
                changed: false,
                zones: Vec::new(),
                home: None,
                message: format!("state_watch failed: {err}"),
            }
        }
    };

    let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
    let mut latest = changes.try_recv();
    loop {
        if let Some(state) = &latest {
            if !is_known_state(state, &known_zones, known_home.as_deref()) {
                return state_response(state, true);
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match changes.recv_timeout(remaining) {
            Some(next) => latest = Some(next),
            None => break,
        }
    }

    match latest {
        Some(state) => state_response(&state, false),
        None => ZoneStateResponse {
            ok: true,
            changed: false,
            zones: known_zones,
            home: known_home,
            message: String::new(),
        },
    }
}

/// Waits up to `timeout_ms` for a minute-aligned tick newer than
/// `after_sequence`; returns the latest tick either way.
///
/// The shared ticker starts on first use. Ticks start at sequence 1.
pub fn tick_watch(after_sequence: u64, timeout_ms: u32) -> TickResponse {
    let ticks = {
        let mut slot = match TICKER.lock() {
            Ok(slot) => slot,
            Err(_) => return tick_error("ticker lock poisoned".to_string()),
        };
        if slot.is_none() {
            match Ticker::start(Arc::new(SystemClock), TickMode::MinuteAligned) {
                Ok(ticker) => *slot = Some(ticker),
                Err(err) => return tick_error(format!("ticker start failed: {err}")),
            }
        }
        match slot.as_ref() {
            Some(ticker) => ticker.subscribe(),
            None => return tick_error("ticker unavailable".to_string()),
        }
    };

    let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
    let mut latest = ticks.try_recv();
    loop {
        if let Some(tick) = latest.filter(|tick| tick.sequence > after_sequence) {
            return tick_response(tick, true);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match ticks.recv_timeout(remaining) {
            Some(next) => latest = Some(next),
            None => break,
        }
    }

    match latest {
        Some(tick) => tick_response(tick, false),
        None => tick_error("ticker stopped".to_string()),
    }
}

fn is_known_state(state: &ZoneState, known_zones: &[String], known_home: Option<&str>) -> bool {
    state.home.as_ref().map(ZoneId::as_str) == known_home
        && state.zones.len() == known_zones.len()
        && state
            .zones
            .iter()
            .zip(known_zones)
            .all(|(zone, known)| zone.as_str() == known)
}

fn state_response(state: &ZoneState, changed: bool) -> ZoneStateResponse {
    ZoneStateResponse {
        ok: true,
        changed,
        zones: state.zones.iter().map(|zone| zone.as_str().to_string()).collect(),
        home: state.home.as_ref().map(|zone| zone.as_str().to_string()),
        message: String::new(),
    }
}

fn tick_response(tick: Tick, fired: bool) -> TickResponse {
    TickResponse {
        ok: true,
        fired,
        sequence: tick.sequence,
        at_epoch_ms: tick.at.timestamp_millis(),
        message: String::new(),
    }
}

fn tick_error(reason: String) -> TickResponse {
    TickResponse {
        ok: false,
        fired: false,
        sequence: 0,
        at_epoch_ms: 0,
        message: format!("tick_watch failed: {reason}"),
    }
}

fn parse_zone(raw: &str) -> Result<ZoneId, String> {
    ZoneId::new(raw).map_err(|err| err.to_string())
}

fn resolve_now(now_epoch_ms: Option<i64>) -> DateTime<Utc> {
    now_epoch_ms
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

fn zones_response(operation: &str, result: Result<Vec<ZoneId>, String>) -> ZonesResponse {
    match result {
        Ok(zones) => ZonesResponse {
            ok: true,
            zones: zones.iter().map(|zone| zone.as_str().to_string()).collect(),
            message: String::new(),
        },
        Err(err) => ZonesResponse {
            ok: false,
            zones: Vec::new(),
            message: format!("{operation} failed: {err}"),
        },
    }
}

fn home_response(operation: &str, result: Result<Option<ZoneId>, String>) -> HomeResponse {
    match result {
        Ok(home) => HomeResponse {
            ok: true,
            home: home.map(|zone| zone.as_str().to_string()),
            message: String::new(),
        },
        Err(err) => HomeResponse {
            ok: false,
            home: None,
            message: format!("{operation} failed: {err}"),
        },
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

/// Runs `f` against the process-wide service, opening the store on first use.
///
/// A failed open is retried on the next call.
fn with_service<T>(
    f: impl FnOnce(&TimezoneService<SqlitePreferenceStore>) -> Result<T, ServiceError>,
) -> Result<T, String> {
    let mut slot = SERVICE.lock().map_err(|_| "service lock poisoned".to_string())?;
    if slot.is_none() {
        let store = SqlitePreferenceStore::open(resolve_db_path())
            .map_err(|err| format!("preference store open failed: {err}"))?;
        *slot = Some(TimezoneService::new(Arc::new(store)));
    }
    let service = match slot.as_ref() {
        Some(service) => service.clone(),
        None => return Err("preference store unavailable".to_string()),
    };
    drop(slot);

    f(&service).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, home_get, home_toggle, init_logging, ping, state_watch, tick_watch,
        widget_next_refresh, widget_snapshot, zone_search, zone_times, zone_times_response,
        zones_add, zones_list, zones_remove, zones_reorder,
    };
    use chrono::{TimeZone, Utc};
    use worldclock_core::ZoneId;
    use std::thread;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn blank_zone_is_reported_not_panicked() {
        let response = zones_add("   ".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("zones_add failed"));
    }

    #[test]
    fn add_reorder_and_remove_through_ffi() {
        let token = unique_zone("Test/Add");
        let added = zones_add(token.clone());
        assert!(added.ok, "{}", added.message);
        assert!(added.zones.contains(&token));

        let last = (added.zones.len() - 1) as u32;
        let moved = zones_reorder(last, 0);
        assert!(moved.ok, "{}", moved.message);

        let removed = zones_remove(token.clone());
        assert!(removed.ok, "{}", removed.message);
        assert!(!zones_list().zones.contains(&token));
    }

    #[test]
    fn home_toggle_round_trips() {
        let token = unique_zone("Test/Home");
        let first = home_toggle(token.clone());
        assert!(first.ok, "{}", first.message);
        assert_eq!(first.home.as_deref(), Some(token.as_str()));

        let second = home_toggle(token);
        assert!(second.ok, "{}", second.message);
        assert_eq!(second.home, None);
    }

    #[test]
    fn clock_and_widget_views_render() {
        // Other tests may add unresolvable ids; only real zones render.
        let cards = zone_times(Some(1_700_000_000_000));
        assert!(cards.ok, "{}", cards.message);
        assert!(cards.items.iter().all(|card| card.offset_label.starts_with("UTC")));

        let widget = widget_snapshot(0.0);
        assert!(widget.ok, "{}", widget.message);
        assert!(widget.rows.len() <= 2);

        let plan = widget_next_refresh(true);
        assert!(plan.exact);
        assert_eq!(plan.at_epoch_ms % 60_000, 0);
    }

    #[test]
    fn zone_times_reports_store_failure_in_envelope() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        let failed = zone_times_response(Err("unable to open database file".to_string()), now);
        assert!(!failed.ok);
        assert!(failed.items.is_empty());
        assert!(failed.message.contains("zone_times failed: unable to open database file"));

        let tokyo = ZoneId::new("Asia/Tokyo").unwrap();
        let rendered = zone_times_response(Ok((vec![tokyo.clone()], Some(tokyo))), now);
        assert!(rendered.ok);
        assert_eq!(rendered.items.len(), 1);
        assert_eq!(rendered.items[0].local_time, "21:00");
        assert!(rendered.items[0].is_home);
    }

    #[test]
    fn search_flags_zones_already_listed() {
        let added = zones_add("Asia/Kolkata".to_string());
        assert!(added.ok, "{}", added.message);

        let found = zone_search("kolkata".to_string());
        assert!(found.ok, "{}", found.message);
        let kolkata = found
            .items
            .iter()
            .find(|item| item.zone_id == "Asia/Kolkata")
            .expect("Asia/Kolkata should be in the catalogue");
        assert!(kolkata.is_selected);
        assert_eq!(kolkata.display_name, "Asia/Kolkata");
    }

    #[test]
    fn state_watch_reports_commit_made_while_waiting() {
        let token = unique_zone("Test/Watch");
        let current = zones_list();
        assert!(current.ok, "{}", current.message);
        let mut known_zones = current.zones;
        let mut known_home = home_get().home;

        let writer_token = token.clone();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            zones_add(writer_token)
        });

        let mut seen = false;
        for _ in 0..20 {
            let state = state_watch(known_zones.clone(), known_home.clone(), 2_000);
            assert!(state.ok, "{}", state.message);
            if state.zones.contains(&token) {
                seen = true;
                break;
            }
            known_zones = state.zones;
            known_home = state.home;
        }
        assert!(writer.join().unwrap().ok);
        assert!(seen, "added zone was never observed");
        zones_remove(token);
    }

    #[test]
    fn tick_watch_returns_latest_tick_on_timeout() {
        let tick = tick_watch(u64::MAX, 10);
        assert!(tick.ok, "{}", tick.message);
        assert!(!tick.fired);
        assert!(tick.at_epoch_ms > 0);
    }

    fn unique_zone(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}_{nanos}")
    }
}
