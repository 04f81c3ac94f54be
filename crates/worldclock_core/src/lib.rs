//! Core domain logic for the world clock app and its home-screen widget.
//! This crate is the single source of truth for the zone list invariants.

pub mod logging;
pub mod model;
pub mod observe;
pub mod refresh;
pub mod service;
pub mod store;
pub mod view;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::zone::{default_zones, ZoneId, ZoneIdError, DEFAULT_ZONES};
pub use observe::{Observable, Subscription};
pub use refresh::follow::SurfaceFollower;
pub use refresh::next_minute_boundary;
pub use refresh::ticker::{Tick, TickMode, Ticker, FOREGROUND_TICK_INTERVAL};
pub use refresh::time_source::{Clock, ManualClock, SystemClock};
pub use refresh::widget_refresh::{
    plan_next_refresh, AlarmReport, AlarmScheduler, RefreshPlan, ScheduleError,
    SurfaceRefresher, WidgetRefresher,
};
pub use service::timezone_service::{
    ServiceError, ServiceResult, TimezoneService, ZoneState, HOME_TIMEZONE_KEY,
    SELECTED_TIMEZONES_KEY,
};
pub use service::zone_codec::{decode_zone_list, encode_zone_list, CodecError};
pub use store::{PreferenceStore, Preferences, SqlitePreferenceStore, StoreError, StoreResult};
pub use view::widget::{
    build_widget_snapshot, max_rows_for_height, WidgetRow, WidgetSnapshot, EMPTY_WIDGET_LABEL,
};
pub use view::zone_time::{
    available_zones, format_offset, resolve_zone, search_zones, zone_time, ClockError, ZoneTime,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
