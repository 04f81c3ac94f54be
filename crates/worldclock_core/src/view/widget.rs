//! Home-screen widget render model.
//!
//! # Responsibility
//! - Decide how many zones fit a widget of a given height.
//! - Produce one row per visible zone plus a `+N more` overflow label.
//! - Tell the host which placeholder to draw when no zone is selected.
//!
//! # Invariants
//! - Visible row count is always within `[MIN_WIDGET_ROWS, MAX_WIDGET_ROWS]`.
//! - Rows keep the list's display order.

use super::zone_time::zone_time;
use crate::model::zone::ZoneId;
use chrono::{DateTime, Utc};
use log::warn;

/// Glyph prefixed to the home zone's label.
pub const HOME_MARKER: &str = "\u{1F3E0}";
/// Placeholder drawn when the zone list is empty.
pub const EMPTY_WIDGET_LABEL: &str = "No timezones added";
pub const MIN_WIDGET_ROWS: usize = 2;
pub const MAX_WIDGET_ROWS: usize = 12;

const HEADER_HEIGHT_DP: f32 = 44.0;
const ROW_HEIGHT_DP: f32 = 44.0;

/// One zone line in the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRow {
    pub zone: ZoneId,
    /// City label, prefixed with `HOME_MARKER` for the home zone.
    pub label: String,
    pub offset_label: String,
    pub time: String,
    pub is_home: bool,
}

/// Everything one widget instance draws at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSnapshot {
    pub rows: Vec<WidgetRow>,
    /// `+N more` when zones did not fit.
    pub overflow_label: Option<String>,
    /// Set only when the zone list itself is empty.
    pub empty_label: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Number of zone rows that fit below the header, clamped to the row bounds.
pub fn max_rows_for_height(height_dp: f32) -> usize {
    let fitting = ((height_dp - HEADER_HEIGHT_DP) / ROW_HEIGHT_DP) as i64;
    fitting.clamp(MIN_WIDGET_ROWS as i64, MAX_WIDGET_ROWS as i64) as usize
}

/// Builds the widget snapshot for `zones` at `now`.
///
/// Zones unknown to the timezone database are left out.
pub fn build_widget_snapshot(
    zones: &[ZoneId],
    home: Option<&ZoneId>,
    now: DateTime<Utc>,
    height_dp: f32,
) -> WidgetSnapshot {
    let resolved = zones
        .iter()
        .filter_map(|zone| match zone_time(zone, now) {
            Ok(time) => Some(time),
            Err(err) => {
                warn!("event=widget_render module=view status=skip error={err}");
                None
            }
        })
        .collect::<Vec<_>>();

    let max_rows = max_rows_for_height(height_dp);
    let hidden = resolved.len().saturating_sub(max_rows);

    let rows = resolved
        .into_iter()
        .take(max_rows)
        .map(|time| {
            let is_home = home == Some(&time.zone);
            let label = if is_home {
                format!("{HOME_MARKER} {}", time.city_name)
            } else {
                time.city_name
            };
            WidgetRow {
                zone: time.zone,
                label,
                offset_label: time.offset_label,
                time: time.local_time,
                is_home,
            }
        })
        .collect();

    WidgetSnapshot {
        rows,
        overflow_label: (hidden > 0).then(|| format!("+{hidden} more")),
        empty_label: zones.is_empty().then(|| EMPTY_WIDGET_LABEL.to_string()),
        generated_at: now,
    }
}
