//! Render models for screens and the home-screen widget.
//!
//! # Responsibility
//! - Turn zone ids plus "now" into display-ready strings.
//! - Keep layout/theming out of core; only text and flags are produced.
//!
//! # Invariants
//! - Values here are derived on demand and never persisted.

pub mod widget;
pub mod zone_time;
