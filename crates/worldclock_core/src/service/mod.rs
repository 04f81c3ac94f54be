//! Core use-case services.
//!
//! # Responsibility
//! - Turn user gestures (add/remove/reorder/home) into store transactions.
//! - Keep UI/FFI layers decoupled from storage encoding.

pub mod timezone_service;
pub mod zone_codec;
