//! Flutter-facing bindings for the world clock core.

pub mod api;
