//! Domain model for the selected timezone list.
//!
//! # Responsibility
//! - Define the zone identifier token shared by every layer.
//! - Hold the fallback zone set used before anything is persisted.
//!
//! # Invariants
//! - A `ZoneId` is never blank and carries no surrounding whitespace.

pub mod zone;
