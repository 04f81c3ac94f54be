//! Zone identifier model.
//!
//! # Responsibility
//! - Wrap a timezone database name as an opaque, comparable token.
//! - Derive user-facing labels from the identifier text.
//!
//! # Invariants
//! - Validity against the timezone database is not checked here; rendering
//!   code resolves identifiers and reports unknown ones.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Zones shown when no list has ever been persisted.
pub const DEFAULT_ZONES: [&str; 4] = [
    "America/New_York",
    "Europe/London",
    "Asia/Tokyo",
    "Australia/Sydney",
];

/// Returns the default zone list in display order.
pub fn default_zones() -> Vec<ZoneId> {
    DEFAULT_ZONES
        .iter()
        .map(|name| ZoneId((*name).to_string()))
        .collect()
}

/// Canonical timezone name such as `Europe/London`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZoneId(String);

/// Rejection reason for zone identifier construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneIdError {
    /// Identifier is empty after trimming.
    Blank,
}

impl Display for ZoneIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "zone id must not be blank"),
        }
    }
}

impl Error for ZoneIdError {}

impl ZoneId {
    /// Builds a zone id from raw input, trimming surrounding whitespace.
    ///
    /// # Errors
    /// - Returns `ZoneIdError::Blank` when nothing remains after trimming.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ZoneIdError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ZoneIdError::Blank);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Full name with underscores shown as spaces, e.g. `America/New York`.
    pub fn display_name(&self) -> String {
        self.0.replace('_', " ")
    }

    /// Last path segment with underscores shown as spaces, e.g. `New York`.
    pub fn city_name(&self) -> String {
        self.0
            .rsplit('/')
            .next()
            .unwrap_or(self.0.as_str())
            .replace('_', " ")
    }
}

impl Display for ZoneId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for ZoneId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for ZoneId {
    type Error = ZoneIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ZoneId> for String {
    fn from(value: ZoneId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ZoneId {
    type Error = ZoneIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
