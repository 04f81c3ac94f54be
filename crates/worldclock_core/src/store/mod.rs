//! Durable key-value preference storage.
//!
//! # Responsibility
//! - Define the store contract consumed by the timezone service.
//! - Provide the SQLite-backed implementation used by the app.
//!
//! # Invariants
//! - `edit` is one atomic read-modify-write; on failure nothing is written.
//! - Committed snapshots are published to `changes()` in commit order.

use crate::observe::Observable;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod schema;
mod sqlite;

pub use sqlite::SqlitePreferenceStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from preference store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite error.
    Sqlite(rusqlite::Error),
    /// Database was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// A previous writer panicked while holding the connection.
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "preference schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "preference store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Poisoned => write!(f, "preference store connection is poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::UninitializedConnection { .. }
            | Self::Poisoned => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Snapshot of every stored preference entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    entries: BTreeMap<String, String>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl FromIterator<(String, String)> for Preferences {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Durable preference storage with an observable change channel.
pub trait PreferenceStore: Send + Sync {
    /// Returns the committed snapshot.
    fn read(&self) -> StoreResult<Preferences>;

    /// Applies `transform` to the current snapshot and persists the result
    /// atomically, returning the committed snapshot.
    ///
    /// A transform that leaves the snapshot unchanged writes nothing and
    /// publishes nothing.
    fn edit(&self, transform: &mut dyn FnMut(&mut Preferences)) -> StoreResult<Preferences>;

    /// Change channel carrying every committed snapshot.
    fn changes(&self) -> &Observable<Preferences>;
}
