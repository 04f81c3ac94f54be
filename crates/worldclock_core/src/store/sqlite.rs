//! SQLite implementation of `PreferenceStore`.
//!
//! # Invariants
//! - Edits run inside an `IMMEDIATE` transaction, so concurrent writers are
//!   serialized by SQLite as well as by the connection mutex.
//! - The change channel is published while the connection is still held.

use super::schema::{open_connection, open_connection_in_memory, schema_version, SCHEMA_VERSION};
use super::{PreferenceStore, Preferences, StoreError, StoreResult};
use crate::observe::Observable;
use log::{debug, error};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed preference store owning one connection.
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
    changes: Observable<Preferences>,
}

impl SqlitePreferenceStore {
    /// Opens (or creates) the database file and loads the current snapshot.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_connection(path)?)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_connection_in_memory()?)
    }

    /// Wraps an already opened connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        let actual_version = schema_version(&conn)?;
        let expected_version = SCHEMA_VERSION;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let snapshot = load_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            changes: Observable::new(snapshot),
        })
    }

    fn lock_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn read(&self) -> StoreResult<Preferences> {
        let conn = self.lock_conn()?;
        load_all(&conn)
    }

    fn edit(&self, transform: &mut dyn FnMut(&mut Preferences)) -> StoreResult<Preferences> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = load_all(&tx)?;
        let mut after = before.clone();
        transform(&mut after);
        if after == before {
            return Ok(after);
        }

        if let Err(err) = write_changes(&tx, &before, &after) {
            error!("event=pref_edit module=store status=error error={err}");
            return Err(err);
        }
        tx.commit()?;
        debug!(
            "event=pref_edit module=store status=ok entries={}",
            after.len()
        );

        self.changes.publish(after.clone());
        Ok(after)
    }

    fn changes(&self) -> &Observable<Preferences> {
        &self.changes
    }
}

fn load_all(conn: &Connection) -> StoreResult<Preferences> {
    let mut stmt = conn.prepare("SELECT key, value FROM preferences ORDER BY key;")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries.into_iter().collect())
}

fn write_changes(conn: &Connection, before: &Preferences, after: &Preferences) -> StoreResult<()> {
    for (key, _) in before.iter().filter(|(key, _)| after.get(key).is_none()) {
        conn.execute("DELETE FROM preferences WHERE key = ?1;", [key])?;
    }

    for (key, value) in after
        .iter()
        .filter(|(key, value)| before.get(key) != Some(*value))
    {
        conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
    }

    Ok(())
}
