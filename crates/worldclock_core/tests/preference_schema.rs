use rusqlite::Connection;
use worldclock_core::store::schema::{
    open_connection, open_connection_in_memory, schema_version, SCHEMA_VERSION,
};
use worldclock_core::{PreferenceStore, Preferences, SqlitePreferenceStore, StoreError};

#[test]
fn preferences_table_has_expected_columns() {
    let conn = open_connection_in_memory().unwrap();
    assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);

    let mut stmt = conn.prepare("PRAGMA table_info(preferences);").unwrap();
    let columns = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, i64>(5)?,
            ))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(
        columns,
        vec![
            ("key".to_string(), "TEXT".to_string(), true, 1),
            ("value".to_string(), "TEXT".to_string(), true, 0),
            ("updated_at".to_string(), "INTEGER".to_string(), true, 0),
        ]
    );
}

#[test]
fn updated_at_defaults_to_current_epoch_millis() {
    let conn = open_connection_in_memory().unwrap();
    conn.execute(
        "INSERT INTO preferences (key, value) VALUES ('home_timezone', 'Asia/Tokyo');",
        [],
    )
    .unwrap();

    let (updated_at, now_ms): (i64, i64) = conn
        .query_row(
            "SELECT updated_at, strftime('%s', 'now') * 1000 FROM preferences;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!(updated_at > 1_600_000_000_000);
    assert_eq!(updated_at % 1000, 0);
    assert!((now_ms - updated_at).abs() <= 2_000);
}

#[test]
fn store_edit_upserts_existing_key_in_place() {
    let store = SqlitePreferenceStore::open_in_memory().unwrap();
    store
        .edit(&mut |prefs: &mut Preferences| prefs.set("home_timezone", "Asia/Tokyo"))
        .unwrap();
    store
        .edit(&mut |prefs: &mut Preferences| prefs.set("home_timezone", "Europe/Paris"))
        .unwrap();

    let prefs = store.read().unwrap();
    assert_eq!(prefs.len(), 1);
    assert_eq!(prefs.get("home_timezone"), Some("Europe/Paris"));
}

#[test]
fn duplicate_key_is_rejected_by_primary_key() {
    let conn = open_connection_in_memory().unwrap();
    conn.execute("INSERT INTO preferences (key, value) VALUES ('k', 'a');", [])
        .unwrap();
    assert!(conn
        .execute("INSERT INTO preferences (key, value) VALUES ('k', 'b');", [])
        .is_err());
}

#[test]
fn reopening_keeps_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worldclock.db");

    drop(open_connection(&path).unwrap());
    let conn = open_connection(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_connection(&path) {
        Err(StoreError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, SCHEMA_VERSION);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must be refused"),
    }
}
