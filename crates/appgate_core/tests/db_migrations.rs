use appgate_core::db::migrations::latest_version;
use appgate_core::db::registry::{registered_permission_count, sync_permission_registry};
use appgate_core::db::{open_db, open_db_in_memory, DbError};
use appgate_core::{Permission, RepoError, SqliteAppRepository, SqliteAppTokenRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "permissions");
    assert_table_exists(&conn, "apps");
    assert_table_exists(&conn, "app_permissions");
    assert_table_exists(&conn, "app_tokens");
}

#[test]
fn bootstrap_registers_every_permission_variant() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(
        registered_permission_count(&conn).unwrap(),
        Permission::ALL.len()
    );

    for perm in Permission::ALL {
        let exists: i64 = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM permissions WHERE category = ?1 AND codename = ?2
                );",
                [perm.category(), perm.codename()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1, "{perm} missing from registry");
    }
}

#[test]
fn registry_sync_is_additive_and_idempotent() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(sync_permission_registry(&conn).unwrap(), 0);

    conn.execute(
        "DELETE FROM permissions WHERE category = 'orders' AND codename = 'view_orders';",
        [],
    )
    .unwrap();
    assert_eq!(sync_permission_registry(&conn).unwrap(), 1);
    assert_eq!(
        registered_permission_count(&conn).unwrap(),
        Permission::ALL.len()
    );
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appgate.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_eq!(
        registered_permission_count(&conn_second).unwrap(),
        Permission::ALL.len()
    );
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteAppRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
    assert!(SqliteAppTokenRepository::try_new(&conn).is_err());
}

#[test]
fn connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
