mod helpers;

use gemi::db;
use gemi::db::migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};

fn columns(conn: &rusqlite::Connection) -> Vec<String> {
    let mut stmt = conn.prepare("PRAGMA table_info(memories)").unwrap();
    stmt.query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = helpers::test_db();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert!(columns(&conn).contains(&"access_count".to_string()));
}

#[test]
fn migrations_are_idempotent() {
    let conn = helpers::test_db();
    // Running again should be a no-op
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn v1_db_upgrades_and_keeps_rows() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), 1);
    assert!(!columns(&conn).contains(&"access_count".to_string()));

    conn.execute(
        "INSERT INTO memories (id, content, memory_type, importance, created_at, last_accessed_at) \
         VALUES ('m1', 'old memory', 'journal', 0.5, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        [],
    )
    .unwrap();

    run_migrations(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    let access_count: i64 = conn
        .query_row("SELECT access_count FROM memories WHERE id = 'm1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(access_count, 0);
}
