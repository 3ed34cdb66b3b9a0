mod helpers;

use gemi::memory::forget::{clear_all, delete_memory};
use gemi::memory::search::{get_memory, memory_log, search_memories};
use gemi::memory::store::toggle_pin;
use gemi::memory::types::MemoryType;
use helpers::{insert_memory, test_db};

fn count(conn: &rusqlite::Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn delete_removes_row_and_index_entry() {
    let mut conn = test_db();
    let id = insert_memory(&mut conn, "Argued with my brother", MemoryType::Journal, 0.5);

    delete_memory(&mut conn, &id, Some("no longer relevant")).unwrap();

    assert!(get_memory(&conn, &id).unwrap().is_none());
    assert!(search_memories(&conn, "brother", 5).unwrap().is_empty());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM memories_fts"), 0);
}

#[test]
fn delete_leaves_other_memories_searchable() {
    let mut conn = test_db();
    let gone = insert_memory(&mut conn, "Painted the fence blue", MemoryType::Journal, 0.5);
    let kept = insert_memory(&mut conn, "Painted a landscape", MemoryType::Journal, 0.5);

    delete_memory(&mut conn, &gone, None).unwrap();

    let results = search_memories(&conn, "painted", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, kept);
}

#[test]
fn deleting_unknown_memory_fails() {
    let mut conn = test_db();
    let err = delete_memory(&mut conn, "does-not-exist", None).unwrap_err();
    assert!(err.to_string().contains("memory not found"));
}

#[test]
fn delete_is_audited() {
    let mut conn = test_db();
    let id = insert_memory(&mut conn, "temporary", MemoryType::Personal, 0.5);
    delete_memory(&mut conn, &id, Some("user request")).unwrap();

    let log = memory_log(&conn, &id).unwrap();
    let last = log.last().unwrap();
    assert_eq!(last.operation, "delete");
    assert_eq!(
        last.details.as_ref().unwrap()["reason"],
        serde_json::json!("user request")
    );
}

#[test]
fn clear_keeps_pinned_by_default() {
    let mut conn = test_db();
    insert_memory(&mut conn, "one", MemoryType::Journal, 0.5);
    insert_memory(&mut conn, "two", MemoryType::Conversation, 0.5);
    let pinned = insert_memory(&mut conn, "favourite memory", MemoryType::Insight, 0.9);
    toggle_pin(&conn, &pinned).unwrap();

    let result = clear_all(&mut conn, false).unwrap();

    assert_eq!(result.deleted, 2);
    assert_eq!(result.pinned_kept, 1);
    assert!(get_memory(&conn, &pinned).unwrap().is_some());
    assert_eq!(search_memories(&conn, "favourite", 5).unwrap().len(), 1);
}

#[test]
fn clear_including_pinned_empties_everything() {
    let mut conn = test_db();
    insert_memory(&mut conn, "one", MemoryType::Journal, 0.5);
    let pinned = insert_memory(&mut conn, "two", MemoryType::Insight, 0.5);
    toggle_pin(&conn, &pinned).unwrap();

    let result = clear_all(&mut conn, true).unwrap();

    assert_eq!(result.deleted, 2);
    assert_eq!(result.pinned_kept, 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM memories"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM memories_fts"), 0);
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM memory_log WHERE operation = 'clear'"),
        1
    );
}
