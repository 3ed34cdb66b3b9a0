use std::sync::Arc;
use tempfile::TempDir;

use gemi::config::MemoryConfig;
use gemi::db;
use gemi::memory::service::{MemoryStore, SqliteMemoryStore};

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    // Should not exist yet
    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    // Should have been created
    assert!(db_path.exists());

    // Should be functional
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn busy_timeout_and_wal_are_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);

    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn memories_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("memory.db");

    let id = {
        let store = SqliteMemoryStore::open(&db_path, MemoryConfig::default()).unwrap();
        store
            .add_memory_from_conversation("I adopted a puppy", "How exciting! What's their name?")
            .await
            .unwrap()
            .id
    };

    let store = SqliteMemoryStore::open(&db_path, MemoryConfig::default()).unwrap();
    let found = store.search_memories("puppy", 5).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);

    let stats = store.get_memory_stats().await.unwrap();
    assert_eq!(stats.total_memories, 1);
    assert!(stats.db_size_bytes > 0);
}

#[tokio::test]
async fn concurrent_writes_through_shared_store() {
    let store = Arc::new(SqliteMemoryStore::in_memory(MemoryConfig::default()).unwrap());

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .add_memory_from_conversation(&format!("walk number {i}"), "sounds lovely")
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = store.get_memory_stats().await.unwrap();
    assert_eq!(stats.total_memories, 16);
    assert_eq!(store.search_memories("walk", 50).await.unwrap().len(), 16);
}

#[tokio::test]
async fn management_calls_interleave_with_reads() {
    let store = SqliteMemoryStore::in_memory(MemoryConfig::default()).unwrap();
    let memory = store
        .add_memory_from_conversation("My sister visits on Friday", "That will be fun!")
        .await
        .unwrap();

    let (pinned, found) = tokio::join!(
        store.toggle_memory_pin(&memory.id),
        store.search_memories("sister", 5),
    );
    assert!(pinned.unwrap());
    assert_eq!(found.unwrap().len(), 1);

    store.update_memory_importance(&memory.id, 0.2).await.unwrap();
    let all = store.get_all_memories(5).await.unwrap();
    assert_eq!(all[0].importance, 0.2);
    assert!(all[0].is_pinned);
}
