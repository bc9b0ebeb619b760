// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};
use serde_json::json;

use crate::model::PageKey;

use super::{FileStore, KeyValueStore, MemoryStore, OverrideStore, StoreError, WriteDurability};

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: std::path::PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = env::temp_dir();
        path.push(format!("overtext-{prefix}-{}-{nanos}-{counter}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

struct MemoryCtx {
    backend: Arc<MemoryStore>,
    store: OverrideStore,
    key: PageKey,
}

#[fixture]
fn memory() -> MemoryCtx {
    let backend = Arc::new(MemoryStore::new());
    let store = OverrideStore::new(backend.clone());
    MemoryCtx {
        backend,
        store,
        key: PageKey::from_url("https://example.com/page"),
    }
}

#[rstest]
#[tokio::test]
async fn unknown_key_loads_empty(memory: MemoryCtx) {
    assert!(memory.store.load(&memory.key).await.is_empty());
}

#[rstest]
#[tokio::test]
async fn double_save_keeps_one_record_with_newest_text(memory: MemoryCtx) {
    let MemoryCtx { store, key, .. } = memory;
    store.save(&key, "#hero", "first").await;
    let first = store.load(&key).await.get("#hero").cloned().expect("saved");

    store.save(&key, "#hero", "second").await;
    let list = store.load(&key).await;
    assert_eq!(list.len(), 1);
    let record = list.get("#hero").expect("saved");
    assert_eq!(record.text, "second");
    assert!(record.timestamp >= first.timestamp);
}

#[rstest]
#[tokio::test]
async fn delete_removes_only_the_named_selector(memory: MemoryCtx) {
    let MemoryCtx { store, key, .. } = memory;
    store.save(&key, "#a", "A").await;
    store.save(&key, "#b", "B").await;

    store.delete(&key, "#missing").await;
    assert_eq!(store.load(&key).await.len(), 2);

    store.delete(&key, "#a").await;
    let list = store.load(&key).await;
    assert_eq!(list.len(), 1);
    assert!(list.get("#a").is_none());
    assert!(list.get("#b").is_some());
}

#[rstest]
#[tokio::test]
async fn clear_is_idempotent(memory: MemoryCtx) {
    let MemoryCtx { backend, store, key } = memory;
    store.save(&key, "#a", "A").await;
    store.clear(&key).await;
    assert!(store.load(&key).await.is_empty());
    store.clear(&key).await;
    assert!(store.load(&key).await.is_empty());
    assert_eq!(backend.raw(key.as_str()), Some(json!([])));
}

#[rstest]
#[tokio::test]
async fn pages_do_not_share_overrides(memory: MemoryCtx) {
    let MemoryCtx { store, key, .. } = memory;
    let other = PageKey::from_url("https://example.com/other");
    store.save(&key, "#a", "A").await;
    assert!(store.load(&other).await.is_empty());

    let same_page = PageKey::from_url("https://example.com/page?tab=2#top");
    assert_eq!(store.load(&same_page).await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn local_file_pages_persist_under_a_null_origin(memory: MemoryCtx) {
    let MemoryCtx { backend, store, .. } = memory;
    let key = PageKey::from_url("file:///tmp/page.html?v=1");
    store.save(&key, "#a", "A").await;

    assert_eq!(backend.write_count(), 1);
    assert!(backend.raw("null/tmp/page.html").is_some());
    let reloaded = PageKey::from_url("file:///tmp/page.html");
    assert_eq!(store.load(&reloaded).await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn empty_key_is_a_no_op(memory: MemoryCtx) {
    let MemoryCtx { backend, store, .. } = memory;
    let key = PageKey::from_url("::not a url::");
    store.save(&key, "#a", "A").await;
    store.delete(&key, "#a").await;
    store.clear(&key).await;
    assert!(store.load(&key).await.is_empty());
    assert_eq!(backend.write_count(), 0);
}

#[rstest]
#[tokio::test]
async fn malformed_stored_values_load_empty(memory: MemoryCtx) {
    let MemoryCtx { backend, store, key } = memory;
    backend.insert_raw(key.as_str(), json!({"selector": "#a"}));
    assert!(store.load(&key).await.is_empty());

    // Saving over a malformed value starts a fresh list.
    store.save(&key, "#a", "A").await;
    assert_eq!(store.load(&key).await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn storage_failures_are_swallowed(memory: MemoryCtx) {
    let MemoryCtx { backend, store, key } = memory;
    store.save(&key, "#a", "A").await;

    backend.set_fail_writes(true);
    store.save(&key, "#b", "B").await;
    store.clear(&key).await;
    backend.set_fail_writes(false);
    assert_eq!(store.load(&key).await.len(), 1);

    backend.set_fail_reads(true);
    assert!(store.load(&key).await.is_empty());
}

#[tokio::test]
async fn file_store_round_trips_values() {
    let tmp = TempDir::new("file-store");
    let store = FileStore::new(tmp.path().join("overrides"));
    let key = "https://example.com/page";

    assert!(store.get(key).await.expect("get").is_none());
    store.set(key, json!([{"selector": "#a", "text": "A", "timestamp": 1}])).await.expect("set");
    assert_eq!(
        store.get(key).await.expect("get"),
        Some(json!([{"selector": "#a", "text": "A", "timestamp": 1}]))
    );

    let path = store.path_for_key(key).expect("path");
    assert!(path.starts_with(store.root()));
    assert!(path.exists());

    let leftovers: Vec<_> = std::fs::read_dir(store.root())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".overtext.tmp."))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn durable_file_store_overwrites_in_place() {
    let tmp = TempDir::new("file-store-durable");
    let store = FileStore::new(tmp.path()).with_durability(WriteDurability::Durable);
    assert_eq!(store.durability(), WriteDurability::Durable);

    store.set("k", json!([1])).await.expect("first write");
    store.set("k", json!([2])).await.expect("second write");
    assert_eq!(store.get("k").await.expect("get"), Some(json!([2])));
}

#[tokio::test]
async fn file_store_reports_corrupt_files_and_empty_keys() {
    let tmp = TempDir::new("file-store-corrupt");
    let store = FileStore::new(tmp.path());
    let path = store.path_for_key("k").expect("path");
    std::fs::write(&path, "{not json").unwrap();

    assert!(matches!(store.get("k").await, Err(StoreError::Json { .. })));
    assert!(matches!(store.get("").await, Err(StoreError::InvalidKey(_))));
}

#[tokio::test]
async fn override_store_over_files_survives_reopen() {
    let tmp = TempDir::new("override-files");
    let key = PageKey::from_url("https://example.com/page");

    let store = OverrideStore::new(Arc::new(FileStore::new(tmp.path())));
    store.save(&key, "span[data-testid=\"hero\"]", "World").await;

    let reopened = OverrideStore::new(Arc::new(FileStore::new(tmp.path())));
    let list = reopened.load(&key).await;
    assert_eq!(
        list.get("span[data-testid=\"hero\"]").map(|r| r.text.as_str()),
        Some("World")
    );
}

#[tokio::test]
async fn corrupt_file_loads_empty_through_the_accessor() {
    let tmp = TempDir::new("override-corrupt");
    let key = PageKey::from_url("https://example.com/page");
    let backend = FileStore::new(tmp.path());
    std::fs::write(backend.path_for_key(key.as_str()).expect("path"), "[oops").unwrap();

    let store = OverrideStore::new(Arc::new(backend));
    assert!(store.load(&key).await.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn stalled_file_reads_leave_the_runtime_responsive() {
    let tmp = TempDir::new("file-store-fifo");
    let store = Arc::new(FileStore::new(tmp.path()));
    let path = store.path_for_key("k").expect("path");
    let status = std::process::Command::new("mkfifo")
        .arg(&path)
        .status()
        .expect("run mkfifo");
    assert!(status.success());

    // Opening the fifo blocks until a writer shows up.
    let reader = tokio::spawn({
        let store = store.clone();
        async move { store.get("k").await }
    });
    let other = tokio::spawn(async {
        tokio::task::yield_now().await;
        42
    });
    let answered = tokio::time::timeout(Duration::from_secs(5), other)
        .await
        .expect("other task ran while the read was stalled")
        .expect("join");
    assert_eq!(answered, 42);
    assert!(!reader.is_finished());

    tokio::task::spawn_blocking(move || std::fs::write(&path, "[1]"))
        .await
        .expect("join")
        .expect("write fifo");
    assert_eq!(reader.await.expect("join").expect("get"), Some(json!([1])));
}
