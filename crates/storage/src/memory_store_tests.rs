// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn put_get_delete_round_trip() {
    let store = MemoryStore::new();
    store.put("job/1", b"x".to_vec()).await.unwrap();
    assert_eq!(store.get("job/1").await.unwrap(), Some(b"x".to_vec()));
    store.delete("job/1").await.unwrap();
    assert_eq!(store.get("job/1").await.unwrap(), None);
}

#[tokio::test]
async fn scan_prefix_respects_boundaries() {
    let store = MemoryStore::new();
    store.put("job/1", b"a".to_vec()).await.unwrap();
    store.put("job/2", b"b".to_vec()).await.unwrap();
    store.put("jobx/3", b"c".to_vec()).await.unwrap();

    let results = store.scan_prefix("job/").await.unwrap();
    assert_eq!(results.len(), 2);
}
