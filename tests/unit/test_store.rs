//! SQLite signature store.

use chrono::{TimeZone, Utc};
use sigscope::signature::{CacheRecord, SignatureKind};
use sigscope::errors::StoreError;
use sigscope::store::SignatureStore;
use std::time::Duration;
use tempfile::tempdir;

fn record(kind: SignatureKind, hex: &str, text: &str, day: u32) -> CacheRecord {
    CacheRecord {
        kind,
        hex_signature: hex.to_string(),
        text_signature: text.to_string(),
        created_at: Utc.with_ymd_and_hms(2020, 1, day, 12, 0, 0).unwrap(),
    }
}

fn open(dir: &tempfile::TempDir) -> SignatureStore {
    SignatureStore::open(dir.path().join("db").join("scraper.db"), tracing::Span::none()).unwrap()
}

#[test]
fn test_open_creates_parent_directory() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    assert!(store.path().exists());
    assert_eq!(store.count(SignatureKind::Function).unwrap(), 0);
}

#[test]
fn test_insert_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let rows = vec![
        record(SignatureKind::Function, "0xa9059cbb", "transfer(address,uint256)", 2),
        record(SignatureKind::Function, "0x70a08231", "balanceOf(address)", 3),
    ];

    assert_eq!(store.insert_if_absent(&rows).unwrap(), 2);
    assert_eq!(store.insert_if_absent(&rows).unwrap(), 0);
    assert_eq!(store.count(SignatureKind::Function).unwrap(), 2);
}

#[test]
fn test_same_hex_different_text_kept() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let rows = vec![
        record(SignatureKind::Function, "0xa9059cbb", "transfer(address,uint256)", 5),
        record(SignatureKind::Function, "0xa9059cbb", "many_msg_babbage(bytes1)", 9),
    ];
    assert_eq!(store.insert_if_absent(&rows).unwrap(), 2);
}

#[test]
fn test_query_returns_earliest() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    store
        .insert_if_absent(&[
            record(SignatureKind::Function, "0xa9059cbb", "many_msg_babbage(bytes1)", 9),
            record(SignatureKind::Function, "0xa9059cbb", "transfer(address,uint256)", 2),
        ])
        .unwrap();

    let found = store
        .query_earliest(SignatureKind::Function, "0xa9059cbb")
        .unwrap()
        .unwrap();
    assert_eq!(found.text_signature, "transfer(address,uint256)");
    assert_eq!(found.created_at, Utc.with_ymd_and_hms(2020, 1, 2, 12, 0, 0).unwrap());
}

#[test]
fn test_kinds_are_separate() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    store
        .insert_if_absent(&[record(SignatureKind::Event, "0xabcd", "Foo()", 1)])
        .unwrap();

    assert!(store
        .query_earliest(SignatureKind::Function, "0xabcd")
        .unwrap()
        .is_none());
    assert!(store
        .query_earliest(SignatureKind::Event, "0xabcd")
        .unwrap()
        .is_some());
}

#[test]
fn test_watermark_upsert() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    assert!(store.watermark(SignatureKind::Event).unwrap().is_none());

    store.set_watermark(SignatureKind::Event, 3).unwrap();
    store.set_watermark(SignatureKind::Event, 4).unwrap();
    store.set_watermark(SignatureKind::Function, 1).unwrap();

    assert_eq!(
        store.watermark(SignatureKind::Event).unwrap().unwrap().last_synced_page,
        4
    );
    assert_eq!(
        store.watermark(SignatureKind::Function).unwrap().unwrap().last_synced_page,
        1
    );
}

#[test]
fn test_reopen_keeps_data() {
    let dir = tempdir().unwrap();
    {
        let store = open(&dir);
        store
            .insert_if_absent(&[record(SignatureKind::Function, "0x12345678", "f()", 1)])
            .unwrap();
        store.set_watermark(SignatureKind::Function, 7).unwrap();
    }
    let store = open(&dir);
    assert_eq!(store.count(SignatureKind::Function).unwrap(), 1);
    assert_eq!(
        store.watermark(SignatureKind::Function).unwrap().unwrap().last_synced_page,
        7
    );
}

#[test]
fn test_watermark_out_of_range_is_rejected() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    store.set_watermark(SignatureKind::Function, 5).unwrap();

    let err = store
        .set_watermark(SignatureKind::Function, u64::MAX)
        .unwrap_err();
    assert!(matches!(err, StoreError::PageOutOfRange(u64::MAX)));
    assert_eq!(
        store.watermark(SignatureKind::Function).unwrap().unwrap().last_synced_page,
        5
    );
}

#[tokio::test]
async fn test_run_blocking_leaves_runtime_free() {
    let dir = tempdir().unwrap();
    let store = open(&dir);

    // A slow store call must not stall other tasks on a single-threaded runtime.
    let slow = store.run_blocking(|s| {
        std::thread::sleep(Duration::from_millis(300));
        s.count(SignatureKind::Function)
    });
    let fast = tokio::time::sleep(Duration::from_millis(20));

    tokio::pin!(slow);
    tokio::select! {
        _ = fast => {}
        _ = &mut slow => panic!("store call finished before the timer"),
    }
    assert_eq!(slow.await.unwrap(), 0);
}

#[tokio::test]
async fn test_run_blocking_round_trip() {
    let dir = tempdir().unwrap();
    let store = open(&dir);
    let rows = vec![record(SignatureKind::Event, "0xabcd", "Foo()", 1)];

    let inserted = store
        .run_blocking(move |s| s.insert_if_absent(&rows))
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let found = store
        .run_blocking(|s| s.query_earliest(SignatureKind::Event, "0xabcd"))
        .await
        .unwrap();
    assert_eq!(found.unwrap().text_signature, "Foo()");
}
