//! Sign decoder and batch decoder against in-memory remotes.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sigscope::batch::BatchDecoder;
use sigscope::decoder::SignDecoder;
use sigscope::errors::{GatewayError, SignatureError};
use sigscope::remote::{RemoteCandidate, SignatureLookup};
use sigscope::signature::{CacheRecord, SignatureKind};
use sigscope::store::SignatureStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tracing::Span;

/// Remote with canned answers, a per-hash delay, and a call counter.
#[derive(Default)]
struct MockRemote {
    answers: HashMap<String, Vec<RemoteCandidate>>,
    delays: HashMap<String, Duration>,
    fail: Vec<String>,
    calls: AtomicUsize,
}

impl MockRemote {
    fn answer(mut self, hex: &str, name: &str, filtered: bool) -> Self {
        self.answers.entry(hex.to_string()).or_default().push(RemoteCandidate {
            name: name.to_string(),
            filtered,
        });
        self
    }

    fn delay(mut self, hex: &str, ms: u64) -> Self {
        self.delays.insert(hex.to_string(), Duration::from_millis(ms));
        self
    }

    fn failing(mut self, hex: &str) -> Self {
        self.fail.push(hex.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignatureLookup for MockRemote {
    async fn lookup(
        &self,
        _kind: SignatureKind,
        hex_signature: &str,
    ) -> Result<Vec<RemoteCandidate>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(hex_signature) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail.iter().any(|h| h == hex_signature) {
            return Err(GatewayError::Status(502));
        }
        Ok(self.answers.get(hex_signature).cloned().unwrap_or_default())
    }
}

fn decoder(remote: Arc<MockRemote>, store: Option<SignatureStore>) -> SignDecoder {
    SignDecoder::new(remote, store, Span::none())
}

#[tokio::test]
async fn test_store_hit_skips_remote() {
    let dir = tempdir().unwrap();
    let store = SignatureStore::open(dir.path().join("s.db"), Span::none()).unwrap();
    store
        .insert_if_absent(&[CacheRecord {
            kind: SignatureKind::Function,
            hex_signature: "0xa9059cbb".to_string(),
            text_signature: "transfer(address,uint256)".to_string(),
            created_at: Utc.with_ymd_and_hms(2016, 7, 9, 3, 58, 27).unwrap(),
        }])
        .unwrap();

    let remote = Arc::new(MockRemote::default().answer("0xa9059cbb", "other()", false));
    let d = decoder(remote.clone(), Some(store));

    let sig = d.resolve(SignatureKind::Function, "0xA9059CBB").await.unwrap();
    assert_eq!(sig.text, "transfer(address,uint256)");
    assert!(sig.verified);
    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn test_store_miss_falls_back_to_remote() {
    let dir = tempdir().unwrap();
    let store = SignatureStore::open(dir.path().join("s.db"), Span::none()).unwrap();
    let remote = Arc::new(
        MockRemote::default()
            .answer("0x70a08231", "balanceOf(address)", false)
            .answer("0x70a08231", "passphrase_calculate_transfer(uint64,address)", false),
    );
    let d = decoder(remote.clone(), Some(store));

    let sig = d.resolve(SignatureKind::Function, "0x70a08231").await.unwrap();
    assert_eq!(sig.text, "balanceOf(address)");
    assert!(sig.verified);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn test_filtered_candidate_is_unverified() {
    let remote = Arc::new(MockRemote::default().answer("0x12345678", "spam()", true));
    let sig = decoder(remote, None)
        .resolve(SignatureKind::Function, "0x12345678")
        .await
        .unwrap();
    assert_eq!(sig.text, "spam()");
    assert!(!sig.verified);
}

#[tokio::test]
async fn test_not_found() {
    let remote = Arc::new(MockRemote::default());
    let err = decoder(remote, None)
        .resolve(SignatureKind::Function, "0xdeadbeef")
        .await
        .unwrap_err();
    assert!(matches!(err, SignatureError::NotFound { kind: SignatureKind::Function, .. }));
}

#[tokio::test]
async fn test_remote_error_propagates() {
    let remote = Arc::new(MockRemote::default().failing("0xdeadbeef"));
    let err = decoder(remote, None)
        .resolve(SignatureKind::Function, "0xdeadbeef")
        .await
        .unwrap_err();
    assert!(matches!(err, SignatureError::Network(GatewayError::Status(502))));
}

#[tokio::test]
async fn test_malformed_hex_is_rejected_before_lookup() {
    let remote = Arc::new(MockRemote::default());
    let err = decoder(remote.clone(), None)
        .resolve(SignatureKind::Event, "0xa9059cbb")
        .await
        .unwrap_err();
    assert!(matches!(err, SignatureError::InvalidSignature { .. }));
    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn test_batch_keeps_only_verified() {
    let remote = Arc::new(
        MockRemote::default()
            .answer("0xa9059cbb", "transfer(address,uint256)", false)
            .answer("0x11111111", "spam()", true)
            .delay("0xa9059cbb", 30)
            .delay("0xdeadbeef", 5),
    );
    let batch = BatchDecoder::new(Arc::new(decoder(remote.clone(), None)), 2, Span::none());

    let resolved = batch
        .resolve_all(
            SignatureKind::Function,
            ["0xa9059cbb", "0xdeadbeef", "0x11111111", "0xa9059cbb"],
        )
        .await;

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved["0xa9059cbb"], "transfer(address,uint256)");
    // Duplicates are looked up once.
    assert_eq!(remote.calls(), 3);
}

#[tokio::test]
async fn test_batch_swallows_failures() {
    let remote = Arc::new(
        MockRemote::default()
            .answer("0x70a08231", "balanceOf(address)", false)
            .failing("0x12345678"),
    );
    let batch = BatchDecoder::new(Arc::new(decoder(remote, None)), 8, Span::none());
    let resolved = batch
        .resolve_all(SignatureKind::Function, ["0x70a08231", "0x12345678"])
        .await;
    assert_eq!(resolved.len(), 1);
    assert!(resolved.contains_key("0x70a08231"));
}

#[tokio::test]
async fn test_batch_empty_input() {
    let remote = Arc::new(MockRemote::default());
    let batch = BatchDecoder::new(Arc::new(decoder(remote, None)), 0, Span::none());
    let resolved = batch
        .resolve_all(SignatureKind::Event, Vec::<String>::new())
        .await;
    assert!(resolved.is_empty());
}

#[tokio::test]
async fn test_batch_normalizes_spellings() {
    let remote = Arc::new(MockRemote::default().answer("0xa9059cbb", "transfer(address,uint256)", false));
    let batch = BatchDecoder::new(Arc::new(decoder(remote.clone(), None)), 4, Span::none());

    let resolved = batch
        .resolve_all(
            SignatureKind::Function,
            ["0xA9059CBB", "0xa9059cbb", "a9059cbb", " 0Xa9059cbb ", "0x1234"],
        )
        .await;

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved["0xa9059cbb"], "transfer(address,uint256)");
    assert_eq!(remote.calls(), 1);
}
