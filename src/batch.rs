//! Concurrent fan-out of signature resolution.

use crate::decoder::SignDecoder;
use crate::signature::SignatureKind;
use crate::utils::helpers::normalize_signature;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Span;

/// Resolves many hashes at once, keeping only verified names.
///
/// Each hash runs in its own task; at most `concurrency` lookups are in
/// flight. Results come back through the join set, so there is no shared
/// map to lock.
#[derive(Clone)]
pub struct BatchDecoder {
    decoder: Arc<SignDecoder>,
    concurrency: usize,
    span: Span,
}

impl BatchDecoder {
    pub fn new(decoder: Arc<SignDecoder>, concurrency: usize, span: Span) -> Self {
        Self {
            decoder,
            concurrency: concurrency.max(1),
            span,
        }
    }

    /// Map each resolvable, verified hash to its text signature.
    ///
    /// Keys are normalised (`0x`, lower-case); inputs that differ only in
    /// spelling share one lookup, and malformed ones are skipped.
    ///
    /// Failures and spam-flagged names are dropped silently: the extractors
    /// produce false positives, so a miss is ordinary.
    pub async fn resolve_all<I, S>(&self, kind: SignatureKind, signatures: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = signatures
            .into_iter()
            .filter_map(|raw| {
                let raw: String = raw.into();
                normalize_signature(kind, &raw)
            })
            .collect();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for hex in unique {
            let decoder = Arc::clone(&self.decoder);
            let permits = Arc::clone(&permits);
            join_set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return None;
                };
                match decoder.resolve(kind, &hex).await {
                    Ok(sig) if sig.verified => Some((hex, sig.text)),
                    _ => None,
                }
            });
        }

        let mut resolved = HashMap::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(Some((hex, text))) => {
                    resolved.insert(hex, text);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(parent: &self.span, %kind, "resolution task failed: {err}");
                }
            }
        }

        tracing::debug!(parent: &self.span, %kind, resolved = resolved.len(), "batch resolution done");
        resolved
    }
}
