//! Single-hash signature resolution.
//!
//! The local store is consulted first; only on a miss is the remote
//! aggregator queried, and then only its first candidate is used.

use crate::errors::SignatureError;
use crate::remote::SignatureLookup;
use crate::signature::{SignatureKind, TextSignature};
use crate::store::SignatureStore;
use crate::utils::helpers::normalize_signature;
use std::sync::Arc;
use tracing::Span;

pub struct SignDecoder {
    remote: Arc<dyn SignatureLookup>,
    store: Option<SignatureStore>,
    span: Span,
}

impl SignDecoder {
    pub fn new(remote: Arc<dyn SignatureLookup>, store: Option<SignatureStore>, span: Span) -> Self {
        Self {
            remote,
            store,
            span,
        }
    }

    /// Resolve one selector or topic to text.
    ///
    /// Store hits are always verified. Remote hits are verified unless the
    /// source flagged them as spam.
    pub async fn resolve(
        &self,
        kind: SignatureKind,
        hex_signature: &str,
    ) -> Result<TextSignature, SignatureError> {
        let hex = normalize_signature(kind, hex_signature).ok_or_else(|| {
            SignatureError::InvalidSignature {
                kind,
                hex: hex_signature.to_string(),
            }
        })?;

        if let Some(store) = &self.store {
            let key = hex.clone();
            let cached = store
                .run_blocking(move |s| s.query_earliest(kind, &key))
                .await?;
            if let Some(record) = cached {
                tracing::debug!(parent: &self.span, sign = %hex, %kind, "text signature fetched from store");
                return Ok(TextSignature {
                    text: record.text_signature,
                    verified: true,
                });
            }
        }

        let candidates = self.remote.lookup(kind, &hex).await?;
        let Some(first) = candidates.into_iter().next() else {
            tracing::debug!(parent: &self.span, sign = %hex, %kind, "text signature not found");
            return Err(SignatureError::NotFound { kind, hex });
        };

        Ok(TextSignature {
            text: first.name,
            verified: !first.filtered,
        })
    }
}
