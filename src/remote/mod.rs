//! Network collaborators: node RPC and the public signature databases.
//!
//! Each concern sits behind a small async trait so the decoder and the sync
//! engine can be driven by in-memory fakes in tests.

pub mod chain;
pub mod fourbyte;
pub mod openchain;

use crate::errors::GatewayError;
use crate::signature::{CacheRecord, SignatureKind};
use async_trait::async_trait;
use std::time::Duration;

/// One candidate name returned for a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCandidate {
    pub name: String,
    /// The source considers this match likely spam.
    pub filtered: bool,
}

/// Single-hash resolution against a remote aggregator.
#[async_trait]
pub trait SignatureLookup: Send + Sync {
    /// Candidates for exactly `hex_signature`, in the order the source returns them.
    async fn lookup(
        &self,
        kind: SignatureKind,
        hex_signature: &str,
    ) -> Result<Vec<RemoteCandidate>, GatewayError>;
}

/// Paginated export of a remote signature database.
#[async_trait]
pub trait SignaturePages: Send + Sync {
    /// Records on page `page` (1-based). An empty page means no more data.
    async fn page(&self, kind: SignatureKind, page: u64) -> Result<Vec<CacheRecord>, GatewayError>;
}

/// Deployed bytecode for an address.
#[async_trait]
pub trait BytecodeSource: Send + Sync {
    async fn get_code(&self, address: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Build an HTTP client with a request timeout, falling back to the default
/// client if the configured one cannot be constructed.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sigscope/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!("failed to build HTTP client with timeout: {err}; using defaults");
            reqwest::Client::new()
        }
    }
}
