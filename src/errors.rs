//! Domain-specific error types.
//!
//! Uses `thiserror` for structured error definitions; `anyhow` is reserved
//! for the CLI boundary.

use crate::signature::SignatureKind;
use thiserror::Error;

/// Errors from turning textual bytecode into an instruction stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid hex input: {0}")]
    InvalidHex(String),
}

/// Errors from the local SQLite signature store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to prepare database directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} failed: {source}")]
    Sqlite {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },

    #[error("page {0} does not fit in the sync table")]
    PageOutOfRange(u64),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors from the HTTP collaborators (node RPC, signature databases).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors from resolving a single hex signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("text signature not found for {kind} {hex}")]
    NotFound { kind: SignatureKind, hex: String },

    #[error("network error: {0}")]
    Network(#[from] GatewayError),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("malformed {kind} signature: {hex}")]
    InvalidSignature { kind: SignatureKind, hex: String },
}

/// Errors that abort a sync run. The watermark only reflects committed pages.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch page {page}: {source}")]
    Network {
        page: u64,
        #[source]
        source: GatewayError,
    },

    #[error("failed to persist page {page}: {source}")]
    Persistence {
        page: u64,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    /// The page that was being synced when the run failed.
    pub fn page(&self) -> u64 {
        match self {
            SyncError::Network { page, .. } | SyncError::Persistence { page, .. } => *page,
        }
    }
}
