//! Signature value types shared by the extractors, the store and the resolvers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Which hash space a signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    /// 4-byte function selector.
    Function,
    /// 32-byte event topic.
    Event,
}

impl SignatureKind {
    /// Name used in the database and in remote query parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureKind::Function => "function",
            SignatureKind::Event => "event",
        }
    }

    /// Byte width of the hash.
    pub fn hash_len(self) -> usize {
        match self {
            SignatureKind::Function => 4,
            SignatureKind::Event => 32,
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(SignatureKind::Function),
            "event" => Ok(SignatureKind::Event),
            other => Err(format!("unknown signature kind `{other}`")),
        }
    }
}

/// A deduplicated set of `0x`-prefixed hex signatures of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSet {
    kind: SignatureKind,
    signatures: BTreeSet<String>,
}

impl SignatureSet {
    pub fn new(kind: SignatureKind) -> Self {
        Self {
            kind,
            signatures: BTreeSet::new(),
        }
    }

    pub fn with_signatures<I, S>(kind: SignatureKind, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new(kind);
        for sig in signatures {
            set.insert(sig);
        }
        set
    }

    pub fn kind(&self) -> SignatureKind {
        self.kind
    }

    /// Returns `true` if the signature was not already present.
    pub fn insert(&mut self, signature: impl Into<String>) -> bool {
        self.signatures.insert(signature.into())
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.signatures.contains(signature)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.signatures.iter()
    }

    /// Sorted listing.
    pub fn list(&self) -> Vec<String> {
        self.signatures.iter().cloned().collect()
    }
}

impl IntoIterator for SignatureSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.signatures.into_iter()
    }
}

/// A resolved human-readable signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSignature {
    pub text: String,
    /// Not flagged as spam by the remote source, or read from the local store.
    pub verified: bool,
}

/// One row of the local signature store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub kind: SignatureKind,
    pub hex_signature: String,
    pub text_signature: String,
    pub created_at: DateTime<Utc>,
}

/// Last fully committed export page for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWatermark {
    pub kind: SignatureKind,
    pub last_synced_page: u64,
}
