//! OpenChain (formerly sig.eth.samczsun.com) signature lookup.

use super::{http_client, RemoteCandidate, SignatureLookup};
use crate::errors::GatewayError;
use crate::signature::SignatureKind;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::Span;

pub const DEFAULT_OPENCHAIN_URL: &str = "https://api.openchain.xyz";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: LookupResult,
}

/// Unknown hashes come back as `null` entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResult {
    #[serde(default)]
    pub event: HashMap<String, Option<Vec<LookupEntry>>>,
    #[serde(default)]
    pub function: HashMap<String, Option<Vec<LookupEntry>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupEntry {
    pub name: String,
    #[serde(default)]
    pub filtered: bool,
}

impl LookupResponse {
    /// Candidates listed for exactly `hex_signature` under `kind`.
    pub fn candidates(&self, kind: SignatureKind, hex_signature: &str) -> Vec<RemoteCandidate> {
        let section = match kind {
            SignatureKind::Function => &self.result.function,
            SignatureKind::Event => &self.result.event,
        };
        section
            .get(hex_signature)
            .and_then(Option::as_ref)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| RemoteCandidate {
                        name: e.name.clone(),
                        filtered: e.filtered,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct OpenChainClient {
    base_url: String,
    client: reqwest::Client,
    span: Span,
}

impl OpenChainClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, span: Span) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout),
            span,
        }
    }
}

#[async_trait]
impl SignatureLookup for OpenChainClient {
    async fn lookup(
        &self,
        kind: SignatureKind,
        hex_signature: &str,
    ) -> Result<Vec<RemoteCandidate>, GatewayError> {
        // `filter=false` keeps spam-flagged names so the caller can see the flag.
        let url = format!("{}/signature-database/v1/lookup", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[(kind.as_str(), hex_signature), ("filter", "false")])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                tracing::error!(parent: &self.span, sign = hex_signature, %kind, "lookup request failed: {err}");
                GatewayError::Http(err)
            })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(parent: &self.span, sign = hex_signature, %kind, %status, "lookup rejected");
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: LookupResponse = resp.json().await?;
        if !body.ok {
            return Err(GatewayError::Remote(format!(
                "lookup for {kind} {hex_signature} returned ok=false"
            )));
        }
        let candidates = body.candidates(kind, hex_signature);
        tracing::debug!(parent: &self.span, sign = hex_signature, %kind, found = candidates.len(), "lookup done");
        Ok(candidates)
    }
}
