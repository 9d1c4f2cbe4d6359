//! 4byte.directory export and lookup.

use super::{http_client, RemoteCandidate, SignatureLookup, SignaturePages};
use crate::errors::GatewayError;
use crate::signature::{CacheRecord, SignatureKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::Span;

pub const DEFAULT_FOURBYTE_URL: &str = "https://www.4byte.directory";

#[derive(Debug, Clone, Deserialize)]
pub struct FourByteResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<TextSignResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextSignResult {
    pub created_at: DateTime<Utc>,
    pub text_signature: String,
    pub hex_signature: String,
}

impl FourByteResponse {
    pub fn into_records(self, kind: SignatureKind) -> Vec<CacheRecord> {
        self.results
            .into_iter()
            .map(|r| CacheRecord {
                kind,
                hex_signature: r.hex_signature.to_lowercase(),
                text_signature: r.text_signature,
                created_at: r.created_at,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FourByteClient {
    base_url: String,
    client: reqwest::Client,
    span: Span,
}

impl FourByteClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, span: Span) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout),
            span,
        }
    }

    fn endpoint(&self, kind: SignatureKind) -> String {
        match kind {
            SignatureKind::Function => format!("{}/api/v1/signatures/", self.base_url),
            SignatureKind::Event => format!("{}/api/v1/event-signatures/", self.base_url),
        }
    }

    /// `None` when the server answers 404, which it does for pages past the end.
    async fn get(
        &self,
        kind: SignatureKind,
        query: &[(&str, String)],
    ) -> Result<Option<FourByteResponse>, GatewayError> {
        let resp = self
            .client
            .get(self.endpoint(kind))
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                tracing::error!(parent: &self.span, %kind, ?query, "4byte request failed: {err}");
                GatewayError::Http(err)
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp.json().await?)),
            status => {
                tracing::warn!(parent: &self.span, %kind, ?query, %status, "4byte request rejected");
                Err(GatewayError::Status(status.as_u16()))
            }
        }
    }
}

#[async_trait]
impl SignaturePages for FourByteClient {
    async fn page(&self, kind: SignatureKind, page: u64) -> Result<Vec<CacheRecord>, GatewayError> {
        let query = [
            ("page", page.to_string()),
            ("ordering", "created_at".to_string()),
        ];
        let records = self
            .get(kind, &query)
            .await?
            .map(|body| body.into_records(kind))
            .unwrap_or_default();
        tracing::debug!(parent: &self.span, %kind, page, records = records.len(), "fetched export page");
        Ok(records)
    }
}

/// 4byte has no spam flag, so every candidate is reported unfiltered.
#[async_trait]
impl SignatureLookup for FourByteClient {
    async fn lookup(
        &self,
        kind: SignatureKind,
        hex_signature: &str,
    ) -> Result<Vec<RemoteCandidate>, GatewayError> {
        let query = [
            ("hex_signature", hex_signature.to_string()),
            ("ordering", "created_at".to_string()),
        ];
        let Some(body) = self.get(kind, &query).await? else {
            return Ok(Vec::new());
        };
        Ok(body
            .results
            .into_iter()
            .filter(|r| r.hex_signature.eq_ignore_ascii_case(hex_signature))
            .map(|r| RemoteCandidate {
                name: r.text_signature,
                filtered: false,
            })
            .collect())
    }
}
