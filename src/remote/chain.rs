//! JSON-RPC node client used to fetch deployed bytecode.

use super::{http_client, BytecodeSource};
use crate::errors::GatewayError;
use crate::utils::helpers::decode_hex;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::Span;

pub const DEFAULT_RPC_URL: &str = "https://rpc.ankr.com/eth";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Clone)]
pub struct JsonRpcChainClient {
    url: String,
    client: reqwest::Client,
    span: Span,
}

impl JsonRpcChainClient {
    pub fn new(url: impl Into<String>, timeout: Duration, span: Span) -> Self {
        Self {
            url: url.into(),
            client: http_client(timeout),
            span,
        }
    }
}

/// `0x` followed by exactly 40 hex digits.
pub fn validate_address(address: &str) -> Result<(), GatewayError> {
    let digits = address
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::InvalidAddress(address.to_string()))?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GatewayError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

#[async_trait]
impl BytecodeSource for JsonRpcChainClient {
    async fn get_code(&self, address: &str) -> Result<Vec<u8>, GatewayError> {
        validate_address(address)?;

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getCode",
            "params": [address, "latest"],
        });
        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(parent: &self.span, contract = address, "eth_getCode failed: {err}");
                GatewayError::Http(err)
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: RpcResponse = resp.json().await?;
        if let Some(err) = body.error {
            return Err(GatewayError::Remote(format!(
                "eth_getCode error {}: {}",
                err.code, err.message
            )));
        }
        let code = body
            .result
            .ok_or_else(|| GatewayError::Remote("eth_getCode returned no result".into()))?;
        let bytes = decode_hex(&code).map_err(|e| GatewayError::Remote(e.to_string()))?;
        tracing::debug!(parent: &self.span, contract = address, size = bytes.len(), "fetched bytecode");
        Ok(bytes)
    }
}
