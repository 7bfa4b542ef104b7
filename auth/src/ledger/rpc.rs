//! # JSON-RPC Ledger Client
//!
//! JSON-RPC 2.0 over HTTP POST. One request per call, no batching, no
//! retries. A failed call surfaces immediately; whether to try again is the
//! caller's decision.
//!
//! ## Methods used
//!
//! | Method                           | Params                                        |
//! |----------------------------------|-----------------------------------------------|
//! | `suix_getLatestSuiSystemState`   | `[]`                                          |
//! | `sui_executeTransactionBlock`    | `[tx_bytes, [signature], options, mode]`      |

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{LedgerClient, LedgerError, TransactionResponse};
use crate::transaction::TransactionStatus;

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Methods this client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    /// Current system state, including the epoch.
    #[serde(rename = "suix_getLatestSuiSystemState")]
    GetLatestSystemState,
    /// Execute a signed transaction and wait for effects.
    #[serde(rename = "sui_executeTransactionBlock")]
    ExecuteTransaction,
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: RpcMethod,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: RpcMethod, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Unwrap the envelope into its result or a typed error.
    pub fn into_result(self) -> Result<Value, LedgerError> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(LedgerError::InvalidResponse(
                "response carries neither result nor error".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct JsonRpcLedgerClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcLedgerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: RpcMethod, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        debug!(id, ?method, "ledger rpc call");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Http { status, body });
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        envelope.into_result()
    }
}

/// Epoch from a system-state result. The ledger reports it as a decimal
/// string; some nodes send a bare number.
pub(crate) fn parse_epoch(result: &Value) -> Result<u64, LedgerError> {
    match result.get("epoch") {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| LedgerError::InvalidResponse(format!("epoch is not a u64: {s}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| LedgerError::InvalidResponse(format!("epoch is not a u64: {n}"))),
        _ => Err(LedgerError::InvalidResponse("missing epoch".into())),
    }
}

pub(crate) fn parse_execution(result: &Value) -> Result<TransactionResponse, LedgerError> {
    let digest = result
        .get("digest")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::InvalidResponse("missing digest".into()))?
        .to_string();

    let status = result.pointer("/effects/status/status").and_then(Value::as_str);
    let error = result
        .pointer("/effects/status/error")
        .and_then(Value::as_str)
        .map(str::to_string);

    let status = match status {
        Some("success") => TransactionStatus::Success,
        Some(_) => TransactionStatus::Failure,
        None => return Err(LedgerError::InvalidResponse("missing effects status".into())),
    };

    Ok(TransactionResponse {
        digest,
        status,
        error,
    })
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn current_epoch(&self) -> Result<u64, LedgerError> {
        let result = self
            .call(RpcMethod::GetLatestSystemState, json!([]))
            .await?;
        parse_epoch(&result)
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> Result<TransactionResponse, LedgerError> {
        let params = json!([
            tx_bytes,
            signatures,
            { "showEffects": true },
            "WaitForLocalExecution"
        ]);
        let result = self.call(RpcMethod::ExecuteTransaction, params).await?;
        parse_execution(&result)
    }
}
