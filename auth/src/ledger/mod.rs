//! # Ledger Module
//!
//! The session manager needs exactly two things from the ledger: the
//! current epoch, and somewhere to send signed transactions. Both sit
//! behind [`LedgerClient`] so the session manager can run against a fake.
//!
//! ```text
//! mod.rs  — LedgerClient trait, response types, errors
//! rpc.rs  — JSON-RPC 2.0 envelopes and the HTTP client
//! ```

pub mod rpc;

pub use rpc::{JsonRpcLedgerClient, RpcError, RpcMethod, RpcRequest, RpcResponse};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transaction::TransactionStatus;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("ledger HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("ledger RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// Result of executing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub digest: String,
    pub status: TransactionStatus,
    /// Ledger-provided failure reason when `status` is `Failure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionResponse {
    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// The ledger's current epoch. Authoritative for session validity.
    async fn current_epoch(&self) -> Result<u64, LedgerError>;

    /// Execute `tx_bytes` (base64) under the given serialized signatures.
    async fn execute_transaction(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> Result<TransactionResponse, LedgerError>;
}
