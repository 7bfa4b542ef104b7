//! External wallet capability.
//!
//! A browser-extension or hardware wallet the user may connect instead of,
//! or on top of, a zkLogin session. We never see its keys. It signs and
//! executes transactions itself and reports an address.

use async_trait::async_trait;
use thiserror::Error;

use crate::ledger::TransactionResponse;
use crate::transaction::Transaction;
use crate::zklogin::address::Address;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet is not connected")]
    NotConnected,

    /// The user declined in the wallet UI.
    #[error("wallet request rejected: {0}")]
    Rejected(String),

    #[error("wallet error: {0}")]
    Failed(String),
}

/// The interface an externally owned wallet exposes.
#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// The connected account, if any.
    fn address(&self) -> Option<Address>;

    fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    /// A short name for logs and UI ("Sui Wallet", "Ledger").
    fn name(&self) -> &str {
        "wallet"
    }

    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Sign `tx` with the wallet's own key and execute it.
    async fn sign_and_execute(&self, tx: &Transaction) -> Result<TransactionResponse, WalletError>;
}
