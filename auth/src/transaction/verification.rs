//! Structural checks run before a transaction is handed to any signer.
//!
//! Cheap, local, and deliberately shallow. Balances, market state and
//! nonce ordering are the ledger's business.

use thiserror::Error;

use super::builder::Transaction;
use super::types::TransactionKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("gas budget must be non-zero")]
    ZeroGasBudget,

    #[error("stake must be non-zero")]
    ZeroStake,

    #[error("transfer amount must be non-zero")]
    ZeroAmount,

    #[error("market id must not be empty")]
    EmptyMarketId,

    #[error("transfer recipient must not be empty")]
    EmptyRecipient,

    #[error("cannot transfer to self ({address})")]
    SelfTransfer { address: String },

    #[error("transaction expired at epoch {expiration_epoch} (current epoch {current_epoch})")]
    Expired {
        expiration_epoch: u64,
        current_epoch: u64,
    },
}

/// Validate `tx` as it would be submitted at `current_epoch`.
///
/// Runs after the sender has been set, so self-transfers are caught.
pub fn validate_transaction(tx: &Transaction, current_epoch: u64) -> Result<(), TransactionError> {
    if tx.gas_budget == 0 {
        return Err(TransactionError::ZeroGasBudget);
    }

    match &tx.kind {
        TransactionKind::PlaceBet {
            market_id, stake, ..
        } => {
            if market_id.is_empty() {
                return Err(TransactionError::EmptyMarketId);
            }
            if *stake == 0 {
                return Err(TransactionError::ZeroStake);
            }
        }
        TransactionKind::ClaimWinnings { market_id } => {
            if market_id.is_empty() {
                return Err(TransactionError::EmptyMarketId);
            }
        }
        TransactionKind::Transfer { recipient, amount } => {
            if recipient.is_empty() {
                return Err(TransactionError::EmptyRecipient);
            }
            if *amount == 0 {
                return Err(TransactionError::ZeroAmount);
            }
            if tx.sender.as_deref() == Some(recipient.as_str()) {
                return Err(TransactionError::SelfTransfer {
                    address: recipient.clone(),
                });
            }
        }
    }

    if let Some(expiration_epoch) = tx.expiration_epoch {
        if current_epoch > expiration_epoch {
            return Err(TransactionError::Expired {
                expiration_epoch,
                current_epoch,
            });
        }
    }

    Ok(())
}
