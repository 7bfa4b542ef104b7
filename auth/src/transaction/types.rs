//! Core type definitions for market transactions.
//!
//! Small and boring on purpose. All amounts are `u64` in the smallest
//! denomination of the settlement coin.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market identifier as the ledger knows it (an object id, `0x`-hex).
pub type MarketId = String;

// ---------------------------------------------------------------------------
// TransactionKind
// ---------------------------------------------------------------------------

/// The operation a transaction performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Stake on one outcome of a market.
    PlaceBet {
        market_id: MarketId,
        outcome_index: u8,
        stake: u64,
    },
    /// Collect the payout of a resolved market.
    ClaimWinnings { market_id: MarketId },
    /// Plain coin transfer.
    Transfer { recipient: String, amount: u64 },
}

impl TransactionKind {
    /// Stable one-byte tag used in the canonical encoding.
    pub fn tag(&self) -> u8 {
        match self {
            Self::PlaceBet { .. } => 0,
            Self::ClaimWinnings { .. } => 1,
            Self::Transfer { .. } => 2,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceBet {
                market_id,
                outcome_index,
                stake,
            } => write!(f, "PlaceBet({market_id}, outcome {outcome_index}, stake {stake})"),
            Self::ClaimWinnings { market_id } => write!(f, "ClaimWinnings({market_id})"),
            Self::Transfer { recipient, amount } => write!(f, "Transfer({amount} -> {recipient})"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Execution outcome reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Failure,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}
