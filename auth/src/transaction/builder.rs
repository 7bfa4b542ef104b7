//! Transaction construction via the builder pattern.
//!
//! The builder produces an unsigned, sender-less [`Transaction`]. The
//! sender is filled in by whichever capability signs it, since a zkLogin
//! address is only known once the session resolves.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::types::{MarketId, TransactionKind};
use crate::crypto::hash::double_sha256;

/// Default gas budget, in the smallest coin unit.
pub const DEFAULT_GAS_BUDGET: u64 = 10_000_000;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A market transaction.
///
/// # Canonical Byte Format
///
/// [`Transaction::signable_bytes`] serializes, in order: kind tag, kind
/// fields, sender, gas budget, nonce, expiration epoch. Strings are
/// null-terminated, integers fixed-width little-endian, optionals carry a
/// presence byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address. `None` until a signer claims the transaction.
    pub sender: Option<String>,

    pub kind: TransactionKind,

    /// Maximum gas the sender will pay.
    pub gas_budget: u64,

    /// Per-sender sequence number.
    pub nonce: u64,

    /// Last epoch in which the ledger will accept this transaction.
    pub expiration_epoch: Option<u64>,
}

impl Transaction {
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);

        buf.push(self.kind.tag());
        match &self.kind {
            TransactionKind::PlaceBet {
                market_id,
                outcome_index,
                stake,
            } => {
                push_str(&mut buf, market_id);
                buf.push(*outcome_index);
                buf.extend_from_slice(&stake.to_le_bytes());
            }
            TransactionKind::ClaimWinnings { market_id } => push_str(&mut buf, market_id),
            TransactionKind::Transfer { recipient, amount } => {
                push_str(&mut buf, recipient);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
        }

        match &self.sender {
            Some(sender) => {
                buf.push(0x01);
                push_str(&mut buf, sender);
            }
            None => buf.push(0x00),
        }

        buf.extend_from_slice(&self.gas_budget.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());

        match self.expiration_epoch {
            Some(epoch) => {
                buf.push(0x01);
                buf.extend_from_slice(&epoch.to_le_bytes());
            }
            None => buf.push(0x00),
        }

        buf
    }

    /// `hex(double_sha256(signable_bytes))`. Display only; the signed digest
    /// is intent-prefixed and computed by the signer.
    pub fn digest(&self) -> String {
        hex::encode(double_sha256(&self.signable_bytes()))
    }

    /// Transaction bytes as submitted to the ledger.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.signable_bytes())
    }
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0x00);
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```
/// use foresight_auth::transaction::TransactionBuilder;
///
/// let tx = TransactionBuilder::place_bet("0xmarket", 1, 250)
///     .gas_budget(5_000_000)
///     .nonce(7)
///     .build();
/// assert!(tx.sender.is_none());
/// ```
pub struct TransactionBuilder {
    kind: TransactionKind,
    sender: Option<String>,
    gas_budget: u64,
    nonce: u64,
    expiration_epoch: Option<u64>,
}

impl TransactionBuilder {
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            sender: None,
            gas_budget: DEFAULT_GAS_BUDGET,
            nonce: 0,
            expiration_epoch: None,
        }
    }

    pub fn place_bet(market_id: impl Into<MarketId>, outcome_index: u8, stake: u64) -> Self {
        Self::new(TransactionKind::PlaceBet {
            market_id: market_id.into(),
            outcome_index,
            stake,
        })
    }

    pub fn claim_winnings(market_id: impl Into<MarketId>) -> Self {
        Self::new(TransactionKind::ClaimWinnings {
            market_id: market_id.into(),
        })
    }

    pub fn transfer(recipient: impl Into<String>, amount: u64) -> Self {
        Self::new(TransactionKind::Transfer {
            recipient: recipient.into(),
            amount,
        })
    }

    /// Pre-set the sender. Signers overwrite it with their own address.
    pub fn sender(mut self, address: &str) -> Self {
        self.sender = Some(address.to_string());
        self
    }

    pub fn gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn expiration_epoch(mut self, epoch: u64) -> Self {
        self.expiration_epoch = Some(epoch);
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            sender: self.sender,
            kind: self.kind,
            gas_budget: self.gas_budget,
            nonce: self.nonce,
            expiration_epoch: self.expiration_epoch,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
