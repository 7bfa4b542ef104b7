//! # Transaction Module
//!
//! The market transactions a signed-in user submits: bets, winnings
//! claims, transfers.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — TransactionKind and ledger status enums
//! builder.rs      — Transaction, canonical bytes, fluent TransactionBuilder
//! verification.rs — Structural checks before signing
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build** — [`TransactionBuilder`] assembles an unsigned, sender-less
//!    transaction.
//! 2. **Validate** — [`validate_transaction`] rejects obvious nonsense.
//! 3. **Sign** — the active capability sets the sender and signs (zkLogin
//!    composite signature, or the wallet's own).
//! 4. **Submit** — the ledger executes it.
//!
//! Amounts are `u64` in the smallest unit. No floating point anywhere near
//! money.

pub mod builder;
pub mod types;
pub mod verification;

pub use builder::{Transaction, TransactionBuilder, DEFAULT_GAS_BUDGET};
pub use types::{MarketId, TransactionKind, TransactionStatus};
pub use verification::{validate_transaction, TransactionError};
