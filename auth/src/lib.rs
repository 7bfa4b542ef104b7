// Copyright (c) 2026 Foresight Markets. MIT License.
// See LICENSE for details.

//! # Foresight Auth — zkLogin Session Manager
//!
//! Sign in with Google, trade on-chain, never hold a seed phrase. This crate
//! is the part of the Foresight client that makes that sentence true: it
//! turns a one-time OAuth sign-in into a short-lived, epoch-bounded
//! capability to sign ledger transactions, and no long-lived private key
//! ever leaves the device.
//!
//! The trick is zkLogin. An ephemeral Ed25519 key is committed into the
//! OAuth nonce, the provider signs a token carrying that nonce, and an
//! external prover turns token + key into a zero-knowledge proof the ledger
//! accepts in place of a conventional signature. Lose the key and you lose a
//! day of session, not an account.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 ephemeral keys, BLAKE3/SHA-256, hash-to-field.
//! - **identity** — OAuth redirect/callback state machine and token decoding.
//! - **zklogin** — Nonce, salt, address, proof, session, signer, and the
//!   session context that drives them.
//! - **facade** — One capability for the app: wallet first, zkLogin second.
//! - **ledger** — JSON-RPC client for epochs and transaction execution.
//! - **transaction** — Market transactions: bets, claims, transfers.
//! - **storage** — Durable key/value storage (sled) for the redirect gap.
//! - **config** — Protocol constants and runtime configuration.
//! - **error** — The error taxonomy callers branch on.
//!
//! ## Design Philosophy
//!
//! 1. The ledger's epoch is the only clock that matters.
//! 2. Expired sessions are absent sessions. No half-valid states.
//! 3. Secrets stay out of logs and `Debug` output.
//! 4. Every external service sits behind a trait, so every flow has a test.

pub mod config;
pub mod crypto;
pub mod error;
pub mod facade;
pub mod identity;
pub mod ledger;
pub mod storage;
pub mod transaction;
pub mod zklogin;

pub use error::{AuthError, AuthResult};
pub use facade::{AuthCapability, AuthFacade, CapabilitySource, LogoutReport, User};
pub use zklogin::{LoginOutcome, LoginRedirect, ZkLoginSession};
