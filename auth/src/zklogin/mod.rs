//! # zkLogin Pipeline
//!
//! Turns a one-time OAuth sign-in into an epoch-bounded capability to sign
//! ledger transactions, without any long-lived private key leaving the
//! client.
//!
//! ## Architecture
//!
//! ```text
//! pending.rs   — Key & randomness store (survives the redirect)
//! nonce.rs     — Nonce binder: commits pk, max epoch, randomness
//! salt.rs      — Per-identity salt (derived locally, or remote)
//! address.rs   — Address seed and address derivation
//! prover.rs    — External prover client and ZkProof wire types
//! resolver.rs  — Salt → address → proof, strictly in order
//! session.rs   — Persisted session record and epoch-based expiry
//! signer.rs    — Composite signature over a transaction
//! manager.rs   — ZkLoginSession: the session context tying it together
//! ```
//!
//! ## Flow
//!
//! 1. [`ZkLoginSession::begin_login`] generates a key and randomness,
//!    derives the nonce and returns the provider redirect URL.
//! 2. The provider sends the browser back; [`ZkLoginSession::complete_login`]
//!    validates the callback, resolves salt, address and proof, and saves
//!    the session.
//! 3. [`ZkLoginSession::sign`] produces composite signatures until the
//!    ledger's epoch reaches the session's `max_epoch`.

pub mod address;
pub mod manager;
pub mod nonce;
pub mod pending;
pub mod prover;
pub mod resolver;
pub mod salt;
pub mod session;
pub mod signer;

pub use address::{derive_address, derive_address_seed, Address, AddressError, AddressSeed};
pub use manager::{LoginOutcome, LoginRedirect, ZkLoginSession};
pub use nonce::{derive_nonce, max_epoch_for, Nonce, Randomness};
pub use pending::{PendingLogin, PendingLoginStore};
pub use prover::{HttpProverClient, ProofRequest, ProverClient, ProverError, ZkProof};
pub use resolver::{AddressProofResolver, ResolveError, ResolvedIdentity};
pub use salt::{DerivedSaltProvider, RemoteSaltProvider, Salt, SaltError, SaltProvider};
pub use session::{is_valid, SessionRecord, SessionStatus, SessionStore, SessionSummary};
pub use signer::{
    transaction_digest, CompositeSignature, SignatureFormatError, TransactionSigner,
    ZkLoginInputs, ZkLoginSignature,
};
