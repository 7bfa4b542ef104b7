//! # Cryptographic Primitives
//!
//! Ed25519 ephemeral keys and the hash constructions the pipeline commits
//! with. Everything here is a thin, typed wrapper over audited crates
//! (`ed25519-dalek`, `blake3`, `sha2`, arkworks BN254). Nothing is
//! hand-rolled, and nothing should be.

pub mod hash;
pub mod keys;

pub use hash::{domain_separated_hash, hash_to_field, sha256};
pub use keys::{EphemeralKeypair, EphemeralPublicKey, EphemeralSignature, KeyError};
