//! # Nonce Binder
//!
//! The OAuth `nonce` parameter commits the ephemeral public key, the
//! session's expiry epoch, and fresh randomness into one value:
//!
//! ```text
//! n      = hash_to_field(NONCE_CONTEXT, [ext_pk, max_epoch_le, randomness_le])
//! nonce  = base64url_nopad(be_bytes(n)[12..32])     // low 20 bytes
//! ```
//!
//! The provider copies the nonce into the identity token it signs. The
//! prover recomputes it from the same three inputs and refuses to issue a
//! proof if they disagree, which is what stops a token obtained for one key
//! from authorizing another.
//!
//! Pure functions only. Persisting the inputs is the pending-login store's
//! job.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{NONCE_BYTES, NONCE_CONTEXT, RANDOMNESS_BYTES};
use crate::crypto::hash::{field_to_be_bytes, hash_to_field};
use crate::crypto::keys::{EphemeralPublicKey, KeyError};

// ---------------------------------------------------------------------------
// Randomness
// ---------------------------------------------------------------------------

/// 128 bits of single-use randomness mixed into the nonce.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Randomness(u128);

impl Randomness {
    /// Draw fresh randomness from the OS CSPRNG.
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; RANDOMNESS_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| KeyError::EntropyUnavailable)?;
        Ok(Self(u128::from_le_bytes(bytes)))
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Decimal string, the prover's wire format.
    pub fn to_decimal(&self) -> String {
        self.0.to_string()
    }

    pub fn from_decimal(s: &str) -> Option<Self> {
        s.trim().parse::<u128>().ok().map(Self)
    }

    pub fn to_le_bytes(&self) -> [u8; RANDOMNESS_BYTES] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for Randomness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Randomness(..)")
    }
}

// ---------------------------------------------------------------------------
// Nonce
// ---------------------------------------------------------------------------

/// The encoded nonce sent to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the nonce for `(public_key, max_epoch, randomness)`.
pub fn derive_nonce(
    public_key: &EphemeralPublicKey,
    max_epoch: u64,
    randomness: &Randomness,
) -> Nonce {
    let element = hash_to_field(
        NONCE_CONTEXT,
        &[
            &public_key.extended_bytes(),
            &max_epoch.to_le_bytes(),
            &randomness.to_le_bytes(),
        ],
    );
    let be = field_to_be_bytes(&element);
    Nonce(URL_SAFE_NO_PAD.encode(&be[32 - NONCE_BYTES..]))
}

/// Expiry epoch for a session started at `current_epoch`.
pub fn max_epoch_for(current_epoch: u64, margin: u64) -> u64 {
    current_epoch.saturating_add(margin)
}
