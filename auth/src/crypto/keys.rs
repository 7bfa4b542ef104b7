//! # Ephemeral Key Management
//!
//! Ed25519 keypairs generated per login attempt. An ephemeral key lives for
//! one session at most: it is created when login begins, authorized by the
//! zero-knowledge proof, and thrown away on logout, on expiry, or when a new
//! login attempt overwrites it.
//!
//! ## Security considerations
//!
//! - Secret keys are zeroized on drop (ed25519-dalek does this for us).
//! - Generation uses `OsRng`.
//! - The secret half has no public accessor. The only way out of this
//!   module is [`EphemeralKeypair::secret_hex`], which is crate-private and
//!   exists for the pending-login store to persist the key across the OAuth
//!   redirect. Key bytes are never logged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{ED25519_FLAG, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur during key operations.
///
/// Deliberately vague. Explaining in detail why a secret failed to load is
/// a gift to whoever is poking at it.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes")]
    InvalidPublicKey,

    #[error("invalid signature bytes")]
    InvalidSignature,

    #[error("system entropy source unavailable")]
    EntropyUnavailable,
}

/// A short-lived Ed25519 signing keypair.
///
/// Does not implement `Serialize`. Persisting a private key should be a
/// deliberate act, and in this crate only the pending-login store does it.
///
/// # Examples
///
/// ```
/// use foresight_auth::crypto::keys::EphemeralKeypair;
///
/// let kp = EphemeralKeypair::generate();
/// let sig = kp.sign(b"place bet");
/// assert!(kp.public_key().verify(b"place bet", &sig));
/// ```
pub struct EphemeralKeypair {
    signing_key: SigningKey,
}

/// The public half of an ephemeral keypair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EphemeralPublicKey {
    bytes: [u8; PUBLIC_KEY_LENGTH],
}

/// An Ed25519 signature produced by an ephemeral key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralSignature {
    bytes: Vec<u8>,
}

impl EphemeralKeypair {
    /// Generate a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Like [`generate`](Self::generate), but reports an unavailable
    /// entropy source instead of panicking.
    pub fn try_generate() -> Result<Self, KeyError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|_| KeyError::EntropyUnavailable)?;
        let keypair = Self::from_seed(&seed);
        seed.fill(0);
        Ok(keypair)
    }

    /// Deterministic construction from a 32-byte seed. Tests and benches only
    /// want this; production keys come from [`generate`](Self::generate).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Restore a keypair from its hex-encoded secret.
    pub(crate) fn from_secret_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&arr))
    }

    /// Hex-encoded secret key, for the pending-login store only.
    pub(crate) fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> EphemeralPublicKey {
        EphemeralPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign `message`. Deterministic per RFC 8032.
    pub fn sign(&self, message: &[u8]) -> EphemeralSignature {
        EphemeralSignature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }
}

impl Clone for EphemeralKeypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Public half only. A partial secret leak is still a leak.
        write!(f, "EphemeralKeypair(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for EphemeralKeypair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for EphemeralKeypair {}

// ---------------------------------------------------------------------------
// EphemeralPublicKey
// ---------------------------------------------------------------------------

impl EphemeralPublicKey {
    /// Parse and validate a public key from a byte slice.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.bytes
    }

    /// `flag || public_key`, the scheme-tagged form the prover and the
    /// ledger expect.
    pub fn extended_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + PUBLIC_KEY_LENGTH);
        out.push(ED25519_FLAG);
        out.extend_from_slice(&self.bytes);
        out
    }

    /// Base64 of [`extended_bytes`](Self::extended_bytes).
    pub fn to_extended_base64(&self) -> String {
        STANDARD.encode(self.extended_bytes())
    }

    /// Verify `signature` over `message`. `false` on any malformed input.
    pub fn verify(&self, message: &[u8], signature: &EphemeralSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature.bytes.as_slice()) else {
            return false;
        };
        verifying_key
            .verify(message, &DalekSignature::from_bytes(&sig_bytes))
            .is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for EphemeralPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for EphemeralPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EphemeralPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// EphemeralSignature
// ---------------------------------------------------------------------------

impl EphemeralSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(KeyError::InvalidSignature);
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `flag || signature || public_key`: the ledger's serialized form of
    /// a single-key signature, embedded in the composite zkLogin signature.
    pub fn to_serialized(&self, public_key: &EphemeralPublicKey) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + SIGNATURE_LENGTH + PUBLIC_KEY_LENGTH);
        out.push(ED25519_FLAG);
        out.extend_from_slice(&self.bytes);
        out.extend_from_slice(public_key.as_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for EphemeralSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "EphemeralSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "EphemeralSignature({})", hex_str)
        }
    }
}
