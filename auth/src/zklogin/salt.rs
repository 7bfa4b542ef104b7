//! # User Salt
//!
//! The salt is the per-identity secret mixed into address derivation. It
//! must be stable: the same `(iss, aud, sub)` has to get the same salt on
//! every login, forever, or the user lands in a fresh empty account.
//!
//! Two providers:
//!
//! - [`DerivedSaltProvider`] derives the salt locally with keyed BLAKE3 from
//!   an application seed. **This is the production strategy** and the seed
//!   is part of the address compatibility contract.
//! - [`RemoteSaltProvider`] asks an HTTP salt service. Kept for
//!   deployments that run one; switching an existing user base between the
//!   two moves every address.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SALT_CONTEXT;
use crate::crypto::hash::domain_separated_hash;
use crate::identity::token::IdentityToken;

#[derive(Debug, Error)]
pub enum SaltError {
    #[error("salt seed must be 32 bytes of hex")]
    InvalidSeed,

    #[error("salt service unreachable: {0}")]
    Unreachable(String),

    #[error("salt service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("salt service returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// A 128-bit user salt. Serialized as a decimal string.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Salt(u128);

impl Salt {
    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub fn to_decimal(&self) -> String {
        self.0.to_string()
    }

    pub fn to_le_bytes(&self) -> [u8; 16] {
        self.0.to_le_bytes()
    }
}

impl From<Salt> for String {
    fn from(salt: Salt) -> Self {
        salt.to_decimal()
    }
}

impl TryFrom<String> for Salt {
    type Error = SaltError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<u128>()
            .map(Salt)
            .map_err(|e| SaltError::InvalidResponse(format!("salt is not a decimal u128: {e}")))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// Source of user salts.
#[async_trait]
pub trait SaltProvider: Send + Sync {
    async fn salt_for(&self, token: &IdentityToken) -> Result<Salt, SaltError>;
}

// ---------------------------------------------------------------------------
// Derived (authoritative)
// ---------------------------------------------------------------------------

/// Deterministic local salt: `BLAKE3-derive_key(SALT_CONTEXT, seed ‖ iss ‖ aud ‖ sub)`,
/// low 16 bytes.
#[derive(Clone)]
pub struct DerivedSaltProvider {
    seed: [u8; 32],
}

impl DerivedSaltProvider {
    pub fn new(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    pub fn from_hex(seed_hex: &str) -> Result<Self, SaltError> {
        let bytes = hex::decode(seed_hex.trim()).map_err(|_| SaltError::InvalidSeed)?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| SaltError::InvalidSeed)?;
        Ok(Self { seed })
    }

    pub fn derive(&self, iss: &str, aud: &str, sub: &str) -> Salt {
        let digest = domain_separated_hash(
            SALT_CONTEXT,
            &[&self.seed, iss.as_bytes(), aud.as_bytes(), sub.as_bytes()],
        );
        let mut low = [0u8; 16];
        low.copy_from_slice(&digest[..16]);
        Salt(u128::from_le_bytes(low))
    }
}

impl fmt::Debug for DerivedSaltProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedSaltProvider { seed: <redacted> }")
    }
}

#[async_trait]
impl SaltProvider for DerivedSaltProvider {
    async fn salt_for(&self, token: &IdentityToken) -> Result<Salt, SaltError> {
        Ok(self.derive(token.issuer(), token.audience(), token.subject()))
    }
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SaltRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct SaltResponse {
    salt: String,
}

/// Salt fetched from an HTTP service: `POST {url}` with `{"token": jwt}`,
/// answered by `{"salt": "<decimal>"}`.
#[derive(Debug, Clone)]
pub struct RemoteSaltProvider {
    client: Client,
    url: String,
}

impl RemoteSaltProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SaltProvider for RemoteSaltProvider {
    async fn salt_for(&self, token: &IdentityToken) -> Result<Salt, SaltError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SaltRequest { token: token.raw() })
            .send()
            .await
            .map_err(|e| SaltError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SaltError::Rejected { status, body });
        }

        let parsed: SaltResponse = response
            .json()
            .await
            .map_err(|e| SaltError::InvalidResponse(e.to_string()))?;
        Salt::try_from(parsed.salt)
    }
}
