//! # Identity Tokens
//!
//! The provider-signed JWT that comes back through the OAuth redirect.
//!
//! We decode the payload and **do not verify the signature**. That is not
//! an oversight: the prover checks the token against the provider's keys
//! before it will issue a proof, and the ledger checks the proof. Claims
//! decoded here drive display (name, avatar) and the handful of values the
//! pipeline feeds to the prover, which then validates them independently.
//! Nothing here authorizes an action on its own.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Errors raised while extracting or decoding an identity token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("redirect carried no id_token")]
    MissingToken,

    #[error("identity provider returned an error: {error} ({description})")]
    ProviderError { error: String, description: String },

    #[error("malformed identity token: {0}")]
    Malformed(String),

    #[error("identity token is missing required claim '{0}'")]
    MissingClaim(&'static str),
}

/// The `aud` claim: a single client id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    /// The audience used for address derivation: the only one, or the
    /// first of several.
    pub fn primary(&self) -> Option<&str> {
        match self {
            Audience::Single(aud) => Some(aud.as_str()),
            Audience::Many(list) => list.first().map(String::as_str),
        }
    }
}

/// Decoded JWT payload. Unknown claims are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Audience,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// The subset of claims worth showing a user. Persisted with the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayClaims {
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// A raw identity token plus its decoded claims.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityToken {
    raw: String,
    claims: IdentityClaims,
}

impl IdentityToken {
    /// Decode a compact-form JWT (`header.payload.signature`).
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let raw = raw.trim();
        if raw.split('.').count() != 3 {
            return Err(TokenError::Malformed(
                "expected three dot-separated segments".into(),
            ));
        }

        let claims = decode::<IdentityClaims>(raw, &DecodingKey::from_secret(&[]), &claims_only())
            .map_err(|e| TokenError::Malformed(e.to_string()))?
            .claims;

        if claims.sub.is_empty() {
            return Err(TokenError::MissingClaim("sub"));
        }
        if claims.iss.is_empty() {
            return Err(TokenError::MissingClaim("iss"));
        }
        if claims.aud.primary().map_or(true, str::is_empty) {
            return Err(TokenError::MissingClaim("aud"));
        }

        Ok(Self {
            raw: raw.to_string(),
            claims,
        })
    }

    /// The token exactly as the provider issued it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &IdentityClaims {
        &self.claims
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    /// Primary audience. Non-empty by construction.
    pub fn audience(&self) -> &str {
        self.claims.aud.primary().unwrap_or_default()
    }

    pub fn nonce(&self) -> Option<&str> {
        self.claims.nonce.as_deref()
    }

    /// The base64url header segment, carried verbatim into the proof inputs.
    pub fn header_base64(&self) -> &str {
        self.raw.split('.').next().unwrap_or_default()
    }

    /// Look up a claim by name, for the key claim the prover binds to.
    pub fn claim_value(&self, name: &str) -> Option<&str> {
        match name {
            "sub" => Some(self.claims.sub.as_str()),
            "email" => self.claims.email.as_deref(),
            "iss" => Some(self.claims.iss.as_str()),
            _ => None,
        }
    }

    pub fn display_claims(&self) -> DisplayClaims {
        DisplayClaims {
            email: self.claims.email.clone(),
            name: self.claims.name.clone(),
            picture: self.claims.picture.clone(),
        }
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The raw token is a bearer credential until it expires. Keep it out
        // of logs.
        f.debug_struct("IdentityToken")
            .field("iss", &self.claims.iss)
            .field("sub", &self.claims.sub)
            .finish_non_exhaustive()
    }
}

/// Decoding rules for a token whose signature the prover checks: no key,
/// no time or audience checks, no required registered claims.
fn claims_only() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}
