// Copyright (c) 2026 Foresight Markets. MIT License.
// See LICENSE for details.

//! # Session Manager Configuration & Constants
//!
//! Every magic number in the zkLogin pipeline lives here. If you're
//! hardcoding a flag byte or an epoch margin somewhere else, move it here
//! before somebody changes one copy and not the other.
//!
//! Several of these values are part of a compatibility contract: the
//! address derivation constants in particular decide which on-ledger
//! account a Google login lands in. Changing them after launch orphans
//! every existing account, so treat them as frozen.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

// ---------------------------------------------------------------------------
// Signature Scheme Flags
// ---------------------------------------------------------------------------

/// Scheme flag for Ed25519 keys and signatures. Prefixed to the ephemeral
/// public key (extended form) and to the user signature.
pub const ED25519_FLAG: u8 = 0x00;

/// Scheme flag for zkLogin authenticators. Prefixed to the composite
/// signature and mixed into address derivation.
pub const ZKLOGIN_FLAG: u8 = 0x05;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Nonce & Randomness
// ---------------------------------------------------------------------------

/// Number of low-order bytes of the nonce field element that survive into
/// the OAuth `nonce` parameter. 20 bytes = 160 bits, base64url-encoded to
/// 27 characters.
pub const NONCE_BYTES: usize = 20;

/// Length of the encoded nonce string.
pub const NONCE_LENGTH: usize = 27;

/// Randomness length in bytes. 128 bits, carried on the wire as a decimal
/// string.
pub const RANDOMNESS_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Domain Separation Contexts
// ---------------------------------------------------------------------------

/// BLAKE3 `derive_key` context for nonce commitments.
pub const NONCE_CONTEXT: &str = "foresight zklogin 2026 nonce commitment";

/// BLAKE3 `derive_key` context for address seeds.
pub const ADDRESS_SEED_CONTEXT: &str = "foresight zklogin 2026 address seed";

/// BLAKE3 `derive_key` context for locally derived salts.
pub const SALT_CONTEXT: &str = "foresight zklogin 2026 user salt";

/// BLAKE3 `derive_key` context for the transaction digest the ephemeral key
/// signs.
pub const TX_DIGEST_CONTEXT: &str = "foresight zklogin 2026 transaction intent";

/// Intent prefix prepended to transaction bytes before digesting:
/// `[scope = transaction, version = 0, app = ledger]`.
pub const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

// ---------------------------------------------------------------------------
// Session Lifetime
// ---------------------------------------------------------------------------

/// Epochs added to the current epoch at login time to produce the session's
/// expiry epoch. Two epochs covers the login round trip plus a working
/// session of one to two days on a 24-hour epoch ledger.
pub const DEFAULT_EPOCH_MARGIN: u64 = 2;

/// A session with this many epochs (or fewer) left is reported as near
/// expiry. Callers decide whether to prompt; the session keeps working.
pub const NEAR_EXPIRY_EPOCHS: u64 = 1;

// ---------------------------------------------------------------------------
// Identity Provider Defaults
// ---------------------------------------------------------------------------

/// Google's OAuth 2.0 authorization endpoint.
pub const DEFAULT_AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scope requested from the identity provider.
pub const DEFAULT_SCOPE: &str = "openid email profile";

/// The implicit flow returns the identity token directly in the fragment.
pub const RESPONSE_TYPE: &str = "id_token";

/// The JWT claim the prover binds the address to.
pub const DEFAULT_KEY_CLAIM_NAME: &str = "sub";

// ---------------------------------------------------------------------------
// External Service Defaults
// ---------------------------------------------------------------------------

/// Default zero-knowledge prover endpoint.
pub const DEFAULT_PROVER_URL: &str = "https://prover-dev.mystenlabs.com/v1";

/// Default ledger JSON-RPC endpoint.
pub const DEFAULT_LEDGER_RPC_URL: &str = "https://fullnode.devnet.sui.io:443";

/// Name of the sled tree holding every session-manager record.
pub const STORAGE_TREE: &str = "zklogin";

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Errors raised by [`ZkLoginConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OAuth client id must not be empty")]
    MissingClientId,

    #[error("invalid {field} URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("epoch margin must be at least 1")]
    ZeroEpochMargin,

    #[error("key claim name must not be empty")]
    MissingKeyClaim,
}

/// Identity-provider settings for the implicit-flow redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Provider authorization endpoint.
    pub authorize_endpoint: String,
    /// OAuth client id registered with the provider. Ends up as `aud`.
    pub client_id: String,
    /// Where the provider sends the browser back to.
    pub redirect_uri: String,
    /// Space-separated scope list.
    pub scope: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorize_endpoint: DEFAULT_AUTHORIZE_ENDPOINT.to_string(),
            client_id: String::new(),
            redirect_uri: "http://localhost:5173/auth/callback".to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// Everything the session manager needs to know that isn't a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkLoginConfig {
    pub oauth: OAuthConfig,
    /// Prover service endpoint.
    pub prover_url: String,
    /// See [`DEFAULT_EPOCH_MARGIN`].
    pub epoch_margin: u64,
    /// See [`DEFAULT_KEY_CLAIM_NAME`].
    pub key_claim_name: String,
}

impl Default for ZkLoginConfig {
    fn default() -> Self {
        Self {
            oauth: OAuthConfig::default(),
            prover_url: DEFAULT_PROVER_URL.to_string(),
            epoch_margin: DEFAULT_EPOCH_MARGIN,
            key_claim_name: DEFAULT_KEY_CLAIM_NAME.to_string(),
        }
    }
}

impl ZkLoginConfig {
    /// Check the configuration before any key material is generated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.client_id.trim().is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        check_http_url("authorize endpoint", &self.oauth.authorize_endpoint)?;
        check_http_url("redirect", &self.oauth.redirect_uri)?;
        check_http_url("prover", &self.prover_url)?;
        if self.epoch_margin == 0 {
            return Err(ConfigError::ZeroEpochMargin);
        }
        if self.key_claim_name.trim().is_empty() {
            return Err(ConfigError::MissingKeyClaim);
        }
        Ok(())
    }
}

fn check_http_url(field: &'static str, raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
