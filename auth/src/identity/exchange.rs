//! # Identity Exchange
//!
//! Drives the OAuth implicit-flow round trip:
//!
//! ```text
//!            initiate(nonce)               handle_callback(fragment)
//!   Idle ───────────────────► Redirected ───────────────────────────► CallbackReceived
//!     ▲                         ▲  │                                        │
//!     │ reset()        initiate │  │ malformed / wrong nonce                │ same fragment
//!     │                         │  ▼                                        ▼
//!     └──────────────────────  Failed                                 Duplicate (no-op)
//! ```
//!
//! The browser navigates away between `initiate` and `handle_callback`, so
//! the state is a plain serde value the session manager persists at both
//! suspension points. Nothing here touches the network.
//!
//! Duplicate delivery of the same redirect (double-fired events, a user
//! hitting reload on the callback page) is recognised by a SHA-256
//! fingerprint of the fragment and answered with
//! [`CallbackOutcome::Duplicate`], so proof issuance runs once.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::token::{IdentityToken, TokenError};
use crate::config::{OAuthConfig, RESPONSE_TYPE};
use crate::crypto::hash::sha256;
use crate::zklogin::nonce::Nonce;

/// Errors from the exchange state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("callback nonce does not match the pending login (expected {expected}, got {got})")]
    NonceMismatch { expected: String, got: String },

    #[error("callback received but no redirect is in flight")]
    NotRedirected,

    #[error("invalid authorize endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Persisted exchange state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExchangeState {
    Idle,
    Redirected {
        nonce: Nonce,
    },
    CallbackReceived {
        nonce: Nonce,
        fingerprint: String,
    },
    Failed {
        nonce: Nonce,
        fingerprint: Option<String>,
        reason: String,
    },
}

impl ExchangeState {
    /// The nonce the in-flight (or last) redirect carried.
    pub fn nonce(&self) -> Option<&Nonce> {
        match self {
            ExchangeState::Idle => None,
            ExchangeState::Redirected { nonce }
            | ExchangeState::CallbackReceived { nonce, .. }
            | ExchangeState::Failed { nonce, .. } => Some(nonce),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExchangeState::Idle => "idle",
            ExchangeState::Redirected { .. } => "redirected",
            ExchangeState::CallbackReceived { .. } => "callback_received",
            ExchangeState::Failed { .. } => "failed",
        }
    }
}

/// What a callback delivery produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// First delivery of this redirect. Carry on to resolution.
    Received(IdentityToken),
    /// This exact redirect was already accepted. Do nothing.
    Duplicate,
}

/// The exchange state machine for one login attempt.
#[derive(Debug, Clone)]
pub struct IdentityExchange {
    oauth: OAuthConfig,
    state: ExchangeState,
}

impl IdentityExchange {
    pub fn new(oauth: OAuthConfig) -> Self {
        Self::with_state(oauth, ExchangeState::Idle)
    }

    /// Resume from persisted state after a page load.
    pub fn with_state(oauth: OAuthConfig, state: ExchangeState) -> Self {
        Self { oauth, state }
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    /// Build the provider redirect URL and move to `Redirected`.
    ///
    /// Valid from any state: a fresh login replaces whatever came before, and
    /// a retry after `Failed` re-sends the same nonce.
    pub fn initiate(&mut self, nonce: &Nonce) -> Result<Url, ExchangeError> {
        let mut url = Url::parse(&self.oauth.authorize_endpoint)
            .map_err(|e| ExchangeError::InvalidEndpoint(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.oauth.client_id)
            .append_pair("redirect_uri", &self.oauth.redirect_uri)
            .append_pair("response_type", RESPONSE_TYPE)
            .append_pair("scope", &self.oauth.scope)
            .append_pair("nonce", nonce.as_str());

        self.state = ExchangeState::Redirected {
            nonce: nonce.clone(),
        };
        Ok(url)
    }

    /// Accept the provider's redirect.
    ///
    /// `input` may be the full callback URL or just its fragment. The token's
    /// `nonce` claim must equal the nonce of the in-flight redirect.
    pub fn handle_callback(&mut self, input: &str) -> Result<CallbackOutcome, ExchangeError> {
        let fragment = extract_fragment(input);
        let fingerprint = hex::encode(sha256(fragment.as_bytes()));

        let expected = match &self.state {
            ExchangeState::Idle => return Err(ExchangeError::NotRedirected),
            ExchangeState::CallbackReceived {
                fingerprint: seen, ..
            } if *seen == fingerprint => return Ok(CallbackOutcome::Duplicate),
            other => other.nonce().cloned().ok_or(ExchangeError::NotRedirected)?,
        };

        match parse_fragment(fragment).map_err(ExchangeError::from).and_then(|token| {
            match token.nonce() {
                Some(got) if got == expected.as_str() => Ok(token),
                got => Err(ExchangeError::NonceMismatch {
                    expected: expected.to_string(),
                    got: got.unwrap_or("<none>").to_string(),
                }),
            }
        }) {
            Ok(token) => {
                self.state = ExchangeState::CallbackReceived {
                    nonce: expected,
                    fingerprint,
                };
                Ok(CallbackOutcome::Received(token))
            }
            Err(err) => {
                self.state = ExchangeState::Failed {
                    nonce: expected,
                    fingerprint: Some(fingerprint),
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }

    /// Record a downstream failure (salt, proof) so the same redirect may be
    /// processed again instead of being swallowed as a duplicate.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let Some(nonce) = self.state.nonce().cloned() else {
            return;
        };
        let fingerprint = match &self.state {
            ExchangeState::CallbackReceived { fingerprint, .. } => Some(fingerprint.clone()),
            ExchangeState::Failed { fingerprint, .. } => fingerprint.clone(),
            _ => None,
        };
        self.state = ExchangeState::Failed {
            nonce,
            fingerprint,
            reason: reason.into(),
        };
    }

    pub fn reset(&mut self) {
        self.state = ExchangeState::Idle;
    }
}

/// Everything after `#`, or the whole input if there is no `#`.
fn extract_fragment(input: &str) -> &str {
    let input = input.trim();
    match input.split_once('#') {
        Some((_, fragment)) => fragment,
        None => input,
    }
}

fn parse_fragment(fragment: &str) -> Result<IdentityToken, TokenError> {
    let mut id_token = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "id_token" => id_token = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(TokenError::ProviderError {
            error,
            description: description.unwrap_or_default(),
        });
    }

    match id_token {
        Some(raw) if !raw.is_empty() => IdentityToken::parse(&raw),
        _ => Err(TokenError::MissingToken),
    }
}

/// The callback URL with its fragment removed, fit to put back in the
/// address bar once the token has been consumed.
pub fn scrub_fragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or_default().to_string(),
    }
}
