//! # Error Taxonomy
//!
//! Every fallible operation on the session manager returns [`AuthError`].
//! Component-level errors (`KeyError`, `TokenError`, `ProverError`, ...)
//! convert into it at the pipeline boundary, so callers branch on one enum.
//!
//! Two questions callers actually ask:
//!
//! - *Can I retry without sending the user back to the provider?*
//!   [`AuthError::is_recoverable`].
//! - *Is this just an expired session?* [`AuthError::is_expiry`]. Expiry is
//!   routine and should drop the UI back to "signed out" without an error
//!   dialog.

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::keys::KeyError;
use crate::facade::wallet::WalletError;
use crate::identity::exchange::ExchangeError;
use crate::identity::token::TokenError;
use crate::ledger::LedgerError;
use crate::storage::StorageError;
use crate::transaction::TransactionError;
use crate::zklogin::resolver::ResolveError;
use crate::zklogin::signer::SignatureFormatError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The ephemeral keypair or randomness could not be generated. The
    /// attempt is dead; start a fresh login.
    #[error("ephemeral key generation failed: {0}")]
    KeyGenerationFailed(#[source] KeyError),

    /// The redirect carried no usable identity token.
    #[error("callback could not be parsed: {0}")]
    CallbackParseFailed(#[source] TokenError),

    /// The callback belongs to a login attempt that has since been replaced.
    #[error("callback nonce {got} does not match pending login nonce {expected}")]
    NonceMismatch { expected: String, got: String },

    /// A callback arrived but there is no pending login to bind it to.
    #[error("no login is pending")]
    NoPendingLogin,

    /// Salt or proof resolution failed. The ephemeral key is kept; retry
    /// from the identity exchange.
    #[error("proof issuance failed: {0}")]
    ProofIssuanceFailed(#[source] ResolveError),

    /// The session's expiry epoch has been reached.
    #[error("session expired at epoch {max_epoch} (current epoch {current_epoch})")]
    SessionExpired { max_epoch: u64, current_epoch: u64 },

    /// No valid signing capability. Prompt the user to log in or connect.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The transaction failed structural validation before signing.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),

    #[error("signature encoding failed: {0}")]
    Signature(#[from] SignatureFormatError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// True when a retry can reuse the current pending login.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::ProofIssuanceFailed(_) | AuthError::Ledger(_)
        )
    }

    /// True for the routine end-of-session transition.
    pub fn is_expiry(&self) -> bool {
        matches!(self, AuthError::SessionExpired { .. })
    }
}

impl From<ExchangeError> for AuthError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Token(e) => AuthError::CallbackParseFailed(e),
            ExchangeError::NonceMismatch { expected, got } => {
                AuthError::NonceMismatch { expected, got }
            }
            ExchangeError::NotRedirected => AuthError::NoPendingLogin,
            ExchangeError::InvalidEndpoint(reason) => AuthError::Config(ConfigError::InvalidUrl {
                field: "authorize endpoint",
                reason,
            }),
        }
    }
}

impl From<ResolveError> for AuthError {
    fn from(err: ResolveError) -> Self {
        AuthError::ProofIssuanceFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zklogin::prover::ProverError;

    #[test]
    fn proof_failure_is_recoverable() {
        let err = AuthError::from(ResolveError::Prover(ProverError::Unreachable(
            "connection refused".into(),
        )));
        assert!(err.is_recoverable());
        assert!(!err.is_expiry());
    }

    #[test]
    fn expiry_is_not_a_failure() {
        let err = AuthError::SessionExpired {
            max_epoch: 100,
            current_epoch: 100,
        };
        assert!(err.is_expiry());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn exchange_errors_map_onto_taxonomy() {
        assert!(matches!(
            AuthError::from(ExchangeError::Token(TokenError::MissingToken)),
            AuthError::CallbackParseFailed(TokenError::MissingToken)
        ));
        assert!(matches!(
            AuthError::from(ExchangeError::NotRedirected),
            AuthError::NoPendingLogin
        ));
        assert!(matches!(
            AuthError::from(ExchangeError::NonceMismatch {
                expected: "a".into(),
                got: "b".into()
            }),
            AuthError::NonceMismatch { .. }
        ));
    }

    #[test]
    fn callback_failures_require_fresh_login() {
        let err = AuthError::CallbackParseFailed(TokenError::MissingToken);
        assert!(!err.is_recoverable());
    }
}
