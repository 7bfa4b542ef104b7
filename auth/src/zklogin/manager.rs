//! # Session Manager
//!
//! [`ZkLoginSession`] is the explicit session context that runs the whole
//! pipeline. Everything it touches is injected at construction: config,
//! durable store, ledger, salt provider, prover. Nothing is global, so two
//! sessions over two stores never see each other.
//!
//! ## Suspension points
//!
//! ```text
//! begin_login ──► [persist pending key + exchange state] ──► redirect out
//!                                                               │
//! complete_login ◄──────────────────────── redirect back ◄──────┘
//!     ├─ exchange.handle_callback   (duplicate → no-op)
//!     ├─ [persist token]
//!     ├─ resolver.resolve           (salt → address → proof)
//!     ├─ [persist SessionRecord]
//!     └─ [persist CallbackReceived]
//! ```
//!
//! The exchange only reaches `CallbackReceived` on disk after the session
//! record is written. Any failure in between leaves it `Failed`, and a
//! process that dies mid-flow leaves it `Redirected`. Either way the same
//! callback can be delivered again and is processed from scratch.
//!
//! Mutating flows run under one async mutex. Two deliveries of the same
//! callback arriving together still produce exactly one proof request: the
//! second waits, then finds `CallbackReceived` with a matching fingerprint.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::config::ZkLoginConfig;
use crate::error::{AuthError, AuthResult};
use crate::identity::exchange::{CallbackOutcome, ExchangeState, IdentityExchange};
use crate::identity::token::IdentityToken;
use crate::ledger::{LedgerClient, TransactionResponse};
use crate::storage::{keys, KeyValueStore, KeyValueStoreExt};
use crate::transaction::{validate_transaction, Transaction};
use crate::zklogin::nonce::{max_epoch_for, Nonce};
use crate::zklogin::pending::{PendingLogin, PendingLoginStore};
use crate::zklogin::prover::ProverClient;
use crate::zklogin::resolver::AddressProofResolver;
use crate::zklogin::salt::SaltProvider;
use crate::zklogin::session::{SessionRecord, SessionStatus, SessionStore};
use crate::zklogin::signer::{CompositeSignature, TransactionSigner};

/// Where to send the browser, and what the redirect commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub url: Url,
    pub nonce: Nonce,
    pub max_epoch: u64,
}

/// What a callback delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A new session was created.
    Authenticated(SessionRecord),
    /// The same callback was already processed; nothing happened.
    AlreadyHandled,
}

/// The zkLogin session context.
pub struct ZkLoginSession {
    config: ZkLoginConfig,
    store: Arc<dyn KeyValueStore>,
    ledger: Arc<dyn LedgerClient>,
    resolver: AddressProofResolver,
    pending: PendingLoginStore,
    sessions: SessionStore,
    flow: Mutex<()>,
}

impl ZkLoginSession {
    pub fn new(
        config: ZkLoginConfig,
        store: Arc<dyn KeyValueStore>,
        ledger: Arc<dyn LedgerClient>,
        salt: Arc<dyn SaltProvider>,
        prover: Arc<dyn ProverClient>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let resolver = AddressProofResolver::new(salt, prover, config.key_claim_name.clone());
        Ok(Self {
            pending: PendingLoginStore::new(store.clone()),
            sessions: SessionStore::new(store.clone()),
            config,
            store,
            ledger,
            resolver,
            flow: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ZkLoginConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Start a fresh login: new key, new randomness, new nonce, new redirect.
    ///
    /// Replaces any pending login and any existing session. A callback for a
    /// replaced attempt will fail with `NonceMismatch`.
    pub async fn begin_login(&self) -> AuthResult<LoginRedirect> {
        let _flow = self.flow.lock().await;

        let current_epoch = self.ledger.current_epoch().await?;
        let max_epoch = max_epoch_for(current_epoch, self.config.epoch_margin);

        self.sessions.clear()?;
        let pending = self.pending.begin(max_epoch)?;

        let mut exchange = IdentityExchange::new(self.config.oauth.clone());
        let url = exchange.initiate(pending.nonce())?;
        self.save_exchange(exchange.state())?;

        info!(
            current_epoch,
            max_epoch,
            public_key = %pending.public_key(),
            "login initiated"
        );
        Ok(LoginRedirect {
            url,
            nonce: pending.nonce().clone(),
            max_epoch,
        })
    }

    /// Process the provider's redirect (full URL or fragment).
    pub async fn complete_login(&self, callback: &str) -> AuthResult<LoginOutcome> {
        let _flow = self.flow.lock().await;

        let mut exchange =
            IdentityExchange::with_state(self.config.oauth.clone(), self.load_exchange()?);
        let pending = self.pending.pending()?.ok_or(AuthError::NoPendingLogin)?;

        if let Some(expected) = exchange.state().nonce() {
            if expected != pending.nonce() {
                warn!("exchange state belongs to a replaced login attempt");
                return Err(AuthError::NonceMismatch {
                    expected: pending.nonce().to_string(),
                    got: expected.to_string(),
                });
            }
        }

        let token = match exchange.handle_callback(callback) {
            Ok(CallbackOutcome::Received(token)) => token,
            Ok(CallbackOutcome::Duplicate) => {
                info!("duplicate callback ignored");
                return Ok(LoginOutcome::AlreadyHandled);
            }
            Err(err) => {
                warn!(error = %err, "callback rejected");
                self.save_exchange(exchange.state())?;
                return Err(err.into());
            }
        };
        info!(issuer = token.issuer(), "callback received");

        // CallbackReceived is only persisted once the session is saved. Until
        // then a redelivery of the same fragment must be processed again.
        match self.establish_session(&token, &pending).await {
            Ok(record) => {
                self.save_exchange(exchange.state())?;
                info!(address = %record.address, max_epoch = record.max_epoch, "login complete");
                Ok(LoginOutcome::Authenticated(record))
            }
            Err(err) if err.is_expiry() => Err(err),
            Err(err) => {
                warn!(error = %err, "login failed after callback, pending key kept for retry");
                exchange.mark_failed(err.to_string());
                if let Err(save_err) = self.save_exchange(exchange.state()) {
                    warn!(error = %save_err, "could not record failed callback");
                }
                Err(err)
            }
        }
    }

    /// Everything between an accepted callback and a saved session.
    async fn establish_session(
        &self,
        token: &IdentityToken,
        pending: &PendingLogin,
    ) -> AuthResult<SessionRecord> {
        self.store.put_json(keys::ID_TOKEN, &token.raw())?;

        let current_epoch = self.ledger.current_epoch().await?;
        if current_epoch >= pending.max_epoch() {
            warn!(
                max_epoch = pending.max_epoch(),
                current_epoch,
                "pending login expired before resolution"
            );
            self.sessions.clear()?;
            return Err(AuthError::SessionExpired {
                max_epoch: pending.max_epoch(),
                current_epoch,
            });
        }

        let resolved = self.resolver.resolve(token, pending).await?;

        let record = SessionRecord {
            address: resolved.address,
            address_seed: resolved.address_seed,
            salt: resolved.salt,
            proof: resolved.proof,
            max_epoch: pending.max_epoch(),
            ephemeral_public_key: pending.public_key(),
            issuer: token.issuer().to_string(),
            display: token.display_claims(),
            created_at: chrono::Utc::now(),
        };
        self.sessions.save(&record)?;
        Ok(record)
    }

    /// Re-issue the redirect for the current pending login after a failure.
    ///
    /// Same key, same nonce. Only valid while the pending key's expiry epoch
    /// has not been reached; after that a fresh `begin_login` is required.
    pub async fn restart_identity_exchange(&self) -> AuthResult<LoginRedirect> {
        let _flow = self.flow.lock().await;

        let pending = self.pending.pending()?.ok_or(AuthError::NoPendingLogin)?;
        let current_epoch = self.ledger.current_epoch().await?;
        if current_epoch >= pending.max_epoch() {
            self.sessions.clear()?;
            return Err(AuthError::SessionExpired {
                max_epoch: pending.max_epoch(),
                current_epoch,
            });
        }

        let mut exchange =
            IdentityExchange::with_state(self.config.oauth.clone(), self.load_exchange()?);
        let url = exchange.initiate(pending.nonce())?;
        self.save_exchange(exchange.state())?;

        info!(max_epoch = pending.max_epoch(), "identity exchange restarted");
        Ok(LoginRedirect {
            url,
            nonce: pending.nonce().clone(),
            max_epoch: pending.max_epoch(),
        })
    }

    pub fn exchange_state(&self) -> AuthResult<ExchangeState> {
        self.load_exchange()
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// The current session, or `None` if there is none or it has expired.
    /// Expired sessions are purged on the way.
    pub async fn current_session(&self) -> AuthResult<Option<SessionRecord>> {
        let current_epoch = self.ledger.current_epoch().await?;
        self.sessions.load(current_epoch)
    }

    pub async fn status(&self) -> AuthResult<Option<SessionStatus>> {
        let current_epoch = self.ledger.current_epoch().await?;
        Ok(self
            .sessions
            .load(current_epoch)?
            .map(|record| SessionStatus::new(record, current_epoch)))
    }

    // -----------------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------------

    /// Set `tx.sender` to the session address and produce its composite
    /// signature. `NotAuthenticated` without a live session.
    pub async fn sign(&self, tx: &mut Transaction) -> AuthResult<CompositeSignature> {
        let current_epoch = self.ledger.current_epoch().await?;
        self.sign_at(tx, current_epoch)
    }

    fn sign_at(&self, tx: &mut Transaction, current_epoch: u64) -> AuthResult<CompositeSignature> {
        let record = self.sessions.load(current_epoch)?;
        let signer = TransactionSigner::new(self.pending.pending()?, record)?;

        tx.sender = Some(signer.address().to_string());
        validate_transaction(tx, current_epoch)?;
        signer.sign(tx, current_epoch)
    }

    /// Sign and hand to the ledger for execution.
    pub async fn sign_and_submit(&self, tx: &mut Transaction) -> AuthResult<TransactionResponse> {
        let current_epoch = self.ledger.current_epoch().await?;
        let signature = self.sign_at(tx, current_epoch)?;
        let response = self
            .ledger
            .execute_transaction(&tx.to_base64(), &[signature.into_string()])
            .await?;
        info!(digest = %response.digest, status = %response.status, "transaction executed");
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Clear every zkLogin record: session, pending key, exchange, token.
    pub async fn logout(&self) -> AuthResult<()> {
        let _flow = self.flow.lock().await;
        self.sessions.clear()?;
        info!("zklogin session cleared");
        Ok(())
    }

    fn load_exchange(&self) -> AuthResult<ExchangeState> {
        Ok(self
            .store
            .get_json(keys::EXCHANGE_STATE)?
            .unwrap_or(ExchangeState::Idle))
    }

    fn save_exchange(&self, state: &ExchangeState) -> AuthResult<()> {
        self.store.put_json(keys::EXCHANGE_STATE, state)?;
        Ok(())
    }
}
