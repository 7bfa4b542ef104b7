//! # Unified Auth Facade
//!
//! The rest of the application asks one question: *who is signed in, and
//! how do I sign for them?* [`AuthFacade`] answers it over two
//! capabilities:
//!
//! - a connected external wallet ([`WalletCapability`]), and
//! - a zkLogin session ([`ZkLoginSession`]).
//!
//! ## Precedence
//!
//! A connected wallet always wins, even over a perfectly valid zkLogin
//! session. Users who connect a wallet expect it to be the one signing.
//!
//! ## Logout
//!
//! Logging out tears down **both**. Disconnecting the wallet does not clear
//! zkLogin state and vice versa, so each is handled explicitly and the
//! outcome reported per capability.

pub mod wallet;

pub use wallet::{WalletCapability, WalletError};

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};
use crate::identity::token::DisplayClaims;
use crate::ledger::TransactionResponse;
use crate::transaction::{validate_transaction, Transaction};
use crate::zklogin::address::Address;
use crate::zklogin::manager::ZkLoginSession;
use crate::zklogin::session::SessionRecord;

/// Which capability a user came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySource {
    Wallet,
    ZkLogin,
}

/// The capability currently in charge of signing.
pub enum AuthCapability {
    Wallet(Arc<dyn WalletCapability>),
    ZkLogin(SessionRecord),
}

impl AuthCapability {
    pub fn source(&self) -> CapabilitySource {
        match self {
            AuthCapability::Wallet(_) => CapabilitySource::Wallet,
            AuthCapability::ZkLogin(_) => CapabilitySource::ZkLogin,
        }
    }
}

impl std::fmt::Debug for AuthCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthCapability::Wallet(w) => f.debug_tuple("Wallet").field(&w.name()).finish(),
            AuthCapability::ZkLogin(r) => f.debug_tuple("ZkLogin").field(&r.address).finish(),
        }
    }
}

/// The signed-in user as the application sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub address: Address,
    pub source: CapabilitySource,
    /// Provider profile claims. zkLogin only.
    pub display: Option<DisplayClaims>,
}

/// What `logout` tore down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogoutReport {
    pub wallet_disconnected: bool,
    pub zklogin_cleared: bool,
}

pub struct AuthFacade {
    zklogin: Arc<ZkLoginSession>,
    wallet: RwLock<Option<Arc<dyn WalletCapability>>>,
}

impl AuthFacade {
    pub fn new(zklogin: Arc<ZkLoginSession>) -> Self {
        Self {
            zklogin,
            wallet: RwLock::new(None),
        }
    }

    pub fn zklogin(&self) -> &Arc<ZkLoginSession> {
        &self.zklogin
    }

    /// Attach a wallet. Replaces any previously attached one.
    pub fn connect_wallet(&self, wallet: Arc<dyn WalletCapability>) {
        info!(wallet = wallet.name(), "wallet attached");
        *self.wallet.write() = Some(wallet);
    }

    fn connected_wallet(&self) -> Option<Arc<dyn WalletCapability>> {
        self.wallet
            .read()
            .as_ref()
            .filter(|w| w.is_connected())
            .cloned()
    }

    /// The capability that would sign right now.
    pub async fn active_capability(&self) -> AuthResult<Option<AuthCapability>> {
        if let Some(wallet) = self.connected_wallet() {
            return Ok(Some(AuthCapability::Wallet(wallet)));
        }
        Ok(self
            .zklogin
            .current_session()
            .await?
            .map(AuthCapability::ZkLogin))
    }

    pub async fn current_user(&self) -> AuthResult<Option<User>> {
        let user = match self.active_capability().await? {
            Some(AuthCapability::Wallet(wallet)) => wallet.address().map(|address| User {
                address,
                source: CapabilitySource::Wallet,
                display: None,
            }),
            Some(AuthCapability::ZkLogin(record)) => Some(User {
                address: record.address,
                source: CapabilitySource::ZkLogin,
                display: Some(record.display),
            }),
            None => None,
        };
        Ok(user)
    }

    /// Sign and execute with whichever capability is active.
    pub async fn sign_and_submit(&self, tx: &mut Transaction) -> AuthResult<TransactionResponse> {
        match self.active_capability().await? {
            Some(AuthCapability::Wallet(wallet)) => {
                let address = wallet.address().ok_or(WalletError::NotConnected)?;
                tx.sender = Some(address.to_string());
                // Epoch 0: expiry is the wallet's call, only check shape here.
                validate_transaction(tx, 0)?;
                Ok(wallet.sign_and_execute(tx).await?)
            }
            Some(AuthCapability::ZkLogin(_)) => self.zklogin.sign_and_submit(tx).await,
            None => Err(AuthError::NotAuthenticated),
        }
    }

    /// Tear down every capability.
    ///
    /// Both halves are always attempted. The first error is returned after
    /// the other half has run.
    pub async fn logout(&self) -> AuthResult<LogoutReport> {
        let mut report = LogoutReport::default();
        let mut first_error: Option<AuthError> = None;

        let wallet = self.wallet.write().take();
        if let Some(wallet) = wallet {
            match wallet.disconnect().await {
                Ok(()) => report.wallet_disconnected = true,
                Err(err) => {
                    warn!(wallet = wallet.name(), error = %err, "wallet disconnect failed");
                    first_error = Some(err.into());
                }
            }
        }

        match self.zklogin.logout().await {
            Ok(()) => report.zklogin_cleared = true,
            Err(err) => {
                warn!(error = %err, "zklogin teardown failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!(?report, "logged out");
                Ok(report)
            }
        }
    }
}
