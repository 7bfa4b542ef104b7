//! End-to-end integration tests for the zkLogin session manager.
//!
//! These run the whole pipeline from login initiation through signing and
//! logout, against in-process fakes of the ledger, prover and wallet and a
//! real sled store. Each test owns its own store and fakes; nothing is
//! shared between them.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;

use foresight_auth::config::{OAuthConfig, ZkLoginConfig};
use foresight_auth::facade::{AuthFacade, CapabilitySource, WalletCapability, WalletError};
use foresight_auth::identity::{ExchangeState, IdentityToken};
use foresight_auth::ledger::{LedgerClient, LedgerError, TransactionResponse};
use foresight_auth::storage::{keys, KeyValueStore, SledStore};
use foresight_auth::transaction::{Transaction, TransactionBuilder, TransactionStatus};
use foresight_auth::zklogin::prover::{IssBase64Details, ProofPoints};
use foresight_auth::zklogin::{
    derive_nonce, Address, DerivedSaltProvider, LoginOutcome, Nonce, PendingLoginStore,
    ProofRequest, ProverClient, ProverError, Salt, SaltError, SaltProvider, ZkLoginSession,
    ZkProof,
};
use foresight_auth::AuthError;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Ledger with a settable epoch that records every submission.
#[derive(Default)]
struct FakeLedger {
    epoch: AtomicU64,
    failing_epoch_reads: AtomicUsize,
    submissions: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeLedger {
    fn at(epoch: u64) -> Arc<Self> {
        let ledger = Self::default();
        ledger.epoch.store(epoch, Ordering::SeqCst);
        Arc::new(ledger)
    }

    fn set_epoch(&self, epoch: u64) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }

    /// Make the next `n` epoch reads fail as if the node were down.
    fn fail_epoch_reads(&self, n: usize) {
        self.failing_epoch_reads.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn current_epoch(&self) -> Result<u64, LedgerError> {
        let failing = self
            .failing_epoch_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(LedgerError::Unreachable("connection reset".into()));
        }
        Ok(self.epoch.load(Ordering::SeqCst))
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> Result<TransactionResponse, LedgerError> {
        self.submissions
            .lock()
            .push((tx_bytes.to_string(), signatures.to_vec()));
        Ok(TransactionResponse {
            digest: format!("tx-{}", self.submissions.lock().len()),
            status: TransactionStatus::Success,
            error: None,
        })
    }
}

/// Prover that counts requests and can be told to fail.
#[derive(Default)]
struct CountingProver {
    requests: Mutex<Vec<ProofRequest>>,
    fail: AtomicBool,
}

impl CountingProver {
    fn count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ProverClient for CountingProver {
    async fn request_proof(&self, request: &ProofRequest) -> Result<ZkProof, ProverError> {
        self.requests.lock().push(request.clone());
        // Give a concurrent caller a chance to interleave.
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProverError::Unreachable("connection refused".into()));
        }
        Ok(proof())
    }
}

/// Derived salt behind a switch that simulates an unreachable salt service.
struct SwitchableSalt {
    inner: DerivedSaltProvider,
    down: AtomicBool,
}

#[async_trait]
impl SaltProvider for SwitchableSalt {
    async fn salt_for(&self, token: &IdentityToken) -> Result<Salt, SaltError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SaltError::Unreachable("salt service timed out".into()));
        }
        self.inner.salt_for(token).await
    }
}

struct FakeWallet {
    address: Mutex<Option<Address>>,
    executed: AtomicUsize,
}

impl FakeWallet {
    fn connected(address: &str) -> Arc<Self> {
        Arc::new(Self {
            address: Mutex::new(Some(Address::from_string(address))),
            executed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl WalletCapability for FakeWallet {
    fn address(&self) -> Option<Address> {
        self.address.lock().clone()
    }

    fn name(&self) -> &str {
        "fake wallet"
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        *self.address.lock() = None;
        Ok(())
    }

    async fn sign_and_execute(&self, tx: &Transaction) -> Result<TransactionResponse, WalletError> {
        assert!(tx.sender.is_some());
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionResponse {
            digest: "wallet-tx".into(),
            status: TransactionStatus::Success,
            error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CLIENT_ID: &str = "client-123.apps.googleusercontent.com";

fn proof() -> ZkProof {
    ZkProof {
        proof_points: ProofPoints {
            a: vec!["1".into(), "2".into(), "1".into()],
            b: vec![
                vec!["3".into(), "4".into()],
                vec!["5".into(), "6".into()],
                vec!["1".into(), "0".into()],
            ],
            c: vec!["7".into(), "8".into(), "1".into()],
        },
        iss_base64_details: IssBase64Details {
            value: "yJpc3MiOiJodHRwczovL2FjY291bnRzLmdvb2dsZS5jb20iLC".into(),
            index_mod4: 1,
        },
        header_base64: "eyJhbGciOiJSUzI1NiJ9".into(),
    }
}

fn config() -> ZkLoginConfig {
    ZkLoginConfig {
        oauth: OAuthConfig {
            client_id: CLIENT_ID.into(),
            redirect_uri: "https://foresight.example/auth/callback".into(),
            ..OAuthConfig::default()
        },
        ..ZkLoginConfig::default()
    }
}

fn session_over(
    store: Arc<dyn KeyValueStore>,
    ledger: Arc<FakeLedger>,
    prover: Arc<CountingProver>,
) -> ZkLoginSession {
    session_with_salt(
        store,
        ledger,
        Arc::new(DerivedSaltProvider::new([9u8; 32])),
        prover,
    )
}

fn session_with_salt(
    store: Arc<dyn KeyValueStore>,
    ledger: Arc<FakeLedger>,
    salt: Arc<dyn SaltProvider>,
    prover: Arc<CountingProver>,
) -> ZkLoginSession {
    ZkLoginSession::new(config(), store, ledger, salt, prover).unwrap()
}

struct Setup {
    session: Arc<ZkLoginSession>,
    store: Arc<SledStore>,
    ledger: Arc<FakeLedger>,
    prover: Arc<CountingProver>,
}

fn setup(epoch: u64) -> Setup {
    let store = Arc::new(SledStore::open_temporary().unwrap());
    let ledger = FakeLedger::at(epoch);
    let prover = Arc::new(CountingProver::default());
    let session = Arc::new(session_over(store.clone(), ledger.clone(), prover.clone()));
    Setup {
        session,
        store,
        ledger,
        prover,
    }
}

fn jwt_for(sub: &str, nonce: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = serde_json::json!({
        "iss": "https://accounts.google.com",
        "sub": sub,
        "aud": CLIENT_ID,
        "nonce": nonce,
        "email": "trader@example.com",
        "name": "Tess Trader",
    });
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

fn callback(sub: &str, nonce: &Nonce) -> String {
    format!(
        "https://foresight.example/auth/callback#id_token={}&authuser=0",
        jwt_for(sub, nonce.as_str())
    )
}

async fn login(s: &Setup) -> Address {
    let redirect = s.session.begin_login().await.unwrap();
    login_with(s, &redirect.nonce).await
}

async fn login_with(s: &Setup, nonce: &Nonce) -> Address {
    match s
        .session
        .complete_login(&callback("user-1", nonce))
        .await
        .unwrap()
    {
        LoginOutcome::Authenticated(record) => record.address,
        LoginOutcome::AlreadyHandled => panic!("first callback reported as duplicate"),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_login_sign_submit_lifecycle() {
    let s = setup(100);

    let redirect = s.session.begin_login().await.unwrap();
    assert_eq!(redirect.max_epoch, 102);
    let query: std::collections::HashMap<_, _> = redirect.url.query_pairs().into_owned().collect();
    assert_eq!(query["nonce"], redirect.nonce.as_str());
    assert_eq!(query["client_id"], CLIENT_ID);
    assert_eq!(query["response_type"], "id_token");

    // The nonce commits to the pending key, epoch and randomness.
    let pending = PendingLoginStore::new(s.store.clone())
        .pending()
        .unwrap()
        .unwrap();
    assert_eq!(
        derive_nonce(&pending.public_key(), pending.max_epoch(), pending.randomness()),
        redirect.nonce
    );

    let address = login_with(&s, &redirect.nonce).await;
    assert!(address.as_str().starts_with("0x"));

    let prover_request = s.prover.requests.lock()[0].clone();
    assert_eq!(prover_request.max_epoch, "102");
    assert_eq!(
        prover_request.extended_ephemeral_public_key,
        pending.public_key().to_extended_base64()
    );

    let mut tx = TransactionBuilder::place_bet("0xmarket", 1, 250).build();
    let response = s.session.sign_and_submit(&mut tx).await.unwrap();
    assert!(response.is_success());
    assert_eq!(tx.sender.as_deref(), Some(address.as_str()));

    let submissions = s.ledger.submissions.lock();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, tx.to_base64());
    assert_eq!(submissions[0].1.len(), 1);
}

#[tokio::test]
async fn duplicate_callback_requests_one_proof() {
    let s = setup(100);
    let redirect = s.session.begin_login().await.unwrap();
    let cb = callback("user-1", &redirect.nonce);

    let (first, second) = tokio::join!(
        s.session.complete_login(&cb),
        s.session.complete_login(&cb)
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(s.prover.count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, LoginOutcome::Authenticated(_)))
            .count(),
        1
    );
    assert!(outcomes.contains(&LoginOutcome::AlreadyHandled));

    // A third, later delivery is still a no-op.
    assert_eq!(
        s.session.complete_login(&cb).await.unwrap(),
        LoginOutcome::AlreadyHandled
    );
    assert_eq!(s.prover.count(), 1);
}

#[tokio::test]
async fn superseded_login_callback_fails() {
    let s = setup(100);
    let first = s.session.begin_login().await.unwrap();
    let second = s.session.begin_login().await.unwrap();
    assert_ne!(first.nonce, second.nonce);

    let err = s
        .session
        .complete_login(&callback("user-1", &first.nonce))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NonceMismatch { .. }));
    assert_eq!(s.prover.count(), 0);
    assert!(s.session.current_session().await.unwrap().is_none());
    assert!(matches!(
        s.session.exchange_state().unwrap(),
        ExchangeState::Failed { .. }
    ));

    // The surviving attempt (K2/N2) can still finish.
    s.session.restart_identity_exchange().await.unwrap();
    login_with(&s, &second.nonce).await;
    assert_eq!(s.prover.count(), 1);
}

#[tokio::test]
async fn session_expires_at_max_epoch() {
    let s = setup(98);
    login(&s).await;
    let record = s.session.current_session().await.unwrap().unwrap();
    assert_eq!(record.max_epoch, 100);

    s.ledger.set_epoch(99);
    let status = s.session.status().await.unwrap().unwrap();
    assert_eq!(status.epochs_remaining, 1);
    assert!(status.is_near_expiry());

    let mut tx = TransactionBuilder::claim_winnings("0xmarket").build();
    s.session.sign(&mut tx).await.unwrap();

    s.ledger.set_epoch(100);
    assert!(s.session.current_session().await.unwrap().is_none());
    let mut tx = TransactionBuilder::claim_winnings("0xmarket").build();
    assert!(matches!(
        s.session.sign(&mut tx).await,
        Err(AuthError::NotAuthenticated)
    ));

    // Purged, not hidden.
    for key in keys::ALL_KEYS {
        assert!(!s.store.contains(key).unwrap(), "{key} survived expiry");
    }
}

#[tokio::test]
async fn logout_clears_every_record() {
    let s = setup(100);
    login(&s).await;
    for key in [
        keys::EPHEMERAL_SECRET,
        keys::RANDOMNESS,
        keys::NONCE,
        keys::MAX_EPOCH,
        keys::ID_TOKEN,
        keys::EXCHANGE_STATE,
        keys::SESSION_RECORD,
    ] {
        assert!(s.store.contains(key).unwrap(), "{key} missing after login");
    }

    let facade = AuthFacade::new(s.session.clone());
    let report = facade.logout().await.unwrap();
    assert!(report.zklogin_cleared);
    assert!(!report.wallet_disconnected);

    assert!(s.store.is_empty());
    assert!(s.session.current_session().await.unwrap().is_none());
    assert!(facade.current_user().await.unwrap().is_none());
}

#[tokio::test]
async fn wallet_takes_precedence_over_zklogin() {
    let s = setup(100);
    let zk_address = login(&s).await;

    let facade = AuthFacade::new(s.session.clone());
    let user = facade.current_user().await.unwrap().unwrap();
    assert_eq!(user.source, CapabilitySource::ZkLogin);
    assert_eq!(user.address, zk_address);
    assert_eq!(user.display.unwrap().name.as_deref(), Some("Tess Trader"));

    let wallet = FakeWallet::connected("0xwallet");
    facade.connect_wallet(wallet.clone());
    let user = facade.current_user().await.unwrap().unwrap();
    assert_eq!(user.source, CapabilitySource::Wallet);
    assert_eq!(user.address.as_str(), "0xwallet");

    let mut tx = TransactionBuilder::place_bet("0xmarket", 0, 10).build();
    facade.sign_and_submit(&mut tx).await.unwrap();
    assert_eq!(tx.sender.as_deref(), Some("0xwallet"));
    assert_eq!(wallet.executed.load(Ordering::SeqCst), 1);
    assert!(s.ledger.submissions.lock().is_empty());

    // Logout handles both capabilities explicitly.
    let report = facade.logout().await.unwrap();
    assert!(report.wallet_disconnected);
    assert!(report.zklogin_cleared);
    assert!(wallet.address().is_none());
    assert!(facade.current_user().await.unwrap().is_none());
}

#[tokio::test]
async fn disconnected_wallet_falls_back_to_zklogin() {
    let s = setup(100);
    let zk_address = login(&s).await;
    let facade = AuthFacade::new(s.session.clone());

    let wallet = FakeWallet::connected("0xwallet");
    facade.connect_wallet(wallet.clone());
    wallet.disconnect().await.unwrap();

    let user = facade.current_user().await.unwrap().unwrap();
    assert_eq!(user.source, CapabilitySource::ZkLogin);
    assert_eq!(user.address, zk_address);
}

#[tokio::test]
async fn no_capability_means_not_authenticated() {
    let s = setup(100);
    let facade = AuthFacade::new(s.session.clone());
    let mut tx = TransactionBuilder::claim_winnings("0xmarket").build();
    assert!(matches!(
        facade.sign_and_submit(&mut tx).await,
        Err(AuthError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn proof_failure_then_retry_reuses_key() {
    let s = setup(100);
    let redirect = s.session.begin_login().await.unwrap();
    let key_before = PendingLoginStore::new(s.store.clone())
        .pending()
        .unwrap()
        .unwrap()
        .public_key();

    s.prover.fail.store(true, Ordering::SeqCst);
    let err = s
        .session
        .complete_login(&callback("user-1", &redirect.nonce))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ProofIssuanceFailed(_)));
    assert!(err.is_recoverable());
    assert!(s.session.current_session().await.unwrap().is_none());

    // Retry from the identity exchange: same key, same nonce.
    s.prover.fail.store(false, Ordering::SeqCst);
    let retry = s.session.restart_identity_exchange().await.unwrap();
    assert_eq!(retry.nonce, redirect.nonce);
    login_with(&s, &retry.nonce).await;

    let record = s.session.current_session().await.unwrap().unwrap();
    assert_eq!(record.ephemeral_public_key, key_before);
    assert_eq!(s.prover.count(), 2);
}

#[tokio::test]
async fn ledger_outage_after_callback_allows_redelivery() {
    let s = setup(100);
    let redirect = s.session.begin_login().await.unwrap();
    let cb = callback("user-1", &redirect.nonce);

    s.ledger.fail_epoch_reads(1);
    let err = s.session.complete_login(&cb).await.unwrap_err();
    assert!(matches!(err, AuthError::Ledger(_)));
    assert!(err.is_recoverable());
    assert_eq!(s.prover.count(), 0);
    assert!(matches!(
        s.session.exchange_state().unwrap(),
        ExchangeState::Failed { .. }
    ));

    // The same fragment delivered again is processed, not swallowed.
    let outcome = s.session.complete_login(&cb).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
    assert_eq!(s.prover.count(), 1);
    assert!(s.session.current_session().await.unwrap().is_some());

    // Only now is it a duplicate.
    assert_eq!(
        s.session.complete_login(&cb).await.unwrap(),
        LoginOutcome::AlreadyHandled
    );
    assert_eq!(s.prover.count(), 1);
}

#[tokio::test]
async fn salt_outage_is_proof_failure_then_redelivery_succeeds() {
    let store = Arc::new(SledStore::open_temporary().unwrap());
    let ledger = FakeLedger::at(100);
    let prover = Arc::new(CountingProver::default());
    let salt = Arc::new(SwitchableSalt {
        inner: DerivedSaltProvider::new([9u8; 32]),
        down: AtomicBool::new(true),
    });
    let session = session_with_salt(store, ledger, salt.clone(), prover.clone());

    let redirect = session.begin_login().await.unwrap();
    let cb = callback("user-1", &redirect.nonce);

    let err = session.complete_login(&cb).await.unwrap_err();
    assert!(matches!(err, AuthError::ProofIssuanceFailed(_)));
    assert_eq!(prover.count(), 0);
    assert!(session.current_session().await.unwrap().is_none());

    salt.down.store(false, Ordering::SeqCst);
    match session.complete_login(&cb).await.unwrap() {
        LoginOutcome::Authenticated(record) => assert_eq!(record.max_epoch, 102),
        LoginOutcome::AlreadyHandled => panic!("failed callback reported as handled"),
    }
    assert_eq!(prover.count(), 1);
}

#[tokio::test]
async fn malformed_callback_is_a_parse_failure() {
    let s = setup(100);
    s.session.begin_login().await.unwrap();
    let err = s
        .session
        .complete_login("https://foresight.example/auth/callback#error=access_denied")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::CallbackParseFailed(_)));
    assert_eq!(s.prover.count(), 0);
}

#[tokio::test]
async fn address_is_stable_across_logins() {
    let s = setup(100);
    let first = login(&s).await;
    s.session.logout().await.unwrap();
    let second = login(&s).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = FakeLedger::at(100);
    let prover = Arc::new(CountingProver::default());

    let redirect = {
        let store: Arc<dyn KeyValueStore> = Arc::new(SledStore::open(dir.path()).unwrap());
        let session = session_over(store, ledger.clone(), prover.clone());
        session.begin_login().await.unwrap()
    };

    // The browser came back from the provider into a fresh process.
    let address = {
        let store: Arc<dyn KeyValueStore> = Arc::new(SledStore::open(dir.path()).unwrap());
        let session = session_over(store, ledger.clone(), prover.clone());
        match session
            .complete_login(&callback("user-1", &redirect.nonce))
            .await
            .unwrap()
        {
            LoginOutcome::Authenticated(record) => record.address,
            LoginOutcome::AlreadyHandled => panic!("unexpected duplicate"),
        }
    };

    // And reloaded once more: still signed in, still able to sign.
    let store: Arc<dyn KeyValueStore> = Arc::new(SledStore::open(dir.path()).unwrap());
    let session = session_over(store, ledger, prover);
    let record = session.current_session().await.unwrap().unwrap();
    assert_eq!(record.address, address);

    let mut tx = TransactionBuilder::transfer("0xfriend", 5).build();
    session.sign(&mut tx).await.unwrap();
    assert_eq!(tx.sender.as_deref(), Some(address.as_str()));
}
