//! # Session Store
//!
//! One record per signed-in user, persisted so a reload does not send them
//! back through the provider. Valid while `current_epoch < max_epoch`,
//! with the epoch always taken from the ledger.
//!
//! An expired record is not "a session with a problem". It is no session.
//! `load` purges it together with the ephemeral key that went with it and
//! reports absence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::NEAR_EXPIRY_EPOCHS;
use crate::crypto::keys::EphemeralPublicKey;
use crate::error::AuthResult;
use crate::identity::token::DisplayClaims;
use crate::storage::{keys, KeyValueStore, KeyValueStoreExt};
use crate::zklogin::address::{Address, AddressSeed};
use crate::zklogin::prover::ZkProof;
use crate::zklogin::salt::Salt;

/// The persisted authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub address: Address,
    pub address_seed: AddressSeed,
    pub salt: Salt,
    pub proof: ZkProof,
    /// First epoch in which the session is no longer valid.
    pub max_epoch: u64,
    /// The ephemeral key the proof is bound to.
    pub ephemeral_public_key: EphemeralPublicKey,
    pub issuer: String,
    pub display: DisplayClaims,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_valid(&self, current_epoch: u64) -> bool {
        is_valid(self, current_epoch)
    }
}

/// `current_epoch < record.max_epoch`.
pub fn is_valid(record: &SessionRecord, current_epoch: u64) -> bool {
    current_epoch < record.max_epoch
}

/// A live session plus how long it has left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub record: SessionRecord,
    pub current_epoch: u64,
    pub epochs_remaining: u64,
}

impl SessionStatus {
    pub fn new(record: SessionRecord, current_epoch: u64) -> Self {
        let epochs_remaining = record.max_epoch.saturating_sub(current_epoch);
        Self {
            record,
            current_epoch,
            epochs_remaining,
        }
    }

    /// The session ends within [`NEAR_EXPIRY_EPOCHS`]. Still usable; a
    /// good moment to offer re-login.
    pub fn is_near_expiry(&self) -> bool {
        self.epochs_remaining <= NEAR_EXPIRY_EPOCHS
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            address: self.record.address.clone(),
            issuer: self.record.issuer.clone(),
            display: self.record.display.clone(),
            ephemeral_public_key: self.record.ephemeral_public_key,
            max_epoch: self.record.max_epoch,
            current_epoch: self.current_epoch,
            epochs_remaining: self.epochs_remaining,
            near_expiry: self.is_near_expiry(),
            created_at: self.record.created_at,
        }
    }
}

/// The shareable view of a session. Salt, seed and proof stay behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub address: Address,
    pub issuer: String,
    pub display: DisplayClaims,
    pub ephemeral_public_key: EphemeralPublicKey,
    pub max_epoch: u64,
    pub current_epoch: u64,
    pub epochs_remaining: u64,
    pub near_expiry: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, record: &SessionRecord) -> AuthResult<()> {
        self.store.put_json(keys::SESSION_RECORD, record)?;
        info!(address = %record.address, max_epoch = record.max_epoch, "session saved");
        Ok(())
    }

    /// The stored record if it is still valid at `current_epoch`.
    ///
    /// An expired record is purged along with every other session key.
    pub fn load(&self, current_epoch: u64) -> AuthResult<Option<SessionRecord>> {
        let Some(record) = self.load_unchecked()? else {
            return Ok(None);
        };
        if record.is_valid(current_epoch) {
            return Ok(Some(record));
        }

        warn!(
            address = %record.address,
            max_epoch = record.max_epoch,
            current_epoch,
            "session expired, purging"
        );
        self.clear()?;
        Ok(None)
    }

    /// The stored record without an expiry check. Only for callers that
    /// re-check validity themselves.
    pub fn load_unchecked(&self) -> AuthResult<Option<SessionRecord>> {
        Ok(self.store.get_json(keys::SESSION_RECORD)?)
    }

    /// Remove every session-manager record: session, pending key, exchange
    /// state, token. One atomic batch.
    pub fn clear(&self) -> AuthResult<()> {
        self.store.remove_many(keys::ALL_KEYS)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::keys::EphemeralKeypair;
    use crate::storage::MemoryStore;
    use crate::zklogin::address::derive_address;
    use crate::zklogin::prover::tests::sample_proof;

    pub(crate) fn sample_record(max_epoch: u64) -> SessionRecord {
        let salt = Salt::from_u128(99);
        let (address, address_seed) =
            derive_address("https://accounts.google.com", "sub", "user-1", "client", &salt)
                .unwrap();
        SessionRecord {
            address,
            address_seed,
            salt,
            proof: sample_proof(),
            max_epoch,
            ephemeral_public_key: EphemeralKeypair::from_seed(&[4u8; 32]).public_key(),
            issuer: "https://accounts.google.com".into(),
            display: DisplayClaims {
                email: Some("trader@example.com".into()),
                ..DisplayClaims::default()
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn validity_boundary() {
        let record = sample_record(100);
        assert!(is_valid(&record, 0));
        assert!(is_valid(&record, 99));
        assert!(!is_valid(&record, 100));
        assert!(!is_valid(&record, 101));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let record = sample_record(100);
        store.save(&record).unwrap();
        assert_eq!(store.load(99).unwrap(), Some(record));
    }

    #[test]
    fn expired_record_is_purged_on_load() {
        let backing = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backing.clone());
        store.save(&sample_record(100)).unwrap();
        backing.put_json(keys::EPHEMERAL_SECRET, &"ab".repeat(32)).unwrap();

        assert_eq!(store.load(100).unwrap(), None);
        assert!(backing.is_empty());
        assert_eq!(store.load_unchecked().unwrap(), None);
    }

    #[test]
    fn clear_removes_record() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.save(&sample_record(100)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(1).unwrap(), None);
    }

    #[test]
    fn status_reports_near_expiry() {
        let fresh = SessionStatus::new(sample_record(100), 97);
        assert_eq!(fresh.epochs_remaining, 3);
        assert!(!fresh.is_near_expiry());

        let ending = SessionStatus::new(sample_record(100), 99);
        assert_eq!(ending.epochs_remaining, 1);
        assert!(ending.is_near_expiry());
    }

    #[test]
    fn summary_omits_secrets() {
        let summary = SessionStatus::new(sample_record(100), 99).summary();
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("salt").is_none());
        assert!(json.get("address_seed").is_none());
        assert!(json.get("proof").is_none());
        assert_eq!(json["max_epoch"], 100);
        assert_eq!(json["epochs_remaining"], 1);
        assert_eq!(json["near_expiry"], true);
    }
}
