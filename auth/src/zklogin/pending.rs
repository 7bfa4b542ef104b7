//! # Key & Randomness Store
//!
//! Holds the one pending login attempt across the OAuth redirect: the
//! ephemeral keypair, the randomness, the expiry epoch, and the nonce they
//! produced. Four records, written at `begin`, read back after the page
//! comes back from the provider.
//!
//! The secret key leaves this module only as a stored record. Callers get a
//! [`PendingLogin`] that can sign and report its public key, nothing more.
//!
//! On read, the stored nonce is recomputed from the stored key, epoch and
//! randomness. A mismatch means the records come from two different
//! attempts (a crash half-way through `begin`), and the whole set is
//! treated as absent.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::crypto::keys::{EphemeralKeypair, EphemeralPublicKey, EphemeralSignature};
use crate::error::{AuthError, AuthResult};
use crate::storage::{keys, KeyValueStore, KeyValueStoreExt, StorageError};
use crate::zklogin::nonce::{derive_nonce, Nonce, Randomness};

/// A login attempt waiting for its callback.
#[derive(Clone)]
pub struct PendingLogin {
    keypair: EphemeralKeypair,
    randomness: Randomness,
    max_epoch: u64,
    nonce: Nonce,
}

impl PendingLogin {
    pub fn public_key(&self) -> EphemeralPublicKey {
        self.keypair.public_key()
    }

    pub fn sign(&self, message: &[u8]) -> EphemeralSignature {
        self.keypair.sign(message)
    }

    pub fn randomness(&self) -> &Randomness {
        &self.randomness
    }

    pub fn max_epoch(&self) -> u64 {
        self.max_epoch
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }
}

impl fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingLogin")
            .field("public_key", &self.keypair.public_key())
            .field("max_epoch", &self.max_epoch)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// Durable store for the single pending login.
#[derive(Clone)]
pub struct PendingLoginStore {
    store: Arc<dyn KeyValueStore>,
}

impl PendingLoginStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Generate a fresh keypair and randomness for a login expiring at
    /// `max_epoch`, replacing any previous pending login.
    pub fn begin(&self, max_epoch: u64) -> AuthResult<PendingLogin> {
        let keypair = EphemeralKeypair::try_generate().map_err(AuthError::KeyGenerationFailed)?;
        let randomness = Randomness::generate().map_err(AuthError::KeyGenerationFailed)?;
        let nonce = derive_nonce(&keypair.public_key(), max_epoch, &randomness);

        // Clear first so a crash mid-write never pairs new key material with
        // the old nonce.
        self.store.remove_many(keys::PENDING_KEYS)?;
        self.store
            .put_json(keys::EPHEMERAL_SECRET, &keypair.secret_hex())?;
        self.store
            .put_json(keys::RANDOMNESS, &randomness.to_decimal())?;
        self.store.put_json(keys::MAX_EPOCH, &max_epoch)?;
        self.store.put_json(keys::NONCE, &nonce)?;

        debug!(
            public_key = %keypair.public_key(),
            max_epoch,
            nonce = %nonce,
            "pending login created"
        );

        Ok(PendingLogin {
            keypair,
            randomness,
            max_epoch,
            nonce,
        })
    }

    /// The pending login, if a complete and consistent one is stored.
    pub fn pending(&self) -> AuthResult<Option<PendingLogin>> {
        let Some(secret_hex) = self.store.get_json::<String>(keys::EPHEMERAL_SECRET)? else {
            return Ok(None);
        };
        let Some(randomness) = self.store.get_json::<String>(keys::RANDOMNESS)? else {
            return Ok(None);
        };
        let Some(max_epoch) = self.store.get_json::<u64>(keys::MAX_EPOCH)? else {
            return Ok(None);
        };
        let Some(nonce) = self.store.get_json::<Nonce>(keys::NONCE)? else {
            return Ok(None);
        };

        let keypair = EphemeralKeypair::from_secret_hex(&secret_hex).map_err(|e| {
            StorageError::Serialization {
                key: keys::EPHEMERAL_SECRET.to_string(),
                reason: e.to_string(),
            }
        })?;
        let randomness =
            Randomness::from_decimal(&randomness).ok_or_else(|| StorageError::Serialization {
                key: keys::RANDOMNESS.to_string(),
                reason: "not a decimal u128".to_string(),
            })?;

        if derive_nonce(&keypair.public_key(), max_epoch, &randomness) != nonce {
            warn!("pending login records are inconsistent, ignoring them");
            return Ok(None);
        }

        Ok(Some(PendingLogin {
            keypair,
            randomness,
            max_epoch,
            nonce,
        }))
    }

    /// Drop the pending login irrecoverably.
    pub fn discard(&self) -> AuthResult<()> {
        self.store.remove_many(keys::PENDING_KEYS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, PendingLoginStore) {
        let backing = Arc::new(MemoryStore::new());
        let pending = PendingLoginStore::new(backing.clone());
        (backing, pending)
    }

    #[test]
    fn begin_then_pending_restores_same_material() {
        let (_, pending) = store();
        let started = pending.begin(42).unwrap();
        let restored = pending.pending().unwrap().unwrap();

        assert_eq!(restored.public_key(), started.public_key());
        assert_eq!(restored.randomness(), started.randomness());
        assert_eq!(restored.max_epoch(), 42);
        assert_eq!(restored.nonce(), started.nonce());

        let sig = restored.sign(b"msg");
        assert!(started.public_key().verify(b"msg", &sig));
    }

    #[test]
    fn nothing_pending_initially() {
        let (_, pending) = store();
        assert!(pending.pending().unwrap().is_none());
    }

    #[test]
    fn second_begin_overwrites_first() {
        let (_, pending) = store();
        let first = pending.begin(10).unwrap();
        let second = pending.begin(10).unwrap();

        let restored = pending.pending().unwrap().unwrap();
        assert_eq!(restored.public_key(), second.public_key());
        assert_ne!(restored.public_key(), first.public_key());
        assert_ne!(restored.nonce(), first.nonce());
    }

    #[test]
    fn discard_removes_everything() {
        let (backing, pending) = store();
        pending.begin(10).unwrap();
        pending.discard().unwrap();
        assert!(pending.pending().unwrap().is_none());
        assert!(backing.is_empty());
    }

    #[test]
    fn inconsistent_records_are_ignored() {
        let (backing, pending) = store();
        pending.begin(10).unwrap();
        backing.put_json(keys::MAX_EPOCH, &11u64).unwrap();
        assert!(pending.pending().unwrap().is_none());
    }

    #[test]
    fn debug_omits_secret_material() {
        let (backing, pending) = store();
        let login = pending.begin(10).unwrap();
        let secret: String = backing.get_json(keys::EPHEMERAL_SECRET).unwrap().unwrap();
        let rendered = format!("{:?}", login);
        assert!(!rendered.contains(&secret));
        assert!(!rendered.contains(&login.randomness().to_decimal()));
    }
}
