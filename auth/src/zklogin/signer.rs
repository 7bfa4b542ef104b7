//! # Transaction Signer
//!
//! Produces the composite signature the ledger accepts in place of a plain
//! key signature:
//!
//! ```text
//! digest          = BLAKE3-derive_key(TX_DIGEST_CONTEXT, [intent ‖ tx_bytes])
//! user_signature  = 0x00 ‖ ed25519(digest) ‖ ephemeral_pk
//! composite       = base64(0x05 ‖ bincode(ZkLoginSignature {
//!                       inputs: { proof_points, iss_base64_details,
//!                                 header_base64, address_seed },
//!                       max_epoch,
//!                       user_signature,
//!                   }))
//! ```
//!
//! The signer never talks to the ledger. It needs the epoch only to refuse
//! signing with a session the ledger would reject anyway.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{TRANSACTION_INTENT, TX_DIGEST_CONTEXT, ZKLOGIN_FLAG};
use crate::crypto::hash::domain_separated_hash;
use crate::error::{AuthError, AuthResult};
use crate::transaction::Transaction;
use crate::zklogin::address::Address;
use crate::zklogin::pending::PendingLogin;
use crate::zklogin::prover::{IssBase64Details, ProofPoints};
use crate::zklogin::session::SessionRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureFormatError {
    #[error("composite signature is not base64")]
    NotBase64,

    #[error("composite signature is empty")]
    Empty,

    #[error("unexpected signature scheme flag {0:#04x}")]
    WrongFlag(u8),

    #[error("composite signature body is malformed: {0}")]
    Malformed(String),
}

/// Proof inputs as embedded in the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkLoginInputs {
    pub proof_points: ProofPoints,
    pub iss_base64_details: IssBase64Details,
    pub header_base64: String,
    pub address_seed: String,
}

/// The structured body of a composite signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkLoginSignature {
    pub inputs: ZkLoginInputs,
    pub max_epoch: u64,
    /// `0x00 ‖ sig(64) ‖ pk(32)`.
    pub user_signature: Vec<u8>,
}

/// Serialized composite signature, ready for the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeSignature(String);

impl CompositeSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn encode(signature: &ZkLoginSignature) -> Result<Self, SignatureFormatError> {
        let body = bincode::serialize(signature)
            .map_err(|e| SignatureFormatError::Malformed(e.to_string()))?;
        let mut bytes = Vec::with_capacity(1 + body.len());
        bytes.push(ZKLOGIN_FLAG);
        bytes.extend_from_slice(&body);
        Ok(Self(STANDARD.encode(bytes)))
    }

    pub fn decode(&self) -> Result<ZkLoginSignature, SignatureFormatError> {
        let bytes = STANDARD
            .decode(&self.0)
            .map_err(|_| SignatureFormatError::NotBase64)?;
        let (&flag, body) = bytes.split_first().ok_or(SignatureFormatError::Empty)?;
        if flag != ZKLOGIN_FLAG {
            return Err(SignatureFormatError::WrongFlag(flag));
        }
        bincode::deserialize(body).map_err(|e| SignatureFormatError::Malformed(e.to_string()))
    }
}

/// The digest the ephemeral key signs for `tx_bytes`.
pub fn transaction_digest(tx_bytes: &[u8]) -> [u8; 32] {
    domain_separated_hash(TX_DIGEST_CONTEXT, &[&TRANSACTION_INTENT, tx_bytes])
}

/// Signs transactions for one authenticated session.
pub struct TransactionSigner {
    key: PendingLogin,
    record: SessionRecord,
}

impl TransactionSigner {
    /// Pair the ephemeral key with the session it was proven for.
    ///
    /// Fails with `NotAuthenticated` if either half is missing or the key is
    /// not the one the proof binds.
    pub fn new(key: Option<PendingLogin>, record: Option<SessionRecord>) -> AuthResult<Self> {
        let (Some(key), Some(record)) = (key, record) else {
            return Err(AuthError::NotAuthenticated);
        };
        if key.public_key() != record.ephemeral_public_key {
            return Err(AuthError::NotAuthenticated);
        }
        Ok(Self { key, record })
    }

    pub fn address(&self) -> &Address {
        &self.record.address
    }

    pub fn max_epoch(&self) -> u64 {
        self.record.max_epoch
    }

    /// Claim `tx` for this session's address and sign it.
    pub fn sign(&self, tx: &mut Transaction, current_epoch: u64) -> AuthResult<CompositeSignature> {
        if !self.record.is_valid(current_epoch) {
            return Err(AuthError::NotAuthenticated);
        }

        tx.sender = Some(self.record.address.to_string());
        let digest = transaction_digest(&tx.signable_bytes());
        let user_signature = self
            .key
            .sign(&digest)
            .to_serialized(&self.key.public_key());

        let signature = ZkLoginSignature {
            inputs: ZkLoginInputs {
                proof_points: self.record.proof.proof_points.clone(),
                iss_base64_details: self.record.proof.iss_base64_details.clone(),
                header_base64: self.record.proof.header_base64.clone(),
                address_seed: self.record.address_seed.as_str().to_string(),
            },
            max_epoch: self.record.max_epoch,
            user_signature,
        };

        debug!(
            address = %self.record.address,
            tx_digest = %tx.digest(),
            "transaction signed"
        );

        Ok(CompositeSignature::encode(&signature)?)
    }
}
