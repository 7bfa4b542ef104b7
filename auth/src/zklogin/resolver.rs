//! # Address & Proof Resolver
//!
//! Turns a validated callback into the three things a session needs:
//! salt, address, proof. Strictly in that order, each step feeding the
//! next. Any failure aborts the whole resolution and nothing is persisted;
//! the caller keeps its pending key and may retry.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::identity::token::IdentityToken;
use crate::zklogin::address::{derive_address, Address, AddressError, AddressSeed};
use crate::zklogin::pending::PendingLogin;
use crate::zklogin::prover::{ProofRequest, ProverClient, ProverError, ZkProof};
use crate::zklogin::salt::{Salt, SaltError, SaltProvider};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Salt(#[from] SaltError),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("identity token has no '{0}' claim to bind the address to")]
    MissingKeyClaim(String),
}

/// Output of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub address: Address,
    pub address_seed: AddressSeed,
    pub salt: Salt,
    pub proof: ZkProof,
}

pub struct AddressProofResolver {
    salt: Arc<dyn SaltProvider>,
    prover: Arc<dyn ProverClient>,
    key_claim_name: String,
}

impl AddressProofResolver {
    pub fn new(
        salt: Arc<dyn SaltProvider>,
        prover: Arc<dyn ProverClient>,
        key_claim_name: impl Into<String>,
    ) -> Self {
        Self {
            salt,
            prover,
            key_claim_name: key_claim_name.into(),
        }
    }

    pub async fn resolve(
        &self,
        token: &IdentityToken,
        pending: &PendingLogin,
    ) -> Result<ResolvedIdentity, ResolveError> {
        let key_claim_value = token
            .claim_value(&self.key_claim_name)
            .ok_or_else(|| ResolveError::MissingKeyClaim(self.key_claim_name.clone()))?
            .to_string();

        // 1. Salt
        let salt = self.salt.salt_for(token).await?;

        // 2. Address
        let (address, address_seed) = derive_address(
            token.issuer(),
            &self.key_claim_name,
            &key_claim_value,
            token.audience(),
            &salt,
        )?;
        debug!(%address, "address derived");

        // 3. Proof
        let request = ProofRequest {
            jwt: token.raw().to_string(),
            extended_ephemeral_public_key: pending.public_key().to_extended_base64(),
            max_epoch: pending.max_epoch().to_string(),
            jwt_randomness: pending.randomness().to_decimal(),
            salt: salt.to_decimal(),
            key_claim_name: self.key_claim_name.clone(),
        };
        let proof = self.prover.request_proof(&request).await?;
        info!(%address, max_epoch = pending.max_epoch(), "proof issued");

        Ok(ResolvedIdentity {
            address,
            address_seed,
            salt,
            proof,
        })
    }
}
