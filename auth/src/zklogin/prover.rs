//! # Prover Client
//!
//! The zero-knowledge proof is issued by an external service. We hand it
//! the identity token plus everything needed to recompute the nonce, and it
//! hands back a Groth16 proof that the ephemeral key is bound to that
//! identity. The proof system itself is not our problem; the wire format
//! is.
//!
//! ## Request
//!
//! ```json
//! {
//!   "jwt": "<raw id token>",
//!   "extendedEphemeralPublicKey": "<base64(0x00 ‖ pk)>",
//!   "maxEpoch": "102",
//!   "jwtRandomness": "<decimal u128>",
//!   "salt": "<decimal u128>",
//!   "keyClaimName": "sub"
//! }
//! ```
//!
//! ## Response
//!
//! `{ proofPoints: {a, b, c}, issBase64Details: {value, indexMod4}, headerBase64 }`,
//! kept as-is and embedded in every composite signature.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("prover unreachable: {0}")]
    Unreachable(String),

    /// The prover refused: bad nonce binding, expired token, unknown issuer.
    #[error("prover rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("prover returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Groth16 proof points as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    pub a: Vec<String>,
    pub b: Vec<Vec<String>>,
    pub c: Vec<String>,
}

/// Where the `iss` claim sits inside the token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssBase64Details {
    pub value: String,
    pub index_mod4: u8,
}

/// The proof as returned by the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkProof {
    pub proof_points: ProofPoints,
    pub iss_base64_details: IssBase64Details,
    pub header_base64: String,
}

/// Prover request body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub jwt: String,
    pub extended_ephemeral_public_key: String,
    pub max_epoch: String,
    pub jwt_randomness: String,
    pub salt: String,
    pub key_claim_name: String,
}

impl std::fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofRequest")
            .field("extended_ephemeral_public_key", &self.extended_ephemeral_public_key)
            .field("max_epoch", &self.max_epoch)
            .field("key_claim_name", &self.key_claim_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ProverClient: Send + Sync {
    async fn request_proof(&self, request: &ProofRequest) -> Result<ZkProof, ProverError>;
}

/// Prover over HTTP. One POST per request; no retries.
#[derive(Debug, Clone)]
pub struct HttpProverClient {
    client: Client,
    url: String,
}

impl HttpProverClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ProverClient for HttpProverClient {
    async fn request_proof(&self, request: &ProofRequest) -> Result<ZkProof, ProverError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProverError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProverError::Rejected { status, body });
        }

        response
            .json::<ZkProof>()
            .await
            .map_err(|e| ProverError::InvalidResponse(e.to_string()))
    }
}
