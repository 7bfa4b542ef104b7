//! # Address Derivation
//!
//! ```text
//! address_seed = hash_to_field(ADDRESS_SEED_CONTEXT, [key_claim_name, key_claim_value, aud, salt])
//! address      = "0x" ‖ hex(BLAKE3(ZKLOGIN_FLAG ‖ len(iss) ‖ iss ‖ be32(address_seed)))
//! ```
//!
//! The seed is what the prover commits to and what the ledger re-derives
//! the address from, so both halves must agree bit for bit. The issuer is
//! mixed in at the address step so the same subject at two providers does
//! not share an account.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{ADDRESS_SEED_CONTEXT, ZKLOGIN_FLAG};
use crate::crypto::hash::{blake3_hash, field_to_be_bytes, field_to_decimal, hash_to_field};
use crate::zklogin::salt::Salt;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The length prefix is one byte.
    #[error("issuer is {0} bytes, at most 255 can be bound into an address")]
    IssuerTooLong(usize),
}

/// The address seed, carried as a decimal string in proof inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressSeed(String);

impl AddressSeed {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A ledger account address, `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an address obtained elsewhere (a wallet, a config file).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn seed_element(key_claim_name: &str, key_claim_value: &str, aud: &str, salt: &Salt) -> Fr {
    hash_to_field(
        ADDRESS_SEED_CONTEXT,
        &[
            key_claim_name.as_bytes(),
            key_claim_value.as_bytes(),
            aud.as_bytes(),
            &salt.to_le_bytes(),
        ],
    )
}

pub fn derive_address_seed(
    key_claim_name: &str,
    key_claim_value: &str,
    aud: &str,
    salt: &Salt,
) -> AddressSeed {
    AddressSeed(field_to_decimal(&seed_element(
        key_claim_name,
        key_claim_value,
        aud,
        salt,
    )))
}

/// Derive the address and seed for an identity.
pub fn derive_address(
    iss: &str,
    key_claim_name: &str,
    key_claim_value: &str,
    aud: &str,
    salt: &Salt,
) -> Result<(Address, AddressSeed), AddressError> {
    let iss_bytes = iss.as_bytes();
    let iss_len = u8::try_from(iss_bytes.len())
        .map_err(|_| AddressError::IssuerTooLong(iss_bytes.len()))?;
    let element = seed_element(key_claim_name, key_claim_value, aud, salt);

    let mut preimage = Vec::with_capacity(2 + iss_bytes.len() + 32);
    preimage.push(ZKLOGIN_FLAG);
    preimage.push(iss_len);
    preimage.extend_from_slice(iss_bytes);
    preimage.extend_from_slice(&field_to_be_bytes(&element));

    let address = Address(format!("0x{}", hex::encode(blake3_hash(&preimage))));
    Ok((address, AddressSeed(field_to_decimal(&element))))
}
