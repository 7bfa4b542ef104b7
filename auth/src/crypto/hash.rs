//! # Hashing Utilities
//!
//! The handful of hash constructions the session manager leans on:
//!
//! - **BLAKE3** (`derive_key` mode) — domain-separated commitments: nonce,
//!   address seed, salt, transaction digest. Each gets its own context
//!   string from [`crate::config`], so a nonce can never collide with an
//!   address seed even over identical input bytes.
//!
//! - **SHA-256** — fingerprinting callback fragments and deriving
//!   transaction digests for display.
//!
//! - **hash_to_field** — maps bytes onto the BN254 scalar field. Nonces
//!   and address seeds are field elements because that is the language the
//!   prover's circuit speaks.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use sha2::{Digest, Sha256};

/// SHA-256 of `data` as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// `SHA-256(SHA-256(data))`. Used for transaction digests, which want
/// length-extension resistance without caring about speed.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Plain BLAKE3.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 over several parts, fed sequentially.
///
/// Parts are length-prefixed (u32 LE) before hashing, so
/// `["ab", "c"]` and `["a", "bc"]` produce different digests. Forgetting
/// this is how "alice" + "xbob" becomes "alicex" + "bob".
pub fn domain_separated_hash(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(&(part.len() as u32).to_le_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Hash arbitrary parts to a BN254 scalar field element.
///
/// Domain-separated BLAKE3, interpreted little-endian and reduced mod `r`.
/// The bias from reducing a 256-bit value into a ~254-bit field is
/// negligible for commitment purposes.
pub fn hash_to_field(context: &str, parts: &[&[u8]]) -> Fr {
    let digest = domain_separated_hash(context, parts);
    Fr::from_le_bytes_mod_order(&digest)
}

/// Canonical 32-byte big-endian representation of a field element.
pub fn field_to_be_bytes(element: &Fr) -> [u8; 32] {
    let bytes = element.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    // BN254 Fr fits in 32 bytes; right-align in case of a shorter encoding.
    let offset = 32usize.saturating_sub(bytes.len());
    out[offset..].copy_from_slice(&bytes[bytes.len().saturating_sub(32)..]);
    out
}

/// Decimal string of a field element, the form the prover expects.
pub fn field_to_decimal(element: &Fr) -> String {
    element.into_bigint().to_string()
}
