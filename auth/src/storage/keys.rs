//! Well-known storage keys.
//!
//! | Key                  | Written by            | Value                          |
//! |----------------------|-----------------------|--------------------------------|
//! | `ephemeral_secret`   | pending-login store   | hex Ed25519 secret             |
//! | `randomness`         | pending-login store   | decimal u128                   |
//! | `nonce`              | pending-login store   | base64url nonce                |
//! | `max_epoch`          | pending-login store   | u64                            |
//! | `id_token`           | session manager       | raw JWT                        |
//! | `exchange_state`     | session manager       | identity exchange state        |
//! | `session_record`     | session store         | address, salt, proof, expiry   |

pub const EPHEMERAL_SECRET: &str = "zklogin:ephemeral_secret";
pub const RANDOMNESS: &str = "zklogin:randomness";
pub const NONCE: &str = "zklogin:nonce";
pub const MAX_EPOCH: &str = "zklogin:max_epoch";
pub const ID_TOKEN: &str = "zklogin:id_token";
pub const EXCHANGE_STATE: &str = "zklogin:exchange_state";
pub const SESSION_RECORD: &str = "zklogin:session_record";

/// Key material for one login attempt.
pub const PENDING_KEYS: &[&str] = &[EPHEMERAL_SECRET, RANDOMNESS, NONCE, MAX_EPOCH];

/// Everything the session manager persists. Logout removes all of it.
pub const ALL_KEYS: &[&str] = &[
    EPHEMERAL_SECRET,
    RANDOMNESS,
    NONCE,
    MAX_EPOCH,
    ID_TOKEN,
    EXCHANGE_STATE,
    SESSION_RECORD,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique() {
        let set: HashSet<_> = ALL_KEYS.iter().collect();
        assert_eq!(set.len(), ALL_KEYS.len());
    }

    #[test]
    fn pending_keys_are_covered_by_logout() {
        for key in PENDING_KEYS {
            assert!(ALL_KEYS.contains(key));
        }
    }
}
