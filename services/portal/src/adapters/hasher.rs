//! services/portal/src/adapters/hasher.rs
//!
//! Argon2id implementation of the `SecretHasher` port.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use docuhub_core::ports::{PortError, PortResult, SecretHasher};
use tracing::error;

use crate::config::{ConfigError, HashCost};

/// Hashes secrets into PHC strings (`$argon2id$v=19$...`).
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Creates a new `Argon2Hasher` with the given cost parameters.
    pub fn new(cost: HashCost) -> Result<Self, ConfigError> {
        let params = Params::new(cost.memory_kib, cost.iterations, 1, None).map_err(|e| {
            ConfigError::InvalidValue("HASH_MEMORY_KIB/HASH_ITERATIONS".to_string(), e.to_string())
        })?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash_secret(&self, secret: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Failed to hash secret: {:?}", e);
                PortError::Unexpected("Failed to hash secret".to_string())
            })
    }

    fn verify_secret(&self, secret: &str, hash: &str) -> PortResult<bool> {
        // A stored hash that does not parse means the record is corrupted.
        let parsed = PasswordHash::new(hash)
            .map_err(|e| PortError::Storage(format!("Unreadable secret hash: {}", e)))?;
        Ok(self
            .argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}
