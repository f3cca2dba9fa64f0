//! Credential hashing configuration.

use useradmin_core::{UserAdminError, UserAdminResult};

use crate::algorithm::{HashAlgorithm, RngAlgorithm};

pub const ENV_HASH_ALGORITHM: &str = "USERADMIN_HASH_ALGORITHM";
pub const ENV_RNG_ALGORITHM: &str = "USERADMIN_RNG_ALGORITHM";
pub const ENV_SALT_LENGTH: &str = "USERADMIN_SALT_LENGTH";

pub const DEFAULT_SALT_LENGTH: usize = 16;
pub const MAX_SALT_LENGTH: usize = 1024;

/// Settings used when *creating* credential records.
///
/// Verification never reads this: each record carries the parameters it was
/// made with, so records survive configuration changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialConfig {
    pub hash_algorithm: HashAlgorithm,
    pub rng_algorithm: RngAlgorithm,
    pub salt_length: usize,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            rng_algorithm: RngAlgorithm::OsRng,
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

impl CredentialConfig {
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    pub fn with_rng_algorithm(mut self, algorithm: RngAlgorithm) -> Self {
        self.rng_algorithm = algorithm;
        self
    }

    pub fn with_salt_length(mut self, len: usize) -> Self {
        self.salt_length = len;
        self
    }

    pub fn validate(&self) -> UserAdminResult<()> {
        if self.salt_length == 0 || self.salt_length > MAX_SALT_LENGTH {
            return Err(UserAdminError::configuration(format!(
                "salt length must be between 1 and {MAX_SALT_LENGTH}, got {}",
                self.salt_length
            )));
        }
        Ok(())
    }

    /// Load from the process environment, falling back to defaults for unset variables.
    pub fn from_env() -> UserAdminResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> UserAdminResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_HASH_ALGORITHM) {
            config.hash_algorithm = HashAlgorithm::from_name(&name)?;
        }
        if let Some(name) = lookup(ENV_RNG_ALGORITHM) {
            config.rng_algorithm = RngAlgorithm::from_name(&name)?;
        }
        if let Some(raw) = lookup(ENV_SALT_LENGTH) {
            config.salt_length = raw.trim().parse().map_err(|e| {
                UserAdminError::configuration(format!("{ENV_SALT_LENGTH}='{raw}': {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = CredentialConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CredentialConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = CredentialConfig::from_lookup(lookup(&[
            (ENV_HASH_ALGORITHM, "SHA-512"),
            (ENV_RNG_ALGORITHM, "StdRng"),
            (ENV_SALT_LENGTH, "32"),
        ]))
        .unwrap();
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha512);
        assert_eq!(config.rng_algorithm, RngAlgorithm::StdRng);
        assert_eq!(config.salt_length, 32);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(CredentialConfig::from_lookup(lookup(&[(ENV_HASH_ALGORITHM, "MD5")])).is_err());
        assert!(CredentialConfig::from_lookup(lookup(&[(ENV_SALT_LENGTH, "lots")])).is_err());
        assert!(CredentialConfig::from_lookup(lookup(&[(ENV_SALT_LENGTH, "0")])).is_err());
    }
}
