//! Salted one-way credential verification.

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use useradmin_core::error::ensure_key;
use useradmin_core::{AttributeValue, UserAdminError, UserAdminResult};

use crate::config::CredentialConfig;
use crate::parameter::AlgorithmParameter;
use crate::record::StoredCredentialRecord;

/// Turns plaintext credentials into storable records.
pub trait CredentialEncryptor: Send + Sync {
    fn encrypt(&self, key: &str, value: &AttributeValue) -> UserAdminResult<StoredCredentialRecord>;
}

/// Reads credential records back.
///
/// `verify` is the supported path; `decrypt` exists so storage backends can
/// route reads through one interface, and fails for one-way records.
pub trait CredentialDecryptor: Send + Sync {
    fn decrypt(&self, key: &str, record: &StoredCredentialRecord) -> UserAdminResult<AttributeValue>;

    fn verify(
        &self,
        key: &str,
        candidate: &AttributeValue,
        record: &StoredCredentialRecord,
    ) -> UserAdminResult<bool>;
}

/// Verification-only credential scheme.
///
/// Records are `digest(key ‖ salt ‖ value)` with a fresh random salt per
/// `encrypt`. The configuration only drives record creation.
#[derive(Debug, Clone, Default)]
pub struct CredentialVerifier {
    config: CredentialConfig,
}

impl CredentialVerifier {
    pub fn new(config: CredentialConfig) -> UserAdminResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Check `candidate` against the individual parts of a stored record.
    ///
    /// The algorithms come from `algorithm_parameter`, not from the running
    /// configuration. The final comparison runs in constant time.
    pub fn verify_parts(
        &self,
        key: &str,
        candidate: &AttributeValue,
        verification_bytes: &[u8],
        salt: &[u8],
        algorithm_parameter: &[u8],
    ) -> UserAdminResult<bool> {
        ensure_key(key)?;
        let param = AlgorithmParameter::decode(algorithm_parameter)?;

        if param.textual != candidate.is_text() {
            debug!(key, "credential candidate type does not match stored type");
            return Ok(false);
        }
        if salt.len() != param.salt_length {
            warn!(
                key,
                expected = param.salt_length,
                found = salt.len(),
                "credential record salt length disagrees with its parameter"
            );
            return Ok(false);
        }

        let digest = param
            .hash_algorithm
            .digest(&[key.as_bytes(), salt, candidate.as_bytes()]);

        Ok(digest.as_slice().ct_eq(verification_bytes).into())
    }
}

impl CredentialEncryptor for CredentialVerifier {
    fn encrypt(&self, key: &str, value: &AttributeValue) -> UserAdminResult<StoredCredentialRecord> {
        ensure_key(key)?;
        if value.is_empty() {
            return Err(UserAdminError::invalid_argument("credential value must not be empty"));
        }

        let mut salt = vec![0u8; self.config.salt_length];
        self.config.rng_algorithm.fill(&mut salt)?;

        let verification_bytes = self
            .config
            .hash_algorithm
            .digest(&[key.as_bytes(), &salt, value.as_bytes()]);

        let param = AlgorithmParameter {
            hash_algorithm: self.config.hash_algorithm,
            rng_algorithm: self.config.rng_algorithm,
            salt_length: self.config.salt_length,
            textual: value.is_text(),
        };

        Ok(StoredCredentialRecord {
            salt,
            verification_bytes,
            algorithm_parameter: param.encode(),
            encrypted_bytes: None,
        })
    }
}

impl CredentialDecryptor for CredentialVerifier {
    fn decrypt(&self, key: &str, _record: &StoredCredentialRecord) -> UserAdminResult<AttributeValue> {
        Err(UserAdminError::unsupported(format!(
            "credential '{key}' is stored verification-only and cannot be decrypted"
        )))
    }

    fn verify(
        &self,
        key: &str,
        candidate: &AttributeValue,
        record: &StoredCredentialRecord,
    ) -> UserAdminResult<bool> {
        self.verify_parts(
            key,
            candidate,
            &record.verification_bytes,
            &record.salt,
            &record.algorithm_parameter,
        )
    }
}
