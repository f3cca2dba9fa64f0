//! At-rest shape of a credential.

use serde::{Deserialize, Serialize};

use useradmin_core::UserAdminResult;

use crate::parameter::AlgorithmParameter;

/// What gets persisted for one credential key.
///
/// `verification_bytes` is `digest(key ‖ salt ‖ value)`. `encrypted_bytes` is
/// reserved for a reversible scheme and is always `None` today.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentialRecord {
    pub salt: Vec<u8>,
    pub verification_bytes: Vec<u8>,
    pub algorithm_parameter: Vec<u8>,
    pub encrypted_bytes: Option<Vec<u8>>,
}

impl StoredCredentialRecord {
    pub fn parameter(&self) -> UserAdminResult<AlgorithmParameter> {
        AlgorithmParameter::decode(&self.algorithm_parameter)
    }
}

impl core::fmt::Debug for StoredCredentialRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoredCredentialRecord")
            .field("salt", &hex::encode(&self.salt))
            .field("verification_bytes", &hex::encode(&self.verification_bytes))
            .field(
                "algorithm_parameter",
                &String::from_utf8_lossy(&self.algorithm_parameter),
            )
            .field("encrypted", &self.encrypted_bytes.is_some())
            .finish()
    }
}
