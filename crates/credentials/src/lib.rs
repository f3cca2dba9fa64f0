//! `useradmin-credentials`: verification-only credential storage.
//!
//! A credential value is turned into a salted digest that can later confirm a
//! matching plaintext. The plaintext itself is never kept, and there is no way
//! back from a record to the value.

pub mod algorithm;
pub mod config;
pub mod parameter;
pub mod record;
pub mod verifier;

pub use algorithm::{HashAlgorithm, RngAlgorithm};
pub use config::CredentialConfig;
pub use parameter::AlgorithmParameter;
pub use record::StoredCredentialRecord;
pub use verifier::{CredentialDecryptor, CredentialEncryptor, CredentialVerifier};
