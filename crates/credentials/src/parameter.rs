//! Self-describing algorithm parameter attached to every credential record.
//!
//! Encoded as `hash##rng##saltLength##isTextual` in UTF-8, e.g.
//! `SHA-256##OsRng##16##true`. Storage treats the encoding as an opaque blob.

use useradmin_core::{UserAdminError, UserAdminResult};

use crate::algorithm::{HashAlgorithm, RngAlgorithm};

const SEPARATOR: &str = "##";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AlgorithmParameter {
    pub hash_algorithm: HashAlgorithm,
    pub rng_algorithm: RngAlgorithm,
    pub salt_length: usize,
    /// Whether the original credential value was text (as opposed to bytes).
    pub textual: bool,
}

impl AlgorithmParameter {
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{hash}{SEPARATOR}{rng}{SEPARATOR}{len}{SEPARATOR}{textual}",
            hash = self.hash_algorithm.name(),
            rng = self.rng_algorithm.name(),
            len = self.salt_length,
            textual = self.textual,
        )
        .into_bytes()
    }

    pub fn decode(raw: &[u8]) -> UserAdminResult<Self> {
        let text = std::str::from_utf8(raw).map_err(|_| {
            UserAdminError::configuration("algorithm parameter is not valid UTF-8")
        })?;

        let parts: Vec<&str> = text.split(SEPARATOR).collect();
        let [hash, rng, len, textual] = parts.as_slice() else {
            return Err(UserAdminError::configuration(format!(
                "malformed algorithm parameter '{text}'"
            )));
        };

        let salt_length = len.parse().map_err(|_| {
            UserAdminError::configuration(format!("malformed salt length '{len}'"))
        })?;
        let textual = textual.parse().map_err(|_| {
            UserAdminError::configuration(format!("malformed textual flag '{textual}'"))
        })?;

        Ok(Self {
            hash_algorithm: HashAlgorithm::from_name(hash)?,
            rng_algorithm: RngAlgorithm::from_name(rng)?,
            salt_length,
            textual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_stable() {
        let param = AlgorithmParameter {
            hash_algorithm: HashAlgorithm::Sha256,
            rng_algorithm: RngAlgorithm::OsRng,
            salt_length: 16,
            textual: true,
        };
        assert_eq!(param.encode(), b"SHA-256##OsRng##16##true".to_vec());
        assert_eq!(AlgorithmParameter::decode(&param.encode()).unwrap(), param);
    }

    #[test]
    fn unknown_algorithms_are_configuration_errors() {
        let err = AlgorithmParameter::decode(b"WHIRLPOOL##OsRng##16##true").unwrap_err();
        assert!(matches!(err, UserAdminError::Configuration(_)));

        let err = AlgorithmParameter::decode(b"SHA-256##SHA1PRNG##16##false").unwrap_err();
        assert!(matches!(err, UserAdminError::Configuration(_)));
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        assert!(AlgorithmParameter::decode(b"SHA-256##OsRng##16").is_err());
        assert!(AlgorithmParameter::decode(b"SHA-256##OsRng##x##true").is_err());
        assert!(AlgorithmParameter::decode(b"SHA-256##OsRng##16##yes").is_err());
        assert!(AlgorithmParameter::decode(&[0xff, 0xfe]).is_err());
    }
}
