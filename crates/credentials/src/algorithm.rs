//! Named digest and random-number algorithms.
//!
//! Names are what ends up inside persisted algorithm parameters, so they must
//! never change once released.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256, Sha384, Sha512};

use useradmin_core::{UserAdminError, UserAdminResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Look up an algorithm by name. Case and the dash are not significant.
    pub fn from_name(name: &str) -> UserAdminResult<Self> {
        match name.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "SHA256" => Ok(HashAlgorithm::Sha256),
            "SHA384" => Ok(HashAlgorithm::Sha384),
            "SHA512" => Ok(HashAlgorithm::Sha512),
            _ => Err(UserAdminError::configuration(format!(
                "unknown hash algorithm '{name}'"
            ))),
        }
    }

    /// Digest over the concatenation of `parts`.
    pub fn digest(self, parts: &[&[u8]]) -> Vec<u8> {
        fn run<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
            let mut hasher = D::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().to_vec()
        }

        match self {
            HashAlgorithm::Sha256 => run::<Sha256>(parts),
            HashAlgorithm::Sha384 => run::<Sha384>(parts),
            HashAlgorithm::Sha512 => run::<Sha512>(parts),
        }
    }
}

impl core::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of salt entropy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RngAlgorithm {
    /// Operating system randomness, read directly for every salt.
    OsRng,
    /// ChaCha-based `StdRng`, freshly seeded from the OS for every salt.
    StdRng,
}

impl RngAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            RngAlgorithm::OsRng => "OsRng",
            RngAlgorithm::StdRng => "StdRng",
        }
    }

    pub fn from_name(name: &str) -> UserAdminResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "osrng" => Ok(RngAlgorithm::OsRng),
            "stdrng" => Ok(RngAlgorithm::StdRng),
            _ => Err(UserAdminError::configuration(format!(
                "unknown random number algorithm '{name}'"
            ))),
        }
    }

    pub fn fill(self, buf: &mut [u8]) -> UserAdminResult<()> {
        let entropy = |e: rand::Error| {
            UserAdminError::configuration(format!("entropy source unavailable: {e}"))
        };

        match self {
            RngAlgorithm::OsRng => OsRng.try_fill_bytes(buf).map_err(entropy),
            RngAlgorithm::StdRng => {
                let mut rng = StdRng::from_rng(OsRng).map_err(entropy)?;
                rng.try_fill_bytes(buf).map_err(entropy)
            }
        }
    }
}

impl core::fmt::Display for RngAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_names_are_lenient_on_input_and_stable_on_output() {
        assert_eq!(HashAlgorithm::from_name("sha-256").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::from_name("SHA512").unwrap(), HashAlgorithm::Sha512);
        assert_eq!(HashAlgorithm::Sha384.name(), "SHA-384");
        assert!(matches!(
            HashAlgorithm::from_name("MD5"),
            Err(UserAdminError::Configuration(_))
        ));
    }

    #[test]
    fn digest_lengths() {
        assert_eq!(HashAlgorithm::Sha256.digest(&[b"a"]).len(), 32);
        assert_eq!(HashAlgorithm::Sha384.digest(&[b"a"]).len(), 48);
        assert_eq!(HashAlgorithm::Sha512.digest(&[b"a"]).len(), 64);
    }

    #[test]
    fn digest_concatenates_parts() {
        let split = HashAlgorithm::Sha256.digest(&[b"ab", b"cd"]);
        let joined = HashAlgorithm::Sha256.digest(&[b"abcd"]);
        assert_eq!(split, joined);
    }

    #[test]
    fn rng_fills_buffers() {
        for rng in [RngAlgorithm::OsRng, RngAlgorithm::StdRng] {
            let mut a = [0u8; 32];
            let mut b = [0u8; 32];
            rng.fill(&mut a).unwrap();
            rng.fill(&mut b).unwrap();
            assert_ne!(a, b);
        }
        assert!(RngAlgorithm::from_name("SHA1PRNG").is_err());
    }
}
