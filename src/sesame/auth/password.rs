//! Password hashing and verification.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    /// Argon2id RFC recommendations
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    params: Argon2Params,
}

impl PasswordHasher {
    #[must_use]
    pub fn with_params(params: Argon2Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            None,
        )
        .map_err(|e| anyhow!("invalid argon2 params: {e}"))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with a fresh random salt, returning a PHC string.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid or hashing fails.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC string.
    ///
    /// Verification uses the parameters embedded in the hash itself.
    ///
    /// # Errors
    /// Returns an error if the stored hash cannot be parsed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("failed to parse hash: {e}"))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_params(Argon2Params {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hasher().hash("pw1").unwrap();

        assert_ne!(hash, "pw1");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher().verify("pw1", &hash).unwrap());
        assert!(!hasher().verify("wrong", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        let first = hasher().hash("pw1").unwrap();
        let second = hasher().hash("pw1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(hasher().verify("pw1", "not-a-phc-string").is_err());
    }

    #[test]
    fn invalid_params_fail_to_hash() {
        let broken = PasswordHasher::with_params(Argon2Params {
            memory_kib: 0,
            iterations: 0,
            parallelism: 0,
        });
        assert!(broken.hash("pw1").is_err());
    }
}
