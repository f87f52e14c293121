//! Password hashing for user accounts.
//!
//! # Responsibility
//! - Derive PBKDF2-HMAC-SHA256 hashes with a random per-password salt.
//! - Verify candidate passwords against stored encoded hashes.
//!
//! # Invariants
//! - Plaintext passwords are never stored or logged.
//! - Encoded hashes carry their own iteration count, so verification keeps
//!   working after the configured count changes.
//! - Comparison is constant-time.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::error::Error;
use std::fmt::{Display, Formatter};
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;
pub const MIN_PBKDF2_ITERATIONS: u32 = 1_000;
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Password shorter than `MIN_PASSWORD_CHARS`.
    PasswordTooShort,
    /// Iteration count below `MIN_PBKDF2_ITERATIONS`.
    WeakIterations(u32),
    /// Stored hash is not in `pbkdf2-sha256$iter$salt$hash` form.
    MalformedHash,
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PasswordTooShort => write!(
                f,
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            ),
            Self::WeakIterations(value) => write!(
                f,
                "pbkdf2 iterations {value} below minimum {MIN_PBKDF2_ITERATIONS}"
            ),
            Self::MalformedHash => write!(f, "stored password hash is malformed"),
        }
    }
}

impl Error for CredentialError {}

/// PBKDF2 password hasher with a fixed iteration count for new hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Result<Self, CredentialError> {
        if iterations < MIN_PBKDF2_ITERATIONS {
            return Err(CredentialError::WeakIterations(iterations));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hashes `password` into the encoded storage form.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(CredentialError::PasswordTooShort);
        }

        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = derive(password, &salt, self.iterations);

        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(digest)
        ))
    }

    /// Checks `password` against an encoded hash produced by `hash`.
    pub fn verify(&self, password: &str, encoded: &str) -> Result<bool, CredentialError> {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(CredentialError::MalformedHash);
        };
        if scheme != SCHEME {
            return Err(CredentialError::MalformedHash);
        }

        let iterations = iterations
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(CredentialError::MalformedHash)?;
        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|_| CredentialError::MalformedHash)?;
        let expected = STANDARD_NO_PAD
            .decode(expected)
            .map_err(|_| CredentialError::MalformedHash)?;
        if expected.len() != HASH_LENGTH {
            return Err(CredentialError::MalformedHash);
        }

        let actual = derive(password, &salt, iterations);
        Ok(bool::from(actual.as_slice().ct_eq(expected.as_slice())))
    }

    /// Runs one derivation at the configured cost and always returns `false`.
    ///
    /// Used when no stored hash exists, so an unknown login costs as much as
    /// a wrong password.
    pub fn verify_missing(&self, password: &str) -> bool {
        let digest = derive(password, &[0u8; SALT_LENGTH], self.iterations);
        std::hint::black_box(digest);
        false
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut digest = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut digest);
    digest
}
