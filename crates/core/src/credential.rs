//! Credential hashing and secret generation
//!
//! Secrets are reduced to a lowercase hex SHA-256 digest before they are
//! stored or compared; the plaintext never leaves the call site and is
//! never logged. The digest is unsalted for parity with the credential
//! store this portal authenticates against, so replacing the scheme is a
//! change local to this module.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated secrets.
const GENERATED_SECRET_LEN: usize = 12;

/// Alphabet for generated secrets: alphanumerics plus a few symbols.
const SECRET_ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789!@#$%&*";

/// Hash a secret into a fixed-length lowercase hex digest.
///
/// Deterministic: the same input always yields the same output.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a supplied secret against a stored digest.
pub fn verify_secret(secret: &str, digest: &str) -> bool {
    hash_secret(secret) == digest
}

/// Generate a random 12-character secret.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    (0..GENERATED_SECRET_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SECRET_ALPHABET.len());
            SECRET_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalize a security answer for storage and comparison.
///
/// Answers are compared trimmed and case-insensitively.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}
