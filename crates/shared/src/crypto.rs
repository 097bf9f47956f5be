//! Hashing and random-token helpers for invitation secrets.
//!
//! Invitation tokens are never stored in plaintext. The raw token goes out
//! in the invitation email; only its SHA-256 digest is persisted, and
//! acceptance hashes the presented token and looks the digest up.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes in an invitation token.
pub const INVITE_TOKEN_BYTES: usize = 32;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a random invitation token: 32 bytes, hex-encoded.
pub fn generate_invite_token() -> String {
    let bytes: [u8; INVITE_TOKEN_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}
