//! Password-reset token issuance and verification
//!
//! Raw tokens are 32 bytes of CSPRNG output, base64url-encoded, handed to the
//! caller exactly once and never persisted. Only the SHA-256 digest is stored;
//! verification recomputes the digest and compares in constant time. Expiry is
//! the caller's responsibility (compare `expires_at` against the clock).

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Raw token entropy in bytes (256 bits)
pub const RESET_TOKEN_BYTES: usize = 32;

/// A freshly issued reset token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The raw token, returned to the caller once
    pub raw: String,

    /// Hex SHA-256 digest of the raw token, for storage
    pub digest: String,

    /// Instant after which the token must be rejected
    pub expires_at: DateTime<Utc>,
}

/// Issue a new reset token valid for `validity` from now
pub fn issue(validity: Duration) -> IssuedToken {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; RESET_TOKEN_BYTES] = rng.gen();
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes);
    let digest = digest(&raw);

    IssuedToken {
        raw,
        digest,
        expires_at: Utc::now() + validity,
    }
}

/// One-way digest of a raw token (hex SHA-256)
pub fn digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a presented raw token against a stored digest.
///
/// The comparison does not short-circuit, so timing does not reveal how many
/// leading digest bytes matched.
pub fn matches(raw: &str, stored_digest: &str) -> bool {
    constant_time_eq(digest(raw).as_bytes(), stored_digest.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
