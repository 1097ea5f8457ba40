//! PKCE (Proof Key for Code Exchange) and state token generation.
//!
//! Implements S256 code challenges per RFC 7636 and anti-CSRF state
//! tokens. All randomness comes from a cryptographically secure source;
//! a predictable verifier defeats the point of PKCE.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Entropy of the code verifier, in bytes. Encodes to 86 characters,
/// within RFC 7636's 43-128 range.
const VERIFIER_BYTES: usize = 64;

/// Entropy of the state token, in bytes.
const STATE_BYTES: usize = 32;

/// A PKCE code verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// URL-safe random secret, presented at token-exchange time.
    pub verifier: String,
    /// `BASE64URL(SHA256(verifier))`, sent with the authorization request.
    pub challenge: String,
}

/// Generate a fresh PKCE pair using the S256 method.
#[must_use]
pub fn generate_pkce_pair() -> PkcePair {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = s256_challenge(&verifier);

    PkcePair { verifier, challenge }
}

/// Compute the S256 challenge for a verifier.
///
/// Pure function: `BASE64URL(SHA256(verifier))`, no padding.
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate an anti-CSRF state token.
///
/// Purely a correlation value, never a credential.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
