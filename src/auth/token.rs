//! JWT expiry inspection.
//!
//! Tokens are opaque signed strings; the only claim the client interprets
//! is `exp` (seconds since epoch) in the payload segment. No signature
//! validation happens here - the server stays authoritative and simply
//! rejects tokens it does not like.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Extract the `exp` claim from a JWT, if the payload segment decodes.
pub fn expires_at(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims.exp
}

/// A token is expired when its `exp` claim is in the past or cannot be read.
pub fn is_expired(token: &str) -> bool {
    match expires_at(token) {
        Some(exp) => exp < Utc::now().timestamp(),
        None => true,
    }
}
