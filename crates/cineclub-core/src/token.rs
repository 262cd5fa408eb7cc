//! Informational JWT payload inspection.
//!
//! The client never verifies signatures; it only reads the embedded
//! `exp` claim to decide whether a refresh is needed before a
//! privileged request. Anything unreadable counts as expired.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Decode the payload segment of a JWT. None for anything malformed.
pub fn claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry instant from the `exp` claim (seconds since epoch).
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = claims(token)?.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

/// Whether the token is expired at `now`. Fails closed: a token whose
/// payload cannot be read reports expired rather than erroring.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match expires_at(token) {
        Some(exp) => exp <= now,
        None => true,
    }
}

pub fn is_expired_now(token: &str) -> bool {
    is_expired(token, Utc::now())
}
