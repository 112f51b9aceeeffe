//! Access token codec
//!
//! Turns [`TokenClaims`] into an opaque string and back.
//!
//! Two codecs are provided:
//! - [`DemoTokenCodec`]: base64 over the JSON claims. Reversible and
//!   unsigned, so anyone holding the string can forge it. Demo use only.
//! - [`HmacTokenCodec`]: the same payload followed by an HMAC-SHA256
//!   signature. Tokens that fail verification decode as malformed.

use chrono::{DateTime, Utc};
use data_encoding::{BASE64, BASE64URL_NOPAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::TokenClaims;

type HmacSha256 = Hmac<Sha256>;

/// Error types for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The string is not a token produced by this codec
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Claims could not be serialized
    #[error("Failed to encode token claims: {0}")]
    Encode(#[from] serde_json::Error),

    /// The signing key was rejected by the MAC
    #[error("Invalid signing key")]
    InvalidKey,
}

/// Encodes, decodes and validates access tokens
pub trait TokenCodec: Send + Sync {
    /// Serialize claims into an opaque token
    fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError>;

    /// Recover the claims from a token
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError>;

    /// `true` iff the token decodes and has not expired at `now`
    fn is_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match self.decode(token) {
            Ok(claims) => !claims.is_expired_at(now),
            Err(e) => {
                tracing::debug!("Rejecting token: {}", e);
                false
            }
        }
    }
}

fn claims_from_json(bytes: &[u8]) -> Result<TokenClaims, TokenError> {
    serde_json::from_slice(bytes)
        .map_err(|e| TokenError::Malformed(format!("invalid claims: {}", e)))
}

/// Unsigned base64 codec
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoTokenCodec;

impl TokenCodec for DemoTokenCodec {
    fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims)?;
        Ok(BASE64.encode(&json))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let json = BASE64
            .decode(token.as_bytes())
            .map_err(|e| TokenError::Malformed(format!("invalid encoding: {}", e)))?;
        claims_from_json(&json)
    }
}

/// Signed codec: `base64url(claims).base64url(hmac_sha256(key, payload))`
pub struct HmacTokenCodec {
    key: Vec<u8>,
}

impl std::fmt::Debug for HmacTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenCodec")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl HmacTokenCodec {
    /// Create a codec signing with `key`
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| TokenError::InvalidKey)?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

impl TokenCodec for HmacTokenCodec {
    fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims)?;
        let payload = BASE64URL_NOPAD.encode(&json);
        let signature = self.mac(&payload)?.finalize().into_bytes();
        Ok(format!("{}.{}", payload, BASE64URL_NOPAD.encode(&signature)))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| TokenError::Malformed("missing signature".to_string()))?;

        let signature = BASE64URL_NOPAD
            .decode(signature.as_bytes())
            .map_err(|e| TokenError::Malformed(format!("invalid signature encoding: {}", e)))?;
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| TokenError::Malformed("signature mismatch".to_string()))?;

        let json = BASE64URL_NOPAD
            .decode(payload.as_bytes())
            .map_err(|e| TokenError::Malformed(format!("invalid encoding: {}", e)))?;
        claims_from_json(&json)
    }
}
