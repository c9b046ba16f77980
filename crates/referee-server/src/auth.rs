//! Token validation boundary.
//!
//! Token issuance belongs to the authentication subsystem; this module
//! only verifies what arrives on the upgrade request. The shipped
//! validator checks an HMAC-style sha256 signature and an expiry
//! claim over a compact dotted format:
//!
//! ```text
//! <user_id>.<subscription>.<expires_unix>.<hex digest>
//! ```

use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use thiserror::Error;

use referee_core::UserId;

/// Identity claims embedded in a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: UserId,
    pub subscription: String,
    /// Expiry as unix seconds.
    pub expires_at: u64,
}

/// Token rejection reasons. All of them refuse the upgrade handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no token supplied")]
    Missing,

    #[error("token is malformed")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,
}

/// Validates an authentication token into claims.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Shared-secret validator for the dotted token format above.
#[derive(Debug, Clone)]
pub struct HmacTokenValidator {
    secret: String,
}

impl HmacTokenValidator {
    pub fn new(secret: impl Into<String>) -> Self {
        HmacTokenValidator {
            secret: secret.into(),
        }
    }

    /// Mint a token for the given claims. Used by tests and local
    /// tooling; production tokens come from the auth service.
    pub fn mint(&self, user_id: UserId, subscription: &str, expires_at: u64) -> String {
        let payload = format!("{}.{}.{}", user_id, subscription, expires_at);
        format!("{}.{}", payload, self.signature(&payload))
    }

    fn signature(&self, payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(payload.as_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{:02x}", byte);
        }
        hex
    }
}

impl TokenValidator for HmacTokenValidator {
    fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let (payload, signature) = token.rsplit_once('.').ok_or(AuthError::Malformed)?;
        if self.signature(payload) != signature {
            return Err(AuthError::BadSignature);
        }

        let mut parts = payload.split('.');
        let user_id: UserId = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or(AuthError::Malformed)?;
        let subscription = parts.next().ok_or(AuthError::Malformed)?.to_string();
        let expires_at: u64 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or(AuthError::Malformed)?;
        if parts.next().is_some() {
            return Err(AuthError::Malformed);
        }

        if expires_at <= unix_now() {
            return Err(AuthError::Expired);
        }

        Ok(Claims {
            user_id,
            subscription,
            expires_at,
        })
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
