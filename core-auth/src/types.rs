use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens held for the signed-in user.
///
/// `Debug` never prints the token values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Bearer token attached to API requests
    pub access_token: String,
    /// Used to obtain a new access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl SessionTokens {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }

    /// Build a session from a token endpoint response.
    ///
    /// Identity providers may omit the refresh token on renewal; the previous
    /// one stays in use in that case.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh_token),
            expires_at: now + Duration::seconds(response.expires_in),
        }
    }

    /// Whether the access token has less than `min_validity` left at `now`.
    pub fn expires_within(&self, min_validity: std::time::Duration, now: DateTime<Utc>) -> bool {
        let buffer = Duration::seconds(min_validity.as_secs() as i64);
        self.expires_at - now < buffer
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response body (RFC 6749 section 5.1).
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}
