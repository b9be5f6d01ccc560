//! OpenID Connect endpoints and token grants
//!
//! Endpoint layout follows the realm-scoped convention used by Keycloak-style
//! identity providers:
//!
//! ```text
//! {server}/realms/{realm}/protocol/openid-connect/auth
//! {server}/realms/{realm}/protocol/openid-connect/token
//! {server}/realms/{realm}/protocol/openid-connect/logout
//! ```
//!
//! Token requests are sent exactly once. A failed refresh is reported to the
//! caller, which decides whether to send the user back to the login page.

use crate::error::{AuthError, Result};
use crate::types::TokenResponse;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use core_runtime::config::AuthSettings;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Identity provider coordinates for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfig {
    pub server_url: Url,
    pub realm: String,
    pub client_id: String,
}

impl OidcConfig {
    pub fn new(server_url: Url, realm: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            server_url,
            realm: realm.into(),
            client_id: client_id.into(),
        }
    }

    fn endpoint(&self, action: &str) -> Result<Url> {
        let base = self.server_url.as_str().trim_end_matches('/');
        let raw = format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            base, self.realm, action
        );
        Url::parse(&raw).map_err(|e| {
            AuthError::InvalidConfiguration(format!("Invalid {} endpoint '{}': {}", action, raw, e))
        })
    }

    pub fn auth_endpoint(&self) -> Result<Url> {
        self.endpoint("auth")
    }

    pub fn token_endpoint(&self) -> Result<Url> {
        self.endpoint("token")
    }

    pub fn logout_endpoint(&self) -> Result<Url> {
        self.endpoint("logout")
    }

    /// Authorization code flow entry point.
    pub fn login_url(&self, redirect_uri: &Url, state: &str) -> Result<Url> {
        let mut url = self.auth_endpoint()?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", "openid")
            .append_pair("state", state);
        Ok(url)
    }

    /// End-session URL returning the browser to `post_logout_redirect_uri`.
    pub fn logout_url(&self, post_logout_redirect_uri: &Url) -> Result<Url> {
        let mut url = self.logout_endpoint()?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("post_logout_redirect_uri", post_logout_redirect_uri.as_str());
        Ok(url)
    }
}

impl From<&AuthSettings> for OidcConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self::new(
            settings.server_url.clone(),
            settings.realm.clone(),
            settings.client_id.clone(),
        )
    }
}

/// Token endpoint client.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// `grant_type=refresh_token`
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse>;

    /// `grant_type=authorization_code`
    async fn exchange_code(&self, code: &str, redirect_uri: &Url) -> Result<TokenResponse>;
}

/// [`TokenRefresher`] that posts form-encoded grants through the host `HttpClient`.
pub struct OidcTokenRefresher {
    config: OidcConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OidcTokenRefresher {
    pub fn new(config: OidcConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    async fn post_grant(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let encoded_body = serde_urlencoded::to_string(params).map_err(|e| {
            AuthError::TokenRefreshFailed(format!("Failed to encode token request: {}", e))
        })?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_endpoint()?.to_string())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded_body));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(format!("Network error: {}", e)))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status, error = %error_body, "Token endpoint rejected grant");

            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        response.json().map_err(|e| {
            AuthError::TokenRefreshFailed(format!("Failed to parse token response: {}", e))
        })
    }
}

#[async_trait]
impl TokenRefresher for OidcTokenRefresher {
    #[instrument(skip(self, refresh_token), fields(realm = %self.config.realm))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        debug!("Refreshing access token");

        let tokens = self
            .post_grant(&[
                ("grant_type", "refresh_token"),
                ("client_id", &self.config.client_id),
                ("refresh_token", refresh_token),
            ])
            .await?;

        debug!(expires_in = tokens.expires_in, "Access token refreshed");
        Ok(tokens)
    }

    #[instrument(skip(self, code), fields(realm = %self.config.realm))]
    async fn exchange_code(&self, code: &str, redirect_uri: &Url) -> Result<TokenResponse> {
        debug!("Exchanging authorization code for tokens");

        self.post_grant(&[
            ("grant_type", "authorization_code"),
            ("client_id", &self.config.client_id),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .await
    }
}
