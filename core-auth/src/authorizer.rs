//! Request authorization
//!
//! [`Authorizer`] is the only thing the connection layer knows about auth:
//! given the address the user should come back to, produce a bearer token or
//! fail. Failing implies the user has already been sent to the login page.
//!
//! [`SessionAuthorizer`] is the OpenID Connect implementation. It keeps the
//! session in memory, renews the access token when less than the configured
//! minimum validity remains, and falls back to a login redirect whenever the
//! session cannot be used.

use crate::error::{AuthError, Result};
use crate::oauth::{OidcConfig, TokenRefresher};
use crate::types::SessionTokens;
use async_trait::async_trait;
use bridge_traits::{Clock, Navigator};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

/// Bearer token capability.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Resolve a bearer token valid for the next request.
    ///
    /// On failure the implementation has already triggered a login redirect
    /// returning to `redirect_uri`.
    async fn authorize(&self, redirect_uri: &str) -> Result<String>;
}

/// OpenID Connect session authorizer.
pub struct SessionAuthorizer {
    config: OidcConfig,
    app_root_url: Url,
    min_validity: Duration,
    refresher: Arc<dyn TokenRefresher>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    session: RwLock<Option<SessionTokens>>,
    /// Serializes refreshes so concurrent requests renew the token once
    refresh_lock: Mutex<()>,
    /// `state` of the login redirect still waiting for its callback
    pending_state: Mutex<Option<String>>,
}

impl SessionAuthorizer {
    pub fn new(
        config: OidcConfig,
        app_root_url: Url,
        refresher: Arc<dyn TokenRefresher>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            app_root_url,
            min_validity: core_runtime::config::DEFAULT_TOKEN_MIN_VALIDITY,
            refresher,
            navigator,
            clock,
            event_bus: None,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            pending_state: Mutex::new(None),
        }
    }

    pub fn with_min_validity(mut self, min_validity: Duration) -> Self {
        self.min_validity = min_validity;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Auth(event)).ok();
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Install a session obtained outside the login redirect flow.
    pub async fn set_session(&self, tokens: SessionTokens) {
        *self.session.write().await = Some(tokens);
    }

    /// Current session, if any.
    pub async fn session(&self) -> Option<SessionTokens> {
        self.session.read().await.clone()
    }

    fn resolve_against_root(&self, uri: &str) -> Result<Url> {
        self.app_root_url.join(uri).map_err(|e| {
            AuthError::InvalidConfiguration(format!("Invalid redirect URI '{}': {}", uri, e))
        })
    }

    /// Send the user to the identity provider.
    ///
    /// `redirect_uri` may be relative; it is resolved against the app root.
    /// Returns the address the host was sent to.
    #[instrument(skip(self))]
    pub async fn login(&self, redirect_uri: &str) -> Result<Url> {
        let redirect = self.resolve_against_root(redirect_uri)?;
        let state = Uuid::new_v4().simple().to_string();
        let url = self.config.login_url(&redirect, &state)?;

        *self.pending_state.lock().await = Some(state);

        info!(redirect_uri = %redirect, "Redirecting to login");
        self.emit(AuthEvent::LoginRequired {
            redirect_uri: redirect.to_string(),
        });

        self.navigator.navigate(&url).await?;
        Ok(url)
    }

    /// Finish a login redirect by exchanging the callback `code`.
    ///
    /// `redirect_uri` must be the same address passed to [`login`](Self::login).
    #[instrument(skip(self, code, state))]
    pub async fn complete_login(&self, code: &str, state: &str, redirect_uri: &str) -> Result<()> {
        let expected = self.pending_state.lock().await.take();
        if expected.as_deref() != Some(state) {
            warn!("Login callback state does not match the pending login");
            return Err(AuthError::StateMismatch);
        }

        let redirect = self.resolve_against_root(redirect_uri)?;
        let response = self.refresher.exchange_code(code, &redirect).await?;
        let tokens = SessionTokens::from_response(response, None, self.clock.now());
        let expires_at = tokens.expires_at.timestamp();

        *self.session.write().await = Some(tokens);

        info!(expires_at, "Signed in");
        self.emit(AuthEvent::SignedIn { expires_at });
        Ok(())
    }

    /// Clear the session and send the user to the end-session endpoint.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<Url> {
        *self.session.write().await = None;

        let root = self.resolve_against_root("/")?;
        let url = self.config.logout_url(&root)?;

        info!("Signing out");
        self.emit(AuthEvent::SignedOut);

        self.navigator.navigate(&url).await?;
        Ok(url)
    }

    async fn login_after_failure(&self, redirect_uri: &str) {
        if let Err(e) = self.login(redirect_uri).await {
            error!(error = %e, "Login redirect failed");
        }
    }

    async fn refresh_session(&self, current: SessionTokens) -> Result<String> {
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::TokenRefreshFailed("No refresh token available".to_string()))?;

        self.emit(AuthEvent::TokenRefreshing);
        let response = self.refresher.refresh(&refresh_token).await?;
        let tokens = SessionTokens::from_response(response, current.refresh_token, self.clock.now());
        let access_token = tokens.access_token.clone();
        let expires_at = tokens.expires_at.timestamp();

        *self.session.write().await = Some(tokens);

        self.emit(AuthEvent::TokenRefreshed { expires_at });
        Ok(access_token)
    }
}

#[async_trait]
impl Authorizer for SessionAuthorizer {
    #[instrument(skip(self))]
    async fn authorize(&self, redirect_uri: &str) -> Result<String> {
        let current = self.session.read().await.clone();
        let Some(tokens) = current else {
            debug!("No session");
            self.login_after_failure(redirect_uri).await;
            return Err(AuthError::NotAuthenticated);
        };

        if !tokens.expires_within(self.min_validity, self.clock.now()) {
            return Ok(tokens.access_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed or cleared the session while we waited.
        let current = self.session.read().await.clone();
        let Some(tokens) = current else {
            self.login_after_failure(redirect_uri).await;
            return Err(AuthError::NotAuthenticated);
        };

        if !tokens.expires_within(self.min_validity, self.clock.now()) {
            return Ok(tokens.access_token);
        }

        info!("Token expires soon, refreshing");

        match self.refresh_session(tokens).await {
            Ok(access_token) => Ok(access_token),
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                *self.session.write().await = None;
                self.emit(AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: true,
                });
                self.login_after_failure(redirect_uri).await;

                Err(match e {
                    AuthError::TokenRefreshFailed(msg) => AuthError::TokenRefreshFailed(msg),
                    other => AuthError::TokenRefreshFailed(other.to_string()),
                })
            }
        }
    }
}
