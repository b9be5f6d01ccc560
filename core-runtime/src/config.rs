//! # Shell Configuration
//!
//! Builder-validated configuration for the shell core.
//!
//! ## Overview
//!
//! [`ShellConfig`] carries the service addresses and the host bridges the
//! core needs. [`ShellConfigBuilder`] validates everything up front so a
//! misconfigured host fails at startup instead of on the first request.
//!
//! ## Required
//!
//! - API base URL (every connection resolves relative URLs against it)
//! - App root URL (login/logout return address)
//! - `HttpClient` (desktop default: reqwest)
//! - `LocationProvider` (desktop default: a `RouterLocation` at the app root)
//!
//! ## Optional
//!
//! - OpenID Connect settings. When present a `Navigator` becomes required,
//!   since login redirects are the only way to recover a lost session.
//! - `Clock` (default: system time)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ShellConfig;
//!
//! let config = ShellConfig::builder()
//!     .api_base_url("https://api.example.com/v1")
//!     .app_root_url("https://app.example.com/")
//!     .build()?;
//! ```
//!
//! Or from the process environment:
//!
//! ```ignore
//! use core_runtime::config::ShellConfigBuilder;
//!
//! let config = ShellConfigBuilder::from_env()
//!     .navigator(navigator)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, LocationProvider, Navigator, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const ENV_API_BASE_URL: &str = "SHELL_API_BASE_URL";
pub const ENV_APP_ROOT_URL: &str = "SHELL_APP_ROOT_URL";
pub const ENV_AUTH_SERVER_URL: &str = "SHELL_AUTH_SERVER_URL";
pub const ENV_AUTH_REALM: &str = "SHELL_AUTH_REALM";
pub const ENV_AUTH_CLIENT_ID: &str = "SHELL_AUTH_CLIENT_ID";

/// Minimum remaining token lifetime before a refresh is forced
pub const DEFAULT_TOKEN_MIN_VALIDITY: Duration = Duration::from_secs(70);

/// OpenID Connect identity provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Identity server root, e.g. `https://auth.example.com/`
    pub server_url: Url,
    pub realm: String,
    pub client_id: String,
    /// Minimum remaining validity a token must have to be handed out
    pub min_validity: Duration,
}

/// Shell core configuration.
///
/// Use [`ShellConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ShellConfig {
    pub api_base_url: Url,
    pub app_root_url: Url,
    pub auth: Option<AuthSettings>,
    pub http_client: Arc<dyn HttpClient>,
    pub location_provider: Arc<dyn LocationProvider>,
    pub navigator: Option<Arc<dyn Navigator>>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ShellConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("app_root_url", &self.app_root_url.as_str())
            .field("auth", &self.auth)
            .field("http_client", &"HttpClient { ... }")
            .field("location_provider", &"LocationProvider { ... }")
            .field(
                "navigator",
                &self.navigator.as_ref().map(|_| "Navigator { ... }"),
            )
            .finish()
    }
}

impl ShellConfig {
    pub fn builder() -> ShellConfigBuilder {
        ShellConfigBuilder::default()
    }

    /// Whether requests should carry bearer tokens.
    pub fn auth_enabled(&self) -> bool {
        self.auth.is_some()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for all API traffic. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Web: inject a fetch-based client."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::{ReqwestHttpClient, DEFAULT_USER_AGENT};

    let client = ReqwestHttpClient::with_user_agent(DEFAULT_USER_AGENT)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_location_provider(app_root_url: &Url) -> Result<Arc<dyn LocationProvider>> {
    use bridge_desktop::RouterLocation;
    use bridge_traits::Location;

    Ok(Arc::new(RouterLocation::new(Location::from(app_root_url))))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_location_provider(_app_root_url: &Url) -> Result<Arc<dyn LocationProvider>> {
    Err(Error::CapabilityMissing {
        capability: "LocationProvider".to_string(),
        message: "LocationProvider implementation is required to derive connection keys \
                 and login return addresses. Inject the host router's location source."
            .to_string(),
    })
}

fn parse_url(name: &str, value: &str) -> Result<Url> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Config(format!("{} cannot be empty", name)));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("{} '{}' is not a valid URL: {}", name, trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "{} must use http or https, got '{}'",
            name, other
        ))),
    }
}

#[derive(Default)]
pub struct ShellConfigBuilder {
    api_base_url: Option<String>,
    app_root_url: Option<String>,
    auth_server_url: Option<String>,
    auth_realm: Option<String>,
    auth_client_id: Option<String>,
    token_min_validity: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    location_provider: Option<Arc<dyn LocationProvider>>,
    navigator: Option<Arc<dyn Navigator>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ShellConfigBuilder {
    /// Seed a builder from `SHELL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Seed a builder from an arbitrary variable lookup.
    ///
    /// Unset or blank variables leave the corresponding field empty so later
    /// builder calls (or `build()` validation) decide what happens.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            api_base_url: get(ENV_API_BASE_URL),
            app_root_url: get(ENV_APP_ROOT_URL),
            auth_server_url: get(ENV_AUTH_SERVER_URL),
            auth_realm: get(ENV_AUTH_REALM),
            auth_client_id: get(ENV_AUTH_CLIENT_ID),
            ..Self::default()
        }
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn app_root_url(mut self, url: impl Into<String>) -> Self {
        self.app_root_url = Some(url.into());
        self
    }

    /// Enable OpenID Connect authorization.
    pub fn auth(
        mut self,
        server_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        self.auth_server_url = Some(server_url.into());
        self.auth_realm = Some(realm.into());
        self.auth_client_id = Some(client_id.into());
        self
    }

    /// Default: 70 seconds
    pub fn token_min_validity(mut self, min_validity: Duration) -> Self {
        self.token_min_validity = Some(min_validity);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn location_provider(mut self, provider: Arc<dyn LocationProvider>) -> Self {
        self.location_provider = Some(provider);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    fn build_auth(&self) -> Result<Option<AuthSettings>> {
        let fields = (
            self.auth_server_url.as_deref(),
            self.auth_realm.as_deref(),
            self.auth_client_id.as_deref(),
        );

        match fields {
            (None, None, None) => Ok(None),
            (Some(server), Some(realm), Some(client_id)) => {
                if realm.trim().is_empty() {
                    return Err(Error::Config("Auth realm cannot be empty".to_string()));
                }
                if client_id.trim().is_empty() {
                    return Err(Error::Config("Auth client id cannot be empty".to_string()));
                }

                Ok(Some(AuthSettings {
                    server_url: parse_url("Auth server URL", server)?,
                    realm: realm.trim().to_string(),
                    client_id: client_id.trim().to_string(),
                    min_validity: self
                        .token_min_validity
                        .unwrap_or(DEFAULT_TOKEN_MIN_VALIDITY),
                }))
            }
            _ => Err(Error::Config(format!(
                "Auth configuration is incomplete: {}, {} and {} must be set together",
                ENV_AUTH_SERVER_URL, ENV_AUTH_REALM, ENV_AUTH_CLIENT_ID
            ))),
        }
    }

    /// Validate and assemble the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for missing or malformed addresses and partial
    ///   auth settings
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and no
    ///   platform default applies
    pub fn build(self) -> Result<ShellConfig> {
        let api_base_url = self
            .api_base_url
            .as_deref()
            .ok_or_else(|| Error::Config("API base URL is required".to_string()))
            .and_then(|value| parse_url("API base URL", value))?;

        let app_root_url = self
            .app_root_url
            .as_deref()
            .ok_or_else(|| Error::Config("App root URL is required".to_string()))
            .and_then(|value| parse_url("App root URL", value))?;

        let auth = self.build_auth()?;

        if auth.is_some() && self.navigator.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "Navigator".to_string(),
                message: "Authorization is configured but no Navigator was provided. \
                         Login and logout redirects need a host navigation hook."
                    .to_string(),
            });
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let location_provider = match self.location_provider {
            Some(provider) => provider,
            None => provide_default_location_provider(&app_root_url)?,
        };

        Ok(ShellConfig {
            api_base_url,
            app_root_url,
            auth,
            http_client,
            location_provider,
            navigator: self.navigator,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse, Location};
    use std::collections::HashMap;

    struct NoopHttpClient;

    #[async_trait]
    impl HttpClient for NoopHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status: 204,
                headers: HashMap::new(),
                body: Default::default(),
            })
        }
    }

    struct FixedLocation;

    impl LocationProvider for FixedLocation {
        fn current(&self) -> Location {
            Location {
                href: "https://app.example.com/jobs".to_string(),
                pathname: "/jobs".to_string(),
            }
        }
    }

    struct NoopNavigator;

    #[async_trait]
    impl Navigator for NoopNavigator {
        async fn navigate(&self, _url: &Url) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn base_builder() -> ShellConfigBuilder {
        ShellConfig::builder()
            .api_base_url("https://api.example.com/v1")
            .app_root_url("https://app.example.com/")
            .http_client(Arc::new(NoopHttpClient))
            .location_provider(Arc::new(FixedLocation))
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.api_base_url.as_str(), "https://api.example.com/v1");
        assert!(!config.auth_enabled());
        assert!(config.navigator.is_none());
    }

    #[test]
    fn test_builder_requires_api_base_url() {
        let result = ShellConfig::builder()
            .app_root_url("https://app.example.com/")
            .http_client(Arc::new(NoopHttpClient))
            .location_provider(Arc::new(FixedLocation))
            .build();

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("API base URL")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_builder_rejects_non_http_scheme() {
        let result = base_builder().api_base_url("ftp://files.example.com").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_relative_url() {
        let result = base_builder().app_root_url("/app").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_auth_requires_navigator() {
        let result = base_builder()
            .auth("https://auth.example.com/", "acme", "shell")
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "Navigator")
            }
            other => panic!("expected missing capability, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_auth_settings_defaults() {
        let config = base_builder()
            .auth("https://auth.example.com/", "acme", "shell")
            .navigator(Arc::new(NoopNavigator))
            .build()
            .unwrap();

        let auth = config.auth.unwrap();
        assert_eq!(auth.realm, "acme");
        assert_eq!(auth.client_id, "shell");
        assert_eq!(auth.min_validity, Duration::from_secs(70));
    }

    #[test]
    fn test_from_lookup_reads_shell_variables() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_BASE_URL, "https://api.example.com/"),
            (ENV_APP_ROOT_URL, "https://app.example.com/"),
            (ENV_AUTH_SERVER_URL, "https://auth.example.com/"),
            (ENV_AUTH_REALM, "acme"),
            (ENV_AUTH_CLIENT_ID, "shell"),
        ]
        .into_iter()
        .collect();

        let config = ShellConfigBuilder::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .http_client(Arc::new(NoopHttpClient))
            .location_provider(Arc::new(FixedLocation))
            .navigator(Arc::new(NoopNavigator))
            .build()
            .unwrap();

        assert_eq!(config.app_root_url.as_str(), "https://app.example.com/");
        assert_eq!(
            config.auth.map(|a| a.server_url.to_string()),
            Some("https://auth.example.com/".to_string())
        );
    }

    #[test]
    fn test_from_lookup_partial_auth_is_rejected() {
        let result = ShellConfigBuilder::from_lookup(|name| match name {
            ENV_API_BASE_URL => Some("https://api.example.com/".to_string()),
            ENV_APP_ROOT_URL => Some("https://app.example.com/".to_string()),
            ENV_AUTH_REALM => Some("acme".to_string()),
            _ => None,
        })
        .http_client(Arc::new(NoopHttpClient))
        .location_provider(Arc::new(FixedLocation))
        .build();

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("incomplete")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_from_lookup_ignores_blank_values() {
        let builder = ShellConfigBuilder::from_lookup(|_| Some("   ".to_string()));
        assert!(builder.api_base_url.is_none());
        assert!(builder.auth_realm.is_none());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client() {
        let result = ShellConfig::builder()
            .api_base_url("https://api.example.com/")
            .app_root_url("https://app.example.com/")
            .location_provider(Arc::new(FixedLocation))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("expected missing capability, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = ShellConfig::builder()
            .api_base_url("https://api.example.com/")
            .app_root_url("https://app.example.com/dashboard")
            .build()
            .expect("desktop defaults should satisfy required bridges");

        assert_eq!(config.location_provider.current().pathname, "/dashboard");
    }

    #[test]
    fn test_config_debug_hides_bridges() {
        let config = base_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("HttpClient { ... }"));
        assert!(debug.contains("api.example.com"));
    }
}
