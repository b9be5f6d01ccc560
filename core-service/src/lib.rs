//! Core service façade and bootstrap helpers.
//!
//! [`ShellService`] wires a validated [`ShellConfig`] into the shared core:
//! the event bus, the session authorizer (when an identity provider is
//! configured), the connection registry and the list of uploads. Desktop
//! hosts typically enable the `desktop-shims` feature so the configuration
//! builder supplies the `reqwest` transport and router-backed location.
//!
//! ```ignore
//! use core_service::ShellService;
//! use core_runtime::config::ShellConfigBuilder;
//!
//! let config = ShellConfigBuilder::from_env().build()?;
//! let shell = ShellService::new(config)?;
//!
//! let jobs = shell.registry().send(RequestConfig::get("/jobs")).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{ChannelNavigator, ReqwestHttpClient, RouterLocation};

use std::sync::Arc;

use core_auth::{Authorizer, OidcConfig, OidcTokenRefresher, SessionAuthorizer};
use core_connection::{ApiResponse, ConnectionRegistry, FileDescriptor, RequestConfig};
use core_runtime::config::ShellConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_upload::{UploadHandle, UploadList, UploadProcess, UploadSnapshot};
use tokio::sync::broadcast;
use tracing::info;
use url::Url;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct ShellService {
    config: Arc<ShellConfig>,
    event_bus: EventBus,
    authorizer: Option<Arc<SessionAuthorizer>>,
    registry: Arc<ConnectionRegistry>,
    uploads: Arc<UploadList>,
}

impl ShellService {
    /// Wire the core from `config`.
    ///
    /// # Errors
    ///
    /// Fails if the API base address is rejected by the registry or the
    /// identity provider settings are incomplete.
    pub fn new(config: ShellConfig) -> Result<Self> {
        let event_bus = EventBus::default();

        let authorizer = match (&config.auth, &config.navigator) {
            (Some(settings), Some(navigator)) => {
                let oidc = OidcConfig::from(settings);
                let refresher = Arc::new(OidcTokenRefresher::new(
                    oidc.clone(),
                    Arc::clone(&config.http_client),
                ));

                let authorizer = SessionAuthorizer::new(
                    oidc,
                    config.app_root_url.clone(),
                    refresher,
                    Arc::clone(navigator),
                    Arc::clone(&config.clock),
                )
                .with_min_validity(settings.min_validity)
                .with_event_bus(event_bus.clone());

                Some(Arc::new(authorizer))
            }
            (Some(_), None) => {
                return Err(core_runtime::Error::CapabilityMissing {
                    capability: "Navigator".to_string(),
                    message: "Login redirects need a Navigator when authentication is enabled"
                        .to_string(),
                }
                .into())
            }
            (None, _) => None,
        };

        let mut registry = ConnectionRegistry::new(
            config.api_base_url.as_str(),
            Arc::clone(&config.http_client),
            Arc::clone(&config.location_provider),
        )?
        .with_event_bus(event_bus.clone());

        if let Some(authorizer) = &authorizer {
            let authorizer: Arc<dyn Authorizer> = authorizer.clone();
            registry = registry.with_authorizer(authorizer);
        }

        info!(
            api_base_url = %config.api_base_url,
            auth_enabled = authorizer.is_some(),
            "Shell service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            authorizer,
            registry: Arc::new(registry),
            uploads: Arc::new(UploadList::new()),
        })
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn authorizer(&self) -> Option<Arc<SessionAuthorizer>> {
        self.authorizer.clone()
    }

    pub fn uploads(&self) -> Arc<UploadList> {
        Arc::clone(&self.uploads)
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Send through the connection of the current location.
    pub async fn send(&self, config: RequestConfig) -> Result<ApiResponse> {
        Ok(self.registry.send(config).await?)
    }

    /// Cancel all requests of the current location, e.g. when leaving a view.
    pub fn abort_current(&self) -> bool {
        self.registry.abort_and_delete(&self.registry.current_key())
    }

    /// Upload `file` to `url` on the current location's connection.
    ///
    /// The upload starts immediately and is added to [`Self::uploads`].
    /// Must be called from within a tokio runtime.
    pub fn start_upload(&self, file: FileDescriptor, url: impl Into<String>) -> UploadHandle {
        let key = self.registry.current_key();
        self.start_upload_with_key(file, url, &key)
    }

    pub fn start_upload_with_key(
        &self,
        file: FileDescriptor,
        url: impl Into<String>,
        key: &str,
    ) -> UploadHandle {
        let (process, handle) = UploadProcess::new(self.registry.get(key), file, url);
        self.launch(process, handle)
    }

    /// Like [`Self::start_upload`], but the upload waits for
    /// [`UploadHandle::resume`].
    pub fn queue_upload(&self, file: FileDescriptor, url: impl Into<String>) -> UploadHandle {
        let key = self.registry.current_key();
        let (process, handle) = UploadProcess::paused(self.registry.get(&key), file, url);
        self.launch(process, handle)
    }

    /// Drop finished or unwanted uploads of `file_name` from the list.
    pub fn remove_upload(&self, file_name: &str) -> usize {
        self.uploads.remove(file_name)
    }

    pub fn upload_snapshots(&self) -> Vec<UploadSnapshot> {
        self.uploads.snapshots()
    }

    pub async fn login(&self, redirect_uri: &str) -> Result<Url> {
        Ok(self.require_authorizer()?.login(redirect_uri).await?)
    }

    /// Finish the authorization code flow after the identity provider redirected back.
    pub async fn complete_login(&self, code: &str, state: &str, redirect_uri: &str) -> Result<()> {
        Ok(self
            .require_authorizer()?
            .complete_login(code, state, redirect_uri)
            .await?)
    }

    pub async fn logout(&self) -> Result<Url> {
        Ok(self.require_authorizer()?.logout().await?)
    }

    fn require_authorizer(&self) -> Result<&SessionAuthorizer> {
        self.authorizer.as_deref().ok_or(CoreError::AuthDisabled)
    }

    fn launch(&self, process: UploadProcess, handle: UploadHandle) -> UploadHandle {
        process.with_event_bus(self.event_bus.clone()).spawn();
        self.uploads.add(handle.clone());
        handle
    }
}
