//! Keyed connection registry
//!
//! Callers group requests under a key (by default the current page path) so
//! that everything issued for one view can be cancelled together when the
//! user navigates away:
//!
//! ```ignore
//! let response = registry.send(RequestConfig::get("/jobs")).await?;
//!
//! // Leaving the page
//! registry.abort_and_delete(&registry.current_key());
//! ```
//!
//! A cancelled entry is removed; the next request for the same key gets a
//! fresh entry.

use crate::client::{BearerAuthorization, CamelCaseKeys, TransportClient};
use crate::entry::ConnectionEntry;
use crate::error::{ConnectionError, Result};
use crate::request::{ApiResponse, RequestConfig};
use crate::upload::FileDescriptor;
use bridge_traits::http::HttpClient;
use bridge_traits::navigation::LocationProvider;
use core_auth::Authorizer;
use core_runtime::events::{ConnectionEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Keyed set of cancellable connections sharing one base address.
pub struct ConnectionRegistry {
    base_url: Url,
    http_client: Arc<dyn HttpClient>,
    location: Arc<dyn LocationProvider>,
    authorizer: Option<Arc<dyn Authorizer>>,
    event_bus: Option<EventBus>,
    entries: Mutex<HashMap<String, Arc<ConnectionEntry>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidUrl`] if `base_url` is not an
    /// absolute URL.
    pub fn new(
        base_url: &str,
        http_client: Arc<dyn HttpClient>,
        location: Arc<dyn LocationProvider>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            base_url,
            http_client,
            location,
            authorizer: None,
            event_bus: None,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Attach bearer tokens from `authorizer` to every request.
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Publish connection lifecycle events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Base address every relative request URL is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Live entry for `key`, creating and storing one if there is none or the
    /// stored one was cancelled.
    pub fn get(&self, key: &str) -> Arc<ConnectionEntry> {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(key) {
            if !entry.is_cancelled() {
                return Arc::clone(entry);
            }
            debug!(key, "Replacing cancelled connection");
        }

        let entry = self.create(key);
        entries.insert(key.to_string(), Arc::clone(&entry));
        drop(entries);

        info!(key, connection_id = %entry.id(), "Connection created");
        self.emit(ConnectionEvent::Created {
            key: key.to_string(),
            connection_id: entry.id().to_string(),
        });

        entry
    }

    /// Build a new entry for `key` without storing it.
    pub fn create(&self, key: &str) -> Arc<ConnectionEntry> {
        let cancel = CancellationToken::new();

        let mut client = TransportClient::new(
            self.base_url.clone(),
            Arc::clone(&self.http_client),
            cancel.clone(),
        )
        .with_response_interceptor(Arc::new(CamelCaseKeys));

        if let Some(authorizer) = &self.authorizer {
            client = client.with_request_interceptor(Arc::new(BearerAuthorization::new(
                Arc::clone(authorizer),
                Arc::clone(&self.location),
            )));
        }

        Arc::new(ConnectionEntry::new(key.to_string(), cancel, client))
    }

    /// Send through the connection for the current location.
    pub async fn send(&self, config: RequestConfig) -> Result<ApiResponse> {
        let key = self.current_key();
        self.send_with_key(config, &key).await
    }

    /// Send through the connection stored under `key`.
    pub async fn send_with_key(&self, config: RequestConfig, key: &str) -> Result<ApiResponse> {
        let entry = self.get(key);
        entry.send(config).await
    }

    /// Cancel everything sent under `key` and forget the entry.
    ///
    /// Returns `false` when there was no live entry.
    pub fn abort_and_delete(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();

        let entry = match entries.get(key) {
            Some(entry) if !entry.is_cancelled() => Arc::clone(entry),
            _ => return false,
        };

        entry.cancel();
        entries.remove(key);
        drop(entries);

        info!(key, connection_id = %entry.id(), "Connection aborted");
        self.emit(ConnectionEvent::Aborted {
            key: key.to_string(),
            connection_id: entry.id().to_string(),
        });

        true
    }

    /// Key used by [`send`](Self::send): the current location's path.
    pub fn current_key(&self) -> String {
        self.location.current().pathname
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether an entry is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Keys of all stored entries, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// See [`crate::upload::build_upload_config`].
    pub fn build_upload_config(file: &FileDescriptor, url: impl Into<String>) -> RequestConfig {
        crate::upload::build_upload_config(file, url)
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Connection(event)).ok();
        }
    }
}
