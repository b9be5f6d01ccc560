use crate::client::TransportClient;
use crate::error::Result;
use crate::request::{ApiResponse, RequestConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier of one connection entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A keyed transport client and the handle that cancels everything it sends.
///
/// Once cancelled an entry is spent: every later request fails with
/// `ConnectionError::Cancelled` without reaching the network.
pub struct ConnectionEntry {
    key: String,
    id: ConnectionId,
    cancel: CancellationToken,
    client: TransportClient,
}

impl ConnectionEntry {
    pub(crate) fn new(key: String, cancel: CancellationToken, client: TransportClient) -> Self {
        Self {
            key,
            id: ConnectionId::new(),
            cancel,
            client,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel in-flight and future requests on this entry.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Child handle that fires when this entry is cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub async fn send(&self, config: RequestConfig) -> Result<ApiResponse> {
        self.client.send(config).await
    }
}

impl fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
