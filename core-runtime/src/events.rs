//! # Event Bus System
//!
//! Broadcasts typed lifecycle events between the shell core modules and the
//! host using `tokio::sync::broadcast`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │ Authorizer  ├──────────────>│           │
//! └─────────────┘               │           │
//!                               │ EventBus  │
//! ┌─────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │ Registry    ├──────────────>│  channel) ├─────────────────>│ Host UI    │
//! └─────────────┘               │           │                  └────────────┘
//!                               │           │
//! ┌─────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │ Uploads     ├──────────────>│           ├─────────────────>│ Telemetry  │
//! └─────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{ConnectionEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Connection(ConnectionEvent::Created {
//!         key: "/jobs".to_string(),
//!         connection_id: "c-1".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Connection(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped. Treat as shutdown.
//!
//! Emission is best effort. Publishers call `.ok()` on the result because
//! having no subscribers is normal.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Upload progress is the chattiest producer; subscribers that cannot keep
/// up receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
    Connection(ConnectionEvent),
    Transfer(TransferEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Connection(e) => e.description(),
            CoreEvent::Transfer(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Transfer(TransferEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::LoginRequired { .. }) => EventSeverity::Warning,
            CoreEvent::Transfer(TransferEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Transfer(TransferEvent::Aborted { .. }) => EventSeverity::Info,
            CoreEvent::Auth(AuthEvent::SignedOut) => EventSeverity::Info,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Session lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// The session is unusable and the host was sent to the login page.
    LoginRequired {
        /// Address the identity provider returns to after login.
        redirect_uri: String,
    },
    /// A login callback was exchanged for a fresh session.
    SignedIn {
        /// Unix epoch seconds.
        expires_at: i64,
    },
    /// Access token is being refreshed.
    TokenRefreshing,
    /// Token refresh completed successfully.
    TokenRefreshed {
        /// Unix epoch seconds.
        expires_at: i64,
    },
    /// Session cleared by an explicit logout.
    SignedOut,
    AuthError {
        message: String,
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::LoginRequired { .. } => "Login required",
            AuthEvent::SignedIn { .. } => "User signed in successfully",
            AuthEvent::TokenRefreshing => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::SignedOut => "User signed out",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Connection Events
// ============================================================================

/// Connection registry events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConnectionEvent {
    /// A new entry was stored under `key`.
    Created { key: String, connection_id: String },
    /// The entry under `key` was cancelled and removed.
    Aborted { key: String, connection_id: String },
}

impl ConnectionEvent {
    fn description(&self) -> &str {
        match self {
            ConnectionEvent::Created { .. } => "Connection created",
            ConnectionEvent::Aborted { .. } => "Connection aborted",
        }
    }
}

// ============================================================================
// Transfer Events
// ============================================================================

/// Upload lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransferEvent {
    /// The transport was invoked for an upload.
    Started {
        upload_id: String,
        file_name: String,
        file_size: u64,
    },
    Progress {
        upload_id: String,
        bytes_uploaded: u64,
        percentage: u8,
    },
    Completed { upload_id: String },
    Aborted { upload_id: String },
    Failed { upload_id: String, message: String },
}

impl TransferEvent {
    fn description(&self) -> &str {
        match self {
            TransferEvent::Started { .. } => "Upload started",
            TransferEvent::Progress { .. } => "Upload progress",
            TransferEvent::Completed { .. } => "Upload completed",
            TransferEvent::Aborted { .. } => "Upload aborted",
            TransferEvent::Failed { .. } => "Upload failed",
        }
    }

    /// Identifier of the upload this event belongs to.
    pub fn upload_id(&self) -> &str {
        match self {
            TransferEvent::Started { upload_id, .. }
            | TransferEvent::Progress { upload_id, .. }
            | TransferEvent::Completed { upload_id }
            | TransferEvent::Aborted { upload_id }
            | TransferEvent::Failed { upload_id, .. } => upload_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
///
/// Cheap to clone; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before it
    /// starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let transfers = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Transfer(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn created(key: &str) -> CoreEvent {
        CoreEvent::Connection(ConnectionEvent::Created {
            key: key.to_string(),
            connection_id: "c-1".to_string(),
        })
    }

    fn progress(percentage: u8) -> CoreEvent {
        CoreEvent::Transfer(TransferEvent::Progress {
            upload_id: "u-1".to_string(),
            bytes_uploaded: percentage as u64,
            percentage,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let event_bus = EventBus::new(10);
        assert!(event_bus.emit(created("/jobs")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let event_bus = EventBus::new(10);
        let mut first = event_bus.subscribe();
        let mut second = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        assert_eq!(event_bus.emit(created("/jobs")).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), created("/jobs"));
        assert_eq!(second.recv().await.unwrap(), created("/jobs"));
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let event_bus = EventBus::new(10);
        let mut stream = EventStream::new(event_bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Transfer(_)));

        event_bus.emit(created("/jobs")).ok();
        event_bus.emit(progress(40)).ok();

        assert_eq!(stream.recv().await.unwrap(), progress(40));
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let event_bus = EventBus::new(2);
        let mut stream = event_bus.subscribe();

        for pct in 0..5 {
            event_bus.emit(progress(pct)).ok();
        }

        assert!(matches!(stream.recv().await, Err(RecvError::Lagged(_))));
        assert!(stream.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_try_recv_empty_and_filtered() {
        let event_bus = EventBus::new(10);
        let mut stream = EventStream::new(event_bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Auth(_)));

        assert!(stream.try_recv().is_none());

        event_bus.emit(created("/jobs")).ok();
        assert!(stream.try_recv().is_none());

        event_bus.emit(CoreEvent::Auth(AuthEvent::SignedOut)).ok();
        assert!(matches!(stream.try_recv(), Some(Ok(CoreEvent::Auth(AuthEvent::SignedOut)))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Transfer(TransferEvent::Failed {
            upload_id: "u-1".to_string(),
            message: "Upload error".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(progress(10).severity(), EventSeverity::Debug);
        assert_eq!(
            CoreEvent::Auth(AuthEvent::LoginRequired {
                redirect_uri: "https://app.example.com/".to_string()
            })
            .severity(),
            EventSeverity::Warning
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(created("/jobs")).unwrap();
        assert_eq!(json["type"], "Connection");
        assert_eq!(json["payload"]["event"], "Created");
        assert_eq!(json["payload"]["key"], "/jobs");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, created("/jobs"));
    }

    #[test]
    fn test_transfer_upload_id() {
        let event = TransferEvent::Completed {
            upload_id: "u-9".to_string(),
        };
        assert_eq!(event.upload_id(), "u-9");
        assert_eq!(CoreEvent::Transfer(event).description(), "Upload completed");
    }
}
