//! Upload process driver
//!
//! One [`UploadProcess`] owns one [`UploadMachine`]. Events from callers
//! ([`UploadHandle`]) and from the transfer task arrive on a single channel
//! and are applied strictly one at a time, so the machine needs no lock.
//! After every event the current [`UploadSnapshot`] is published on a
//! `watch` channel.
//!
//! The transfer itself runs as a separate task. It reports back only through
//! `Progress`, `Uploaded` and `Error` events.

use crate::error::{Result, UploadError};
use crate::machine::{UploadContext, UploadEffect, UploadEvent, UploadMachine, UploadState};
use core_connection::{build_upload_config, ConnectionEntry, ConnectionError, FileDescriptor};
use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Identifies one upload process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable state of one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSnapshot {
    pub id: UploadId,
    pub state: UploadState,
    pub context: UploadContext,
}

impl UploadSnapshot {
    /// Whether the upload has uploaded, aborted or failed.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Caller side of an upload process. Cheap to clone.
#[derive(Clone)]
pub struct UploadHandle {
    id: UploadId,
    events: mpsc::UnboundedSender<UploadEvent>,
    snapshots: watch::Receiver<UploadSnapshot>,
}

impl UploadHandle {
    /// Identifier of the process this handle drives.
    pub fn id(&self) -> UploadId {
        self.id
    }

    /// Cancel the transfer. Ignored unless the upload is in progress.
    pub fn abort(&self) -> Result<()> {
        self.send(UploadEvent::Abort)
    }

    /// Start a paused upload. Ignored unless the upload is idle.
    pub fn resume(&self) -> Result<()> {
        self.send(UploadEvent::Resume)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> UploadSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Name of the file being uploaded.
    pub fn file_name(&self) -> String {
        self.snapshots.borrow().context.file_name.clone()
    }

    /// Receiver notified on every state or progress change.
    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until the upload reaches a terminal state.
    pub async fn wait(&self) -> Result<UploadSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(UploadSnapshot::is_terminal)
            .await
            .map_err(|_| UploadError::ProcessClosed)?;
        Ok(snapshot.clone())
    }

    fn send(&self, event: UploadEvent) -> Result<()> {
        self.events.send(event).map_err(|_| UploadError::ProcessClosed)
    }
}

impl fmt::Debug for UploadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHandle")
            .field("id", &self.id)
            .field("state", &self.snapshots.borrow().state)
            .finish()
    }
}

/// Single-owner driver of one [`UploadMachine`].
pub struct UploadProcess {
    id: UploadId,
    machine: UploadMachine,
    connection: Arc<ConnectionEntry>,
    file: FileDescriptor,
    url: String,
    events_tx: mpsc::UnboundedSender<UploadEvent>,
    events_rx: mpsc::UnboundedReceiver<UploadEvent>,
    snapshots: watch::Sender<UploadSnapshot>,
    event_bus: Option<EventBus>,
    transfer: Option<JoinHandle<()>>,
}

impl UploadProcess {
    /// Process that starts transferring as soon as it runs.
    pub fn new(
        connection: Arc<ConnectionEntry>,
        file: FileDescriptor,
        url: impl Into<String>,
    ) -> (Self, UploadHandle) {
        let machine = UploadMachine::new(file.name(), file.size());
        Self::with_machine(machine, connection, file, url.into())
    }

    /// Process that waits in `idle` until [`UploadHandle::resume`].
    pub fn paused(
        connection: Arc<ConnectionEntry>,
        file: FileDescriptor,
        url: impl Into<String>,
    ) -> (Self, UploadHandle) {
        let machine = UploadMachine::paused(file.name(), file.size());
        Self::with_machine(machine, connection, file, url.into())
    }

    fn with_machine(
        machine: UploadMachine,
        connection: Arc<ConnectionEntry>,
        file: FileDescriptor,
        url: String,
    ) -> (Self, UploadHandle) {
        let id = UploadId::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(UploadSnapshot {
            id,
            state: machine.state(),
            context: machine.context().clone(),
        });

        let handle = UploadHandle {
            id,
            events: events_tx.clone(),
            snapshots: snapshot_rx,
        };

        let process = Self {
            id,
            machine,
            connection,
            file,
            url,
            events_tx,
            events_rx,
            snapshots,
            event_bus: None,
            transfer: None,
        };

        (process, handle)
    }

    /// Publish transfer events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn id(&self) -> UploadId {
        self.id
    }

    /// State of the machine before the process runs.
    pub fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            id: self.id,
            state: self.machine.state(),
            context: self.machine.context().clone(),
        }
    }

    /// Drive the machine until it reaches a terminal state.
    ///
    /// Also returns once every handle and subscriber is gone while no
    /// transfer is in flight.
    #[instrument(skip(self), fields(upload_id = %self.id, file_name = %self.file.name()))]
    pub async fn run(mut self) -> UploadSnapshot {
        if let Some(effect) = self.machine.initial_effect() {
            self.perform(effect);
        }
        self.publish();

        while !self.machine.state().is_terminal() {
            let transfer_in_flight = self.machine.state() == UploadState::Uploading;

            tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => self.apply(event),
                    None => break,
                },
                _ = self.snapshots.closed(), if !transfer_in_flight => {
                    debug!("All upload handles dropped");
                    break;
                }
            }
        }

        info!(state = self.machine.state().as_str(), "Upload process finished");
        self.snapshot()
    }

    /// Run the process on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<UploadSnapshot> {
        tokio::spawn(self.run())
    }

    fn apply(&mut self, event: UploadEvent) {
        let before = self.machine.state();
        let is_progress = matches!(event, UploadEvent::Progress(_));
        let description = format!("{:?}", event);

        let effect = self.machine.handle(event);
        let after = self.machine.state();

        if before == after && !(is_progress && after == UploadState::Uploading) {
            debug!(event = %description, state = after.as_str(), "Event ignored");
            return;
        }

        if let Some(effect) = effect {
            self.perform(effect);
        }

        let context = self.machine.context();
        let upload_id = self.id.to_string();
        match after {
            UploadState::Uploading if is_progress => {
                debug!(
                    bytes_uploaded = context.bytes_uploaded,
                    percentage = context.percentage,
                    "Upload progress"
                );
                self.emit(TransferEvent::Progress {
                    upload_id,
                    bytes_uploaded: context.bytes_uploaded,
                    percentage: context.percentage,
                });
            }
            UploadState::Uploaded => {
                info!("Upload completed");
                self.emit(TransferEvent::Completed { upload_id });
            }
            UploadState::Aborted => {
                info!("Upload aborted");
                self.emit(TransferEvent::Aborted { upload_id });
            }
            UploadState::Error => {
                warn!(error = %context.error_message, "Upload failed");
                self.emit(TransferEvent::Failed {
                    upload_id,
                    message: context.error_message.clone(),
                });
            }
            _ => {}
        }

        self.publish();
    }

    fn perform(&mut self, effect: UploadEffect) {
        match effect {
            UploadEffect::StartTransfer => self.start_transfer(),
            UploadEffect::CancelConnection => {
                debug!(connection_id = %self.connection.id(), "Cancelling upload connection");
                self.connection.cancel();
            }
        }
    }

    fn start_transfer(&mut self) {
        let progress_tx = self.events_tx.clone();
        let config = build_upload_config(&self.file, self.url.clone())
            .on_upload_progress(move |sent, _total| {
                let _ = progress_tx.send(UploadEvent::Progress(sent));
            });

        let connection = Arc::clone(&self.connection);
        let result_tx = self.events_tx.clone();

        info!(
            connection_id = %connection.id(),
            file_size = self.file.size(),
            "Starting upload transfer"
        );
        self.emit(TransferEvent::Started {
            upload_id: self.id.to_string(),
            file_name: self.file.name().to_string(),
            file_size: self.file.size(),
        });

        self.transfer = Some(tokio::spawn(async move {
            let event = match connection.send(config).await {
                Ok(_) => UploadEvent::Uploaded,
                // The connection was cancelled from outside this process.
                Err(ConnectionError::Cancelled) => UploadEvent::Abort,
                Err(error) => UploadEvent::Error(Some(error.to_string())),
            };
            let _ = result_tx.send(event);
        }));
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Transfer(event)).ok();
        }
    }
}

impl Drop for UploadProcess {
    fn drop(&mut self) {
        if let Some(transfer) = self.transfer.take() {
            if !transfer.is_finished() && !self.machine.state().is_terminal() {
                debug!(upload_id = %self.id, "Upload process dropped with transfer in flight");
                transfer.abort();
            }
        }
    }
}
