//! Upload state machine
//!
//! Pure transition table with no I/O. The driver in [`crate::process`] feeds
//! events in and performs the returned [`UploadEffect`]s.
//!
//! ```text
//!            RESUME
//!   idle ───────────▶ uploading ──UPLOADED──▶ uploaded
//!                      │  ▲  │
//!             PROGRESS └──┘  ├──ABORT──▶ aborted
//!                            └──ERROR──▶ error
//! ```
//!
//! Events that have no entry for the current state are ignored; terminal
//! states accept nothing.

use serde::{Deserialize, Serialize};

/// Message recorded when a user aborts an upload.
pub const CANCELED_MESSAGE: &str = "canceled";
/// Message recorded when a failure carries no description.
pub const DEFAULT_ERROR_MESSAGE: &str = "Upload error";
/// Highest percentage reported before the transfer is confirmed.
pub const MAX_IN_FLIGHT_PERCENTAGE: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Idle,
    Uploading,
    Uploaded,
    Aborted,
    Error,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UploadState::Uploaded | UploadState::Aborted | UploadState::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Uploading => "uploading",
            UploadState::Uploaded => "uploaded",
            UploadState::Aborted => "aborted",
            UploadState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Cumulative bytes sent so far
    Progress(u64),
    Uploaded,
    /// Transfer failure, with its message when one is available
    Error(Option<String>),
    Abort,
    Resume,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEffect {
    /// Invoke the transport for the file.
    StartTransfer,
    /// Trigger the connection's cancellation handle.
    CancelConnection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadContext {
    pub file_name: String,
    pub file_size: u64,
    pub bytes_uploaded: u64,
    pub percentage: u8,
    pub error_message: String,
}

impl UploadContext {
    fn new(file_name: String, file_size: u64) -> Self {
        Self {
            file_name,
            file_size,
            bytes_uploaded: 0,
            percentage: 0,
            error_message: String::new(),
        }
    }
}

/// `round(bytes * 100 / size)`, capped at 99. An empty file reports 0.
pub fn in_flight_percentage(bytes_uploaded: u64, file_size: u64) -> u8 {
    if file_size == 0 {
        return 0;
    }

    let bytes = u128::from(bytes_uploaded);
    let size = u128::from(file_size);
    // Half rounds up.
    let rounded = (bytes * 200 + size) / (size * 2);

    rounded.min(u128::from(MAX_IN_FLIGHT_PERCENTAGE)) as u8
}

#[derive(Debug, Clone)]
pub struct UploadMachine {
    state: UploadState,
    context: UploadContext,
}

impl UploadMachine {
    /// Machine starting in `uploading`.
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            state: UploadState::Uploading,
            context: UploadContext::new(file_name.into(), file_size),
        }
    }

    /// Machine starting in `idle`, waiting for [`UploadEvent::Resume`].
    pub fn paused(file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            state: UploadState::Idle,
            context: UploadContext::new(file_name.into(), file_size),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn context(&self) -> &UploadContext {
        &self.context
    }

    /// Entry action of the initial state.
    pub fn initial_effect(&self) -> Option<UploadEffect> {
        (self.state == UploadState::Uploading).then_some(UploadEffect::StartTransfer)
    }

    /// Apply `event`. Returns the effect the caller must perform, if any.
    pub fn handle(&mut self, event: UploadEvent) -> Option<UploadEffect> {
        match (self.state, event) {
            (UploadState::Uploading, UploadEvent::Progress(bytes)) => {
                let bytes = bytes.min(self.context.file_size);
                self.context.bytes_uploaded = self.context.bytes_uploaded.max(bytes);
                self.context.percentage =
                    in_flight_percentage(self.context.bytes_uploaded, self.context.file_size);
                None
            }
            (UploadState::Uploading, UploadEvent::Uploaded) => {
                self.state = UploadState::Uploaded;
                self.context.percentage = 100;
                None
            }
            (UploadState::Uploading, UploadEvent::Error(message)) => {
                self.state = UploadState::Error;
                self.context.error_message = message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
                None
            }
            (UploadState::Uploading, UploadEvent::Abort) => {
                self.state = UploadState::Aborted;
                self.context.error_message = CANCELED_MESSAGE.to_string();
                Some(UploadEffect::CancelConnection)
            }
            (UploadState::Idle, UploadEvent::Resume) => {
                self.state = UploadState::Uploading;
                Some(UploadEffect::StartTransfer)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_states() {
        let machine = UploadMachine::new("a.csv", 1000);
        assert_eq!(machine.state(), UploadState::Uploading);
        assert_eq!(machine.initial_effect(), Some(UploadEffect::StartTransfer));

        let paused = UploadMachine::paused("a.csv", 1000);
        assert_eq!(paused.state(), UploadState::Idle);
        assert_eq!(paused.initial_effect(), None);
        assert_eq!(paused.context().percentage, 0);
        assert!(paused.context().error_message.is_empty());
    }

    #[test]
    fn test_progress_percentage_is_capped() {
        let mut machine = UploadMachine::new("a.csv", 1000);

        assert_eq!(machine.handle(UploadEvent::Progress(500)), None);
        assert_eq!(machine.context().percentage, 50);
        assert_eq!(machine.context().bytes_uploaded, 500);

        machine.handle(UploadEvent::Progress(1000));
        assert_eq!(machine.state(), UploadState::Uploading);
        assert_eq!(machine.context().percentage, 99);

        machine.handle(UploadEvent::Uploaded);
        assert_eq!(machine.state(), UploadState::Uploaded);
        assert_eq!(machine.context().percentage, 100);
        assert!(machine.context().error_message.is_empty());
    }

    #[test]
    fn test_uploaded_forces_full_percentage_without_progress() {
        let mut machine = UploadMachine::new("a.csv", 1000);
        machine.handle(UploadEvent::Progress(120));
        machine.handle(UploadEvent::Uploaded);

        assert_eq!(machine.context().percentage, 100);
        assert_eq!(machine.context().bytes_uploaded, 120);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(in_flight_percentage(0, 1000), 0);
        assert_eq!(in_flight_percentage(4, 1000), 0);
        assert_eq!(in_flight_percentage(5, 1000), 1);
        assert_eq!(in_flight_percentage(1, 3), 33);
        assert_eq!(in_flight_percentage(2, 3), 67);
        assert_eq!(in_flight_percentage(985, 1000), 99);
        assert_eq!(in_flight_percentage(u64::MAX, u64::MAX), 99);
        assert_eq!(in_flight_percentage(0, 0), 0);
    }

    #[test]
    fn test_bytes_uploaded_is_monotonic_and_bounded() {
        let mut machine = UploadMachine::new("a.csv", 1000);
        machine.handle(UploadEvent::Progress(600));
        machine.handle(UploadEvent::Progress(400));
        assert_eq!(machine.context().bytes_uploaded, 600);
        assert_eq!(machine.context().percentage, 60);

        machine.handle(UploadEvent::Progress(5000));
        assert_eq!(machine.context().bytes_uploaded, 1000);
    }

    #[test]
    fn test_abort_requests_cancellation() {
        let mut machine = UploadMachine::new("a.csv", 1000);
        machine.handle(UploadEvent::Progress(300));

        assert_eq!(
            machine.handle(UploadEvent::Abort),
            Some(UploadEffect::CancelConnection)
        );
        assert_eq!(machine.state(), UploadState::Aborted);
        assert_eq!(machine.context().error_message, CANCELED_MESSAGE);

        // A second abort does nothing.
        assert_eq!(machine.handle(UploadEvent::Abort), None);
    }

    #[test]
    fn test_error_message() {
        let mut machine = UploadMachine::new("a.csv", 1000);
        machine.handle(UploadEvent::Error(Some("Network error: reset".to_string())));
        assert_eq!(machine.state(), UploadState::Error);
        assert_eq!(machine.context().error_message, "Network error: reset");

        let mut machine = UploadMachine::new("a.csv", 1000);
        machine.handle(UploadEvent::Error(None));
        assert_eq!(machine.context().error_message, DEFAULT_ERROR_MESSAGE);

        let mut machine = UploadMachine::new("a.csv", 1000);
        machine.handle(UploadEvent::Error(Some(String::new())));
        assert_eq!(machine.context().error_message, DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_terminal_states_ignore_everything() {
        let events = [
            UploadEvent::Progress(10),
            UploadEvent::Uploaded,
            UploadEvent::Error(None),
            UploadEvent::Abort,
            UploadEvent::Resume,
        ];

        for terminal_event in [UploadEvent::Uploaded, UploadEvent::Abort, UploadEvent::Error(None)] {
            let mut machine = UploadMachine::new("a.csv", 1000);
            machine.handle(terminal_event);
            let state = machine.state();
            let context = machine.context().clone();
            assert!(state.is_terminal());

            for event in events.iter().cloned() {
                assert_eq!(machine.handle(event), None);
                assert_eq!(machine.state(), state);
                assert_eq!(machine.context(), &context);
            }
        }
    }

    #[test]
    fn test_idle_only_accepts_resume() {
        let mut machine = UploadMachine::paused("a.csv", 1000);

        for event in [
            UploadEvent::Progress(10),
            UploadEvent::Uploaded,
            UploadEvent::Error(None),
            UploadEvent::Abort,
        ] {
            assert_eq!(machine.handle(event), None);
            assert_eq!(machine.state(), UploadState::Idle);
        }
        assert_eq!(machine.context().bytes_uploaded, 0);

        assert_eq!(
            machine.handle(UploadEvent::Resume),
            Some(UploadEffect::StartTransfer)
        );
        assert_eq!(machine.state(), UploadState::Uploading);
    }

    #[test]
    fn test_resume_while_uploading_is_ignored() {
        let mut machine = UploadMachine::new("a.csv", 1000);
        assert_eq!(machine.handle(UploadEvent::Resume), None);
        assert_eq!(machine.state(), UploadState::Uploading);
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&UploadState::Uploaded).unwrap(),
            "\"uploaded\""
        );

        let context = UploadMachine::new("a.csv", 10).context().clone();
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["fileName"], "a.csv");
        assert_eq!(json["bytesUploaded"], 0);
        assert_eq!(json["errorMessage"], "");
    }
}
