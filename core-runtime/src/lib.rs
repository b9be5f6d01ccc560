//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the shell core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Every other core crate depends on this one for its logging conventions,
//! its configuration types and the broadcast channel used to publish
//! auth, connection and transfer lifecycle events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AuthSettings, ShellConfig, ShellConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus};
