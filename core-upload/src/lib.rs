//! # Upload Orchestration
//!
//! Drives single-file uploads through an explicit state machine.
//!
//! ## Overview
//!
//! - [`machine`]: the pure transition table ([`UploadMachine`])
//! - [`process`]: the async driver ([`UploadProcess`]) and the caller-side
//!   [`UploadHandle`]
//! - [`list`]: the collection of uploads a view displays ([`UploadList`])
//!
//! ## Usage
//!
//! ```ignore
//! use core_upload::UploadProcess;
//!
//! let connection = registry.get("/projects/3");
//! let (process, handle) = UploadProcess::new(connection, file, "/projects/3/files");
//! process.spawn();
//!
//! let mut updates = handle.subscribe();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow().clone();
//!     println!("{}%", snapshot.context.percentage);
//! }
//! ```

pub mod error;
pub mod list;
pub mod machine;
pub mod process;

pub use error::{Result, UploadError};
pub use list::UploadList;
pub use machine::{UploadContext, UploadEffect, UploadEvent, UploadMachine, UploadState};
pub use process::{UploadHandle, UploadId, UploadProcess, UploadSnapshot};
