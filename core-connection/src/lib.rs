//! # Connection Registry
//!
//! Keyed, cancellable API connections for the application shell.
//!
//! ## Overview
//!
//! Every API call goes through a [`ConnectionEntry`] looked up by key in the
//! [`ConnectionRegistry`]. An entry owns a [`TransportClient`] configured with
//! the API base address, camelCase key normalization for JSON responses and,
//! when authentication is enabled, a bearer token on every request.
//!
//! Cancelling an entry aborts every request sent through it, including
//! uploads in progress.
//!
//! ## Errors
//!
//! All failures surface as [`ConnectionError`]. Use
//! [`ConnectionError::user_message`] for text shown to users.

pub mod client;
pub mod entry;
pub mod error;
pub mod normalize;
pub mod registry;
pub mod request;
pub mod upload;

pub use client::{
    BearerAuthorization, CamelCaseKeys, RequestInterceptor, ResponseInterceptor, TransportClient,
};
pub use entry::{ConnectionEntry, ConnectionId};
pub use error::{ConnectionError, Result, UNKNOWN_API_ERROR};
pub use registry::ConnectionRegistry;
pub use request::{ApiResponse, RequestConfig, ResponseData};
pub use upload::{build_upload_config, FileDescriptor};
