//! # Host Bridge Traits
//!
//! Capability contracts the shell core requires from its host.
//!
//! ## Overview
//!
//! The core never talks to the network, the router or the logging backend
//! directly. Each of those is a trait here, implemented per host
//! (`bridge-desktop` ships the native adapters).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt HTTP with multipart bodies and upload progress
//! - [`LocationProvider`](navigation::LocationProvider) - Current navigation location
//! - [`Navigator`](navigation::Navigator) - Login/logout redirects
//! - [`Clock`](time::Clock) - Time source for token expiry checks
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters convert
//! platform errors into it and keep the original message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! tokio tasks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod navigation;
pub mod time;

pub use error::BridgeError;

pub use http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, MultipartPart, RequestBody,
    UploadProgress,
};
pub use navigation::{Location, LocationProvider, Navigator};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
