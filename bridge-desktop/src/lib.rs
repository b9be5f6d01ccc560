//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with streamed multipart bodies so upload
//!   progress can be observed
//! - `LocationProvider` backed by a cell the host router writes to
//! - `Navigator` that forwards redirect targets to the host UI
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ChannelNavigator, ReqwestHttpClient, RouterLocation};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let location = RouterLocation::parse("https://app.example.com/").unwrap();
//!     let (navigator, mut redirects) = ChannelNavigator::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod http;
mod navigation;

pub use http::{ReqwestHttpClient, DEFAULT_USER_AGENT};
pub use navigation::{ChannelNavigator, RouterLocation};
