//! # Authentication Module
//!
//! Bearer-token capability for the shell's API traffic.
//!
//! ## Overview
//!
//! The connection layer only sees the [`Authorizer`] trait. This crate also
//! ships the OpenID Connect implementation used by the shell: an in-memory
//! session that is renewed through the refresh-token grant and replaced by a
//! login redirect whenever it cannot be used.
//!
//! ## Features
//!
//! - Minimum-validity check on every authorization (default 70 seconds)
//! - Serialized refresh so concurrent requests renew once
//! - Login and logout redirects through the host `Navigator`
//! - Auth state event emission

pub mod authorizer;
pub mod error;
pub mod oauth;
pub mod types;

pub use authorizer::{Authorizer, SessionAuthorizer};
pub use error::{AuthError, Result};
pub use oauth::{OidcConfig, OidcTokenRefresher, TokenRefresher};
pub use types::{SessionTokens, TokenResponse};
