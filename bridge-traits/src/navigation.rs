//! Navigation Abstraction
//!
//! The core never owns routing. It only needs to know where the user currently
//! is (to derive default connection keys and login return addresses) and a way
//! to send the user somewhere else (login/logout redirects).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BridgeError, Result};

/// Snapshot of the host application's current location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Full absolute address, including query and fragment
    pub href: String,
    /// Path component only (e.g. `/projects/42`)
    pub pathname: String,
}

impl Location {
    /// Build a location from an absolute address.
    ///
    /// # Errors
    ///
    /// Returns an error if `href` is not an absolute URL.
    pub fn parse(href: &str) -> Result<Self> {
        let url = Url::parse(href)
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid location '{}': {}", href, e)))?;
        Ok(Self::from(&url))
    }
}

impl From<&Url> for Location {
    fn from(url: &Url) -> Self {
        Self {
            href: url.to_string(),
            pathname: url.path().to_string(),
        }
    }
}

/// Current-location source
///
/// - **Desktop**: the host router pushes updates into a shared cell
/// - **Web**: `window.location`
pub trait LocationProvider: Send + Sync {
    fn current(&self) -> Location;
}

/// Host navigation side effects
///
/// Used for login and logout redirects. Implementations typically open a
/// browser window or replace the current page.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &Url) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse() {
        let location = Location::parse("https://app.example.com/jobs/7?tab=files#top").unwrap();

        assert_eq!(location.pathname, "/jobs/7");
        assert_eq!(location.href, "https://app.example.com/jobs/7?tab=files#top");
    }

    #[test]
    fn test_location_parse_rejects_relative() {
        assert!(Location::parse("/jobs/7").is_err());
    }
}
