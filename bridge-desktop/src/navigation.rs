//! Navigation adapters for desktop hosts
//!
//! Desktop shells own their router. They push every route change into a
//! [`RouterLocation`] and pick up redirect requests from a [`ChannelNavigator`].

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    navigation::{Location, LocationProvider, Navigator},
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

/// Shared cell holding the host router's current location
#[derive(Debug, Clone)]
pub struct RouterLocation {
    inner: Arc<RwLock<Location>>,
}

impl RouterLocation {
    pub fn new(initial: Location) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Parse `href` and use it as the starting location.
    pub fn parse(href: &str) -> Result<Self> {
        Location::parse(href).map(Self::new)
    }

    /// Record a route change.
    pub fn set(&self, location: Location) {
        debug!(pathname = %location.pathname, "Router location changed");
        *self.inner.write() = location;
    }
}

impl LocationProvider for RouterLocation {
    fn current(&self) -> Location {
        self.inner.read().clone()
    }
}

/// Navigator that hands redirect targets to the host UI over a channel
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Url>,
}

impl ChannelNavigator {
    /// Returns the navigator and the receiving end the host UI listens on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Url>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Navigator for ChannelNavigator {
    async fn navigate(&self, url: &Url) -> Result<()> {
        debug!(url = %url, "Forwarding navigation request to host");
        self.tx
            .send(url.clone())
            .map_err(|_| BridgeError::NotAvailable("navigation receiver dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_location_updates() {
        let router = RouterLocation::parse("https://app.example.com/home").unwrap();
        assert_eq!(router.current().pathname, "/home");

        router.set(Location::parse("https://app.example.com/jobs/3").unwrap());
        assert_eq!(router.current().pathname, "/jobs/3");
    }

    #[tokio::test]
    async fn test_channel_navigator_forwards() {
        let (navigator, mut rx) = ChannelNavigator::new();
        let target = Url::parse("https://auth.example.com/login").unwrap();

        navigator.navigate(&target).await.unwrap();
        assert_eq!(rx.recv().await, Some(target));
    }

    #[tokio::test]
    async fn test_channel_navigator_closed_receiver() {
        let (navigator, rx) = ChannelNavigator::new();
        drop(rx);

        let target = Url::parse("https://auth.example.com/login").unwrap();
        assert!(matches!(
            navigator.navigate(&target).await,
            Err(BridgeError::NotAvailable(_))
        ));
    }
}
