//! Per-connection transport client
//!
//! A [`TransportClient`] binds a base address, a cancellation handle and an
//! ordered set of interceptors to the host [`HttpClient`]. Every request runs
//! through the same pipeline:
//!
//! 1. refuse immediately if the cancellation handle is spent
//! 2. resolve the URL against the base address
//! 3. request interceptors, in registration order
//! 4. transport call, raced against cancellation
//! 5. non-2xx responses become [`ConnectionError::Status`]
//! 6. response interceptors, in registration order

use crate::error::{ConnectionError, Result};
use crate::normalize::camelize_keys;
use crate::request::{ApiResponse, RequestConfig, ResponseData};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::navigation::LocationProvider;
use core_auth::Authorizer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

/// Rewrites outgoing requests before they reach the transport.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest>;
}

/// Rewrites successful responses before they reach the caller.
pub trait ResponseInterceptor: Send + Sync {
    fn intercept(&self, response: ApiResponse) -> ApiResponse;
}

/// Attaches `Authorization: Bearer <token>` to every request.
///
/// The token is resolved per request for the current location, so an expired
/// session sends the user back to the page they were on.
pub struct BearerAuthorization {
    authorizer: Arc<dyn Authorizer>,
    location: Arc<dyn LocationProvider>,
}

impl BearerAuthorization {
    pub fn new(authorizer: Arc<dyn Authorizer>, location: Arc<dyn LocationProvider>) -> Self {
        Self {
            authorizer,
            location,
        }
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuthorization {
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest> {
        let redirect_uri = self.location.current().href;
        let token = self
            .authorizer
            .authorize(&redirect_uri)
            .await
            .map_err(ConnectionError::Unauthorized)?;

        Ok(request.bearer_token(token))
    }
}

/// Converts JSON payload keys to camelCase at every depth.
///
/// Only `application/json` responses are decoded to [`ResponseData::Json`];
/// raw payloads pass through byte-identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCaseKeys;

impl ResponseInterceptor for CamelCaseKeys {
    fn intercept(&self, mut response: ApiResponse) -> ApiResponse {
        if let ResponseData::Json(value) = response.data {
            response.data = ResponseData::Json(camelize_keys(value));
        }
        response
    }
}

#[derive(Clone)]
pub struct TransportClient {
    base_url: Url,
    http_client: Arc<dyn HttpClient>,
    cancel: CancellationToken,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl TransportClient {
    pub fn new(base_url: Url, http_client: Arc<dyn HttpClient>, cancel: CancellationToken) -> Self {
        Self {
            base_url,
            http_client,
            cancel,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    pub fn with_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[instrument(skip(self, config), fields(method = %config.method, url = %config.url))]
    pub async fn send(&self, config: RequestConfig) -> Result<ApiResponse> {
        if self.cancel.is_cancelled() {
            debug!("Connection already cancelled");
            return Err(ConnectionError::Cancelled);
        }

        let request = config.into_http_request(&self.base_url)?;

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Request cancelled");
                return Err(ConnectionError::Cancelled);
            }
            result = self.dispatch(request) => result?,
        };

        if !response.is_success() {
            warn!(status = response.status, "API request failed");
            return Err(ConnectionError::Status {
                status: response.status,
                body: ResponseData::decode_lenient(response.body),
            });
        }

        debug!(status = response.status, "API request succeeded");

        let response = self
            .response_interceptors
            .iter()
            .fold(ApiResponse::from_http(response), |response, interceptor| {
                interceptor.intercept(response)
            });

        Ok(response)
    }

    async fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        for interceptor in &self.request_interceptors {
            request = interceptor.intercept(request).await?;
        }

        Ok(self.http_client.execute(request).await?)
    }
}
