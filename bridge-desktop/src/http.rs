//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{
        HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody,
        UploadProgress,
    },
};
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use reqwest::{multipart, Body, Client};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "shell-core/0.1.0";

/// Size of the slices a body is cut into when progress is reported
const PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - TLS support by default
/// - Upload progress for streamed bodies
///
/// Only a connect timeout is configured on the underlying client. A total
/// request timeout would abort large uploads, so it is applied per request
/// and only when the request asks for one.
pub struct ReqwestHttpClient {
    client: Client,
    chunk_size: usize,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new HTTP client with a custom user agent
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(user_agent)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            chunk_size: PROGRESS_CHUNK_SIZE,
        }
    }

    /// Override the slice size used when reporting upload progress
    pub fn with_progress_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);
        let is_multipart = matches!(request.body, Some(RequestBody::Multipart(_)));

        for (key, value) in request.headers {
            // reqwest writes its own multipart content type carrying the boundary
            if is_multipart && key.eq_ignore_ascii_case("content-type") {
                continue;
            }
            req = req.header(key, value);
        }

        match request.body {
            Some(RequestBody::Bytes(body)) => {
                req = match request.upload_progress {
                    Some(progress) => {
                        let total = body.len() as u64;
                        let sent = Arc::new(AtomicU64::new(0));
                        req.body(Body::wrap_stream(progress_stream(
                            body,
                            self.chunk_size,
                            progress,
                            sent,
                            total,
                        )))
                    }
                    None => req.body(body),
                };
            }
            Some(RequestBody::Multipart(form)) => {
                let form = self.build_multipart(form, request.upload_progress)?;
                req = req.multipart(form);
            }
            None => {}
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        Ok(req)
    }

    fn build_multipart(
        &self,
        form: MultipartForm,
        progress: Option<UploadProgress>,
    ) -> Result<multipart::Form> {
        let total = form.payload_len();
        let sent = Arc::new(AtomicU64::new(0));
        let mut out = multipart::Form::new();

        for part in form.parts {
            let len = part.data.len() as u64;
            let mut field = match &progress {
                Some(progress) => multipart::Part::stream_with_length(
                    Body::wrap_stream(progress_stream(
                        part.data,
                        self.chunk_size,
                        progress.clone(),
                        Arc::clone(&sent),
                        total,
                    )),
                    len,
                ),
                None => multipart::Part::bytes(part.data.to_vec()),
            };

            if let Some(file_name) = part.file_name {
                field = field.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                field = field.mime_str(&content_type).map_err(|e| {
                    BridgeError::OperationFailed(format!("Invalid part content type: {}", e))
                })?;
            }

            out = out.part(part.name, field);
        }

        Ok(out)
    }

    fn convert_error(error: reqwest::Error) -> BridgeError {
        if error.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if error.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", error))
        } else {
            BridgeError::OperationFailed(error.to_string())
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Slice `data` and report cumulative bytes as the transport pulls each slice.
fn progress_stream(
    data: Bytes,
    chunk_size: usize,
    progress: UploadProgress,
    sent: Arc<AtomicU64>,
    total: u64,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect();

    stream::iter(chunks).map(move |chunk| {
        let len = chunk.len() as u64;
        let so_far = sent.fetch_add(len, Ordering::SeqCst) + len;
        progress.report(so_far, total);
        Ok(chunk)
    })
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();

        debug!(method = %method, url = %url, "Executing HTTP request");

        let response = self.build_request(request)?.send().await.map_err(|e| {
            warn!(error = %e, method = %method, url = %url, "HTTP request failed");
            Self::convert_error(e)
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response.bytes().await.map_err(Self::convert_error)?;

        debug!(status, url = %url, bytes = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
