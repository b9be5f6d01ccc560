use crate::error::{ConnectionError, Result};
use bridge_traits::http::{
    set_header, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody, UploadProgress,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Description of one API call, relative to a connection's base address.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: HttpMethod,
    /// Path relative to the base address, or an absolute URL
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
    pub upload_progress: Option<UploadProgress>,
}

impl RequestConfig {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            upload_progress: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Set a header; an existing header of the same name in another case is replaced.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, key, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Serialize `body` as the JSON request payload.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)
            .map_err(|e| ConnectionError::Serialization(e.to_string()))?;
        self.body = Some(RequestBody::Bytes(Bytes::from(encoded)));
        set_header(&mut self.headers, "Content-Type", "application/json");
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(RequestBody::Bytes(body));
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Register a `(bytes_sent, bytes_total)` callback for the request body.
    pub fn on_upload_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.upload_progress = Some(UploadProgress::new(callback));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn into_http_request(self, base_url: &Url) -> Result<HttpRequest> {
        let mut url = resolve_url(base_url, &self.url)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }

        let mut request = HttpRequest::new(self.method, url.to_string());
        request.headers = self.headers;
        request.body = self.body;
        request.timeout = self.timeout;
        request.upload_progress = self.upload_progress;
        Ok(request)
    }
}

/// `scheme://...` or protocol-relative `//host/...`
fn is_absolute(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }

    match url.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Join `url` onto `base_url`.
///
/// Relative paths are appended to the base path with exactly one `/`
/// between them, so `https://api/v1` + `/jobs` is `https://api/v1/jobs`.
/// Absolute URLs are used unchanged.
pub fn resolve_url(base_url: &Url, url: &str) -> Result<Url> {
    let joined = if is_absolute(url) {
        if url.starts_with("//") {
            format!("{}:{}", base_url.scheme(), url)
        } else {
            url.to_string()
        }
    } else if url.is_empty() {
        base_url.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    };

    Url::parse(&joined).map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", joined, e)))
}

pub(crate) const JSON_MEDIA_TYPE: &str = "application/json";

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Json(Value),
    Raw(Bytes),
}

impl ResponseData {
    /// JSON only for `application/json` bodies that parse; every other body
    /// is kept byte-for-byte.
    pub fn decode(body: Bytes, media_type: Option<&str>) -> Self {
        if media_type != Some(JSON_MEDIA_TYPE) {
            return ResponseData::Raw(body);
        }
        Self::decode_lenient(body)
    }

    /// JSON whenever the body parses, regardless of content type. Used for
    /// error bodies.
    pub fn decode_lenient(body: Bytes) -> Self {
        if body.is_empty() {
            return ResponseData::Raw(body);
        }

        match serde_json::from_slice(&body) {
            Ok(value) => ResponseData::Json(value),
            Err(_) => ResponseData::Raw(body),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            ResponseData::Raw(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::Raw(bytes) => Some(bytes),
            ResponseData::Json(_) => None,
        }
    }
}

/// Successful API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub data: ResponseData,
}

impl ApiResponse {
    pub(crate) fn from_http(response: HttpResponse) -> Self {
        let media_type = response.media_type();
        Self {
            status: response.status,
            data: ResponseData::decode(response.body, media_type.as_deref()),
            headers: response.headers,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Lowercased media type without parameters.
    pub fn media_type(&self) -> Option<String> {
        self.header("content-type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Deserialize the JSON payload.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.data {
            ResponseData::Json(value) => T::deserialize(value)
                .map_err(|e| ConnectionError::Serialization(e.to_string())),
            ResponseData::Raw(_) => Err(ConnectionError::Serialization(
                "Response body is not JSON".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.example.com/v1").unwrap()
    }

    #[test]
    fn test_resolve_relative_paths() {
        assert_eq!(
            resolve_url(&base(), "/jobs/7").unwrap().as_str(),
            "https://api.example.com/v1/jobs/7"
        );
        assert_eq!(
            resolve_url(&base(), "jobs").unwrap().as_str(),
            "https://api.example.com/v1/jobs"
        );

        let trailing = Url::parse("https://api.example.com/v1/").unwrap();
        assert_eq!(
            resolve_url(&trailing, "/jobs").unwrap().as_str(),
            "https://api.example.com/v1/jobs"
        );
        assert_eq!(resolve_url(&trailing, "").unwrap(), trailing);
    }

    #[test]
    fn test_resolve_absolute_urls() {
        assert_eq!(
            resolve_url(&base(), "https://files.example.com/upload").unwrap().as_str(),
            "https://files.example.com/upload"
        );
        assert_eq!(
            resolve_url(&base(), "//cdn.example.com/a.csv").unwrap().as_str(),
            "https://cdn.example.com/a.csv"
        );
    }

    #[test]
    fn test_into_http_request_appends_query() {
        let request = RequestConfig::get("/jobs")
            .query("status", "running")
            .query("q", "a b")
            .header("X-Trace", "1")
            .into_http_request(&base())
            .unwrap();

        assert_eq!(
            request.url,
            "https://api.example.com/v1/jobs?status=running&q=a+b"
        );
        assert_eq!(request.header_value("x-trace"), Some("1"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_json_body() {
        let config = RequestConfig::post("/jobs")
            .json(&serde_json::json!({ "name": "import" }))
            .unwrap();

        assert_eq!(config.header_value("content-type"), Some("application/json"));
        assert_eq!(
            config.body,
            Some(RequestBody::Bytes(Bytes::from_static(br#"{"name":"import"}"#)))
        );
    }

    #[test]
    fn test_response_data_decode_follows_media_type() {
        assert_eq!(
            ResponseData::decode(Bytes::from_static(br#"{"a":1}"#), Some("application/json")),
            ResponseData::Json(serde_json::json!({ "a": 1 }))
        );
        assert_eq!(
            ResponseData::decode(Bytes::from_static(br#"{"a":1}"#), Some("text/plain")),
            ResponseData::Raw(Bytes::from_static(br#"{"a":1}"#))
        );
        assert_eq!(
            ResponseData::decode(Bytes::from_static(br#"{"a":1}"#), None),
            ResponseData::Raw(Bytes::from_static(br#"{"a":1}"#))
        );
        assert_eq!(
            ResponseData::decode(Bytes::from_static(b"not json"), Some("application/json")),
            ResponseData::Raw(Bytes::from_static(b"not json"))
        );
        assert_eq!(
            ResponseData::decode(Bytes::new(), Some("application/json")),
            ResponseData::Raw(Bytes::new())
        );
    }

    #[test]
    fn test_response_data_decode_lenient() {
        assert_eq!(
            ResponseData::decode_lenient(Bytes::from_static(br#"{"detail":"x"}"#)),
            ResponseData::Json(serde_json::json!({ "detail": "x" }))
        );
        assert_eq!(
            ResponseData::decode_lenient(Bytes::from_static(b"plain text")),
            ResponseData::Raw(Bytes::from_static(b"plain text"))
        );
    }

    #[test]
    fn test_api_response_json() {
        #[derive(serde::Deserialize)]
        struct Job {
            id: u32,
        }

        let response = ApiResponse {
            status: 200,
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )]),
            data: ResponseData::Json(serde_json::json!({ "id": 9 })),
        };

        assert_eq!(response.media_type().as_deref(), Some("application/json"));
        assert_eq!(response.json::<Job>().unwrap().id, 9);
    }
}
