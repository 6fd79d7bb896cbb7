//! Reqwest-backed remote client for one library microservice.
//!
//! This adapter owns transport details only: URL joining, the request timeout,
//! HTTP status mapping and JSON decoding. Every wire shape above raw JSON is
//! left to the entity codecs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{RemoteClient, RemoteClientError};

/// Remote client talking JSON over HTTP to a single service base URL.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    client: Client,
    base: Url,
}

impl HttpRemoteClient {
    /// Build a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    /// Service base URL every path is joined onto.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, RemoteClientError> {
        let joined = join_path(&self.base, path);
        Url::parse(&joined)
            .map_err(|error| RemoteClientError::transport(format!("invalid url {joined}: {error}")))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, RemoteClientError> {
        let url = self.url(path)?;
        debug!(%method, %url, "remote request");
        let mut request = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|error| map_transport_error(&error))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| map_transport_error(&error))?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }
        parse_body(bytes.as_ref())
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn get(&self, path: &str) -> Result<Value, RemoteClientError> {
        self.send(Method::GET, path, None).await
    }

    async fn list(&self, path: &str) -> Result<Vec<Value>, RemoteClientError> {
        let body = self.send(Method::GET, path, None).await?;
        into_items(body)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, RemoteClientError> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, RemoteClientError> {
        self.send(Method::PUT, path, Some(body)).await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Value, RemoteClientError> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteClientError> {
        self.send(Method::DELETE, path, None).await.map(drop)
    }
}

/// Append `path` to the base without dropping the base's own path segments.
fn join_path(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    match path.trim_start_matches('/') {
        "" => base.to_owned(),
        rest => format!("{base}/{rest}"),
    }
}

/// Decode a success body. An empty body is `Value::Null`.
fn parse_body(body: &[u8]) -> Result<Value, RemoteClientError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|error| RemoteClientError::decode(format!("invalid JSON payload: {error}")))
}

/// Accept a bare array or a page object carrying `content`.
fn into_items(body: Value) -> Result<Vec<Value>, RemoteClientError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut page) => match page.remove("content") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RemoteClientError::decode("expected an array or a page with content")),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(RemoteClientError::decode(format!(
            "expected an array, got {other}"
        ))),
    }
}

fn map_transport_error(error: &reqwest::Error) -> RemoteClientError {
    if error.is_timeout() {
        RemoteClientError::timeout(error.to_string())
    } else if error.is_decode() {
        RemoteClientError::decode(error.to_string())
    } else {
        RemoteClientError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RemoteClientError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };
    RemoteClientError::status(status.as_u16(), message)
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
