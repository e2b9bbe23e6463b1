//! Request transport.
//!
//! The pipeline talks to the network through the [`Transport`] trait so
//! hosts and tests can substitute their own. [`HttpTransport`] is the real
//! one, built on `reqwest` with a streamed response body.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, LocalBoxStream};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use url::Url;

use crate::error::FetchError;

/// An outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: Url,
    pub method: String,
    pub headers: Vec<(String, String)>,
    /// Form-encoded body for write-style methods.
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response whose body arrives as a stream of chunks.
pub struct FetchResponse {
    pub status: u16,
    pub status_text: String,
    pub body: LocalBoxStream<'static, Result<Bytes, FetchError>>,
}

impl FetchResponse {
    /// A response with the whole body available at once.
    pub fn from_text(status: u16, status_text: &str, text: &str) -> Self {
        let chunk = Bytes::copy_from_slice(text.as_bytes());
        Self {
            status,
            status_text: status_text.to_string(),
            body: stream::iter([Ok(chunk)]).boxed_local(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into a string.
    pub async fn text(self) -> Result<String, FetchError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let bytes: Vec<u8> = chunks.concat();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Sends framework requests.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn send(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        Ok(FetchResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: response.bytes_stream().map_err(FetchError::from).boxed_local(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn whole_text_responses_drain_to_the_same_text() {
        let response = FetchResponse::from_text(404, "Not Found", "missing");
        assert!(!response.is_success());
        assert_eq!(response.text().await.unwrap(), "missing");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = FetchRequest {
            url: Url::parse("http://example.test/").unwrap(),
            method: "GET".to_string(),
            headers: vec![("sp-request".to_string(), "true".to_string())],
            body: None,
        };
        assert_eq!(request.header("SP-Request"), Some("true"));
    }
}
