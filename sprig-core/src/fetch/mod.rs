//! Fetch/Stream Pipeline
//!
//! [`Runtime::request`] issues a framework request for a scope and applies
//! the response to the document as it streams in.
//!
//! # Lifecycle
//!
//! 1. The scope's previous request is cancelled and a fresh cancellation
//!    token is installed. `$fetching` becomes `true`.
//!
//! 2. The payload (scope data, dataset, caller data) is captured
//!    synchronously, so later writes do not leak into this request.
//!
//! 3. The request runs as a local task. Every decoded fragment is swapped in
//!    as soon as its closing tag arrives.
//!
//! 4. Failures (bad URL, transport error, non-success status) become an
//!    `error` event on the originating element with `{error, url}` detail.
//!    Relative URLs resolve against [`RuntimeConfig::base_url`]; with no base
//!    configured they fail here.
//!
//! [`RuntimeConfig::base_url`]: crate::config::RuntimeConfig::base_url
//!
//! # Cancellation
//!
//! The token is checked before every state mutation: before each fragment
//! is applied, before the error event, and before `$fetching` is cleared.
//! A superseded request therefore has no observable effect once the newer
//! request has started, and never clears the newer request's flag.

mod decoder;
pub mod payload;
mod transport;

pub use decoder::FragmentDecoder;
pub use payload::{FieldType, Payload, Schema};
pub use transport::{FetchRequest, FetchResponse, HttpTransport, Transport};

use futures_util::StreamExt;
use indexmap::IndexMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};
use url::Url;

use crate::dom::NodeId;
use crate::error::FetchError;
use crate::reactive::{Scope, WeakScope, FETCHING};
use crate::runtime::{Runtime, WeakRuntime};
use crate::value::Value;

/// Methods whose payload travels in the query string.
fn is_read_method(method: &str) -> bool {
    matches!(method, "GET" | "DELETE")
}

impl Runtime {
    /// Issue a request on behalf of `scope`, originating from `origin`.
    ///
    /// The returned handle completes when the response has been fully
    /// applied, has failed, or the request was superseded.
    pub fn request(
        &self,
        scope: &Scope,
        origin: NodeId,
        url: &str,
        method: &str,
        data: Option<Value>,
    ) -> JoinHandle<()> {
        let token = scope.renew_abort();
        scope.set(FETCHING, Value::Bool(true));

        let method = method.to_ascii_uppercase();
        let payload = Payload::collect(self, scope, origin, data.as_ref());
        let request = self.build_request(url, &method, &payload);
        debug!(url, method = %method, "request started");

        tokio::task::spawn_local(drive(
            self.downgrade(),
            scope.downgrade(),
            origin,
            url.to_string(),
            request,
            token,
        ))
    }

    fn build_request(&self, url: &str, method: &str, payload: &Payload) -> Result<FetchRequest, FetchError> {
        let config = self.config();
        let invalid = |source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        };
        let mut target = match &config.base_url {
            Some(base) => Url::parse(base).and_then(|base| base.join(url)).map_err(invalid)?,
            None => Url::parse(url).map_err(|source| match source {
                url::ParseError::RelativeUrlWithoutBase => FetchError::RelativeUrl { url: url.to_string() },
                other => invalid(other),
            })?,
        };

        let encoded = payload.to_query()?;
        let mut body = None;
        if is_read_method(method) {
            if !encoded.is_empty() {
                let query = match target.query() {
                    Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                    _ => encoded,
                };
                target.set_query(Some(&query));
            }
        } else {
            body = Some(encoded);
        }

        Ok(FetchRequest {
            url: target,
            method: method.to_string(),
            headers: vec![(config.request_header.clone(), "true".to_string())],
            body,
        })
    }
}

/// Run one request to completion.
async fn drive(
    rt: WeakRuntime,
    scope: WeakScope,
    origin: NodeId,
    url: String,
    request: Result<FetchRequest, FetchError>,
    token: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = token.cancelled() => {
            trace!(url = %url, "request superseded");
            return;
        }
        outcome = stream_into_document(&rt, request, &token) => outcome,
    };

    if token.is_cancelled() {
        return;
    }
    let Some(rt) = rt.upgrade() else {
        return;
    };

    if let Err(err) = outcome {
        error!(url = %url, %err, "request failed");
        let mut detail = IndexMap::new();
        detail.insert("error".to_string(), Value::String(err.to_string()));
        detail.insert("url".to_string(), Value::String(url.clone()));
        rt.dispatch(origin, "error", Value::Object(detail), true);
    }

    if token.is_cancelled() {
        return;
    }
    if let Some(scope) = scope.upgrade() {
        scope.set(FETCHING, Value::Bool(false));
    }
}

/// Send the request and swap every fragment in as soon as it is complete.
async fn stream_into_document(
    rt: &WeakRuntime,
    request: Result<FetchRequest, FetchError>,
    token: &CancellationToken,
) -> Result<(), FetchError> {
    let request = request?;
    let transport = match rt.upgrade() {
        Some(rt) => rt.transport(),
        None => return Ok(()),
    };

    let response = transport.send(request).await?;
    if !response.is_success() {
        let status = response.status;
        let status_text = response.status_text.clone();
        let body = response.text().await?;
        return Err(FetchError::Status {
            status,
            status_text,
            body,
        });
    }

    let mut decoder = FragmentDecoder::new();
    let mut body = response.body;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        let fragments = decoder.push(&chunk);
        if !apply(rt, token, &fragments) {
            return Ok(());
        }
    }
    apply(rt, token, &decoder.finish());
    Ok(())
}

/// Swap `fragments` in unless the request was cancelled or the runtime is
/// gone. Returns whether the request is still live.
fn apply(rt: &WeakRuntime, token: &CancellationToken, fragments: &[String]) -> bool {
    if token.is_cancelled() {
        return false;
    }
    let Some(rt) = rt.upgrade() else {
        return false;
    };
    for fragment in fragments {
        if token.is_cancelled() {
            return false;
        }
        rt.swap_html(fragment);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::dom::Document;

    fn runtime(base: Option<&str>) -> Runtime {
        let config = RuntimeConfig {
            base_url: base.map(String::from),
            ..RuntimeConfig::default()
        };
        Runtime::builder()
            .config(config)
            .build(Document::from_body_html(""))
    }

    fn payload() -> Payload {
        let mut payload = Payload::new();
        payload.merge([("q".to_string(), Value::from("a b"))]);
        payload
    }

    #[test]
    fn read_methods_append_a_query_string() {
        let rt = runtime(Some("http://example.test/app/"));
        let request = rt.build_request("search?page=2", "GET", &payload()).unwrap();
        assert_eq!(request.url.as_str(), "http://example.test/app/search?page=2&q=a+b");
        assert_eq!(request.body, None);
        assert_eq!(request.header("sp-request"), Some("true"));
    }

    #[test]
    fn write_methods_send_a_form_body() {
        let rt = runtime(None);
        let request = rt
            .build_request("http://example.test/save", "POST", &payload())
            .unwrap();
        assert_eq!(request.url.as_str(), "http://example.test/save");
        assert_eq!(request.body.as_deref(), Some("q=a+b"));
    }

    #[test]
    fn relative_url_without_base_is_rejected() {
        let rt = runtime(None);
        let err = rt.build_request("/items", "GET", &Payload::new()).unwrap_err();
        assert!(matches!(&err, FetchError::RelativeUrl { url } if url == "/items"));
        assert!(err.to_string().contains("base_url"));

        let err = rt.build_request("http://[bad", "GET", &Payload::new()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
