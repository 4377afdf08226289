//! Connection provider contract and the default reqwest-backed transport

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// HTTP method of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Transport-agnostic request descriptor, assembled once per call.
///
/// Behaviors may mutate the descriptor between assembly and dispatch.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    /// Method of the request
    pub method: HttpMethod,
    /// Base address for the request
    pub base_address: Url,
    /// Relative URI for the request
    pub relative_uri: String,
    /// Optional serialized body for PUT or POST requests
    pub content: Option<String>,
    /// Accept headers (application/json = default)
    pub header_accept_content_types: Vec<String>,
    /// Accept-encoding headers (utf-8 = default)
    pub header_accept_encodings: Vec<String>,
}

impl ConnectionRequest {
    /// Creates a new request descriptor with the default accept headers.
    pub fn new(
        method: HttpMethod,
        base_address: Url,
        relative_uri: String,
        content: Option<String>,
    ) -> Self {
        Self {
            method,
            base_address,
            relative_uri,
            content,
            header_accept_content_types: vec!["application/json".to_string()],
            header_accept_encodings: vec!["utf-8".to_string()],
        }
    }
}

/// Outcome of a single transport exchange.
#[derive(Debug, Clone)]
pub struct ConnectionRequestResponse {
    /// True when the call is a success
    pub is_success: bool,
    /// Status code of the response
    pub status_code: u16,
    /// Raw response body, present only on success
    pub response_string: Option<String>,
    /// Response body or transport error text, present only on failure
    pub error_reason: Option<String>,
}

/// Failure channel of a connection provider.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// The cancellation token fired before the exchange completed
    #[error("the request was cancelled before completion")]
    Cancelled,

    /// Any transport-level failure other than cancellation
    #[error("transport error: {0}")]
    Transport(String),
}

/// Factory invoked once per execution to obtain the transport client.
///
/// The argument is the provider's current `has_handlers` flag. Returning
/// `None` keeps whatever client is already installed for this call.
pub type ClientFactory = Box<dyn Fn(bool) -> Option<reqwest::Client> + Send + Sync>;

/// Replaceable transport abstraction used by the request builder.
///
/// Implementations perform exactly one network exchange per
/// [`process_request`](ConnectionProvider::process_request) call; retries and
/// connection management are out of scope.
#[async_trait]
pub trait ConnectionProvider: Send {
    /// True when a behavior has installed a customized client for this call.
    fn has_handlers(&self) -> bool;

    /// Marks whether a customized client is installed, preventing a later
    /// behavior from wrapping the client a second time.
    fn set_has_handlers(&mut self, has_handlers: bool);

    /// Replaces the factory used to obtain the transport client.
    fn set_client_factory(&mut self, factory: ClientFactory);

    /// Assembles a transport request. Pure assembly, no I/O happens here.
    fn create_request(
        &self,
        method: HttpMethod,
        base_address: &Url,
        relative_uri: &str,
        content: Option<String>,
    ) -> ConnectionRequest {
        ConnectionRequest::new(method, base_address.clone(), relative_uri.to_string(), content)
    }

    /// Applies the request's accept lists onto `headers`, replacing any
    /// values configured earlier.
    fn configure_headers(&self, request: &ConnectionRequest, headers: &mut HeaderMap) {
        headers.remove(ACCEPT);
        for content_type in &request.header_accept_content_types {
            if let Ok(value) = HeaderValue::from_str(content_type) {
                headers.append(ACCEPT, value);
            }
        }

        headers.remove(ACCEPT_ENCODING);
        for encoding in &request.header_accept_encodings {
            if let Ok(value) = HeaderValue::from_str(encoding) {
                headers.append(ACCEPT_ENCODING, value);
            }
        }
    }

    /// Performs the network exchange for exactly one request.
    ///
    /// The body is read only on success; on failure a textual error reason is
    /// captured instead. A token firing mid-flight must surface as
    /// [`ConnectionError::Cancelled`] so the caller can classify it as a
    /// timeout rather than a generic failure.
    async fn process_request(
        &mut self,
        request: &ConnectionRequest,
        token: &CancellationToken,
    ) -> Result<ConnectionRequestResponse, ConnectionError>;
}

/// Default provider wrapping a `reqwest::Client`.
pub struct ReqwestConnectionProvider {
    client_factory: ClientFactory,
    client: Option<reqwest::Client>,
    has_handlers: bool,
}

impl ReqwestConnectionProvider {
    /// Creates a provider with a plain-client factory.
    pub fn new() -> Self {
        Self {
            client_factory: Box::new(|_| Some(reqwest::Client::new())),
            client: None,
            has_handlers: false,
        }
    }

    /// Runs the factory and caches its product. A factory returning `None`
    /// keeps the client already installed for this call.
    fn obtain_client(&mut self) -> reqwest::Client {
        if let Some(client) = (self.client_factory)(self.has_handlers) {
            self.client = Some(client);
        }
        self.client.get_or_insert_with(reqwest::Client::new).clone()
    }
}

impl Default for ReqwestConnectionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionProvider for ReqwestConnectionProvider {
    fn has_handlers(&self) -> bool {
        self.has_handlers
    }

    fn set_has_handlers(&mut self, has_handlers: bool) {
        self.has_handlers = has_handlers;
    }

    fn set_client_factory(&mut self, factory: ClientFactory) {
        self.client_factory = factory;
    }

    async fn process_request(
        &mut self,
        request: &ConnectionRequest,
        token: &CancellationToken,
    ) -> Result<ConnectionRequestResponse, ConnectionError> {
        let client = self.obtain_client();

        let mut headers = HeaderMap::new();
        self.configure_headers(request, &mut headers);

        let absolute = request
            .base_address
            .join(&request.relative_uri)
            .map_err(|e| ConnectionError::Transport(format!("invalid request URI: {e}")))?;

        debug!("HTTP {}: {}", request.method, absolute);

        let mut outbound = match request.method {
            HttpMethod::Get => client.get(absolute),
            HttpMethod::Post => client.post(absolute),
            HttpMethod::Put => client.put(absolute),
            HttpMethod::Delete => client.delete(absolute),
        };
        outbound = outbound.headers(headers);
        if let Some(content) = &request.content {
            outbound = outbound.body(content.clone());
        }

        let response = tokio::select! {
            _ = token.cancelled() => return Err(ConnectionError::Cancelled),
            sent = outbound.send() => sent.map_err(|e| {
                if e.is_timeout() {
                    ConnectionError::Cancelled
                } else {
                    ConnectionError::Transport(e.to_string())
                }
            })?,
        };

        let status = response.status();
        if status.is_success() {
            let body = tokio::select! {
                _ = token.cancelled() => return Err(ConnectionError::Cancelled),
                body = response.text() => {
                    body.map_err(|e| ConnectionError::Transport(e.to_string()))?
                }
            };
            Ok(ConnectionRequestResponse {
                is_success: true,
                status_code: status.as_u16(),
                response_string: Some(body),
                error_reason: None,
            })
        } else {
            let reason = match response.text().await {
                Ok(body) if !body.is_empty() => body,
                _ => status.canonical_reason().unwrap_or("Unknown error").to_string(),
            };
            Ok(ConnectionRequestResponse {
                is_success: false,
                status_code: status.as_u16(),
                response_string: None,
                error_reason: Some(reason),
            })
        }
    }
}
