//! Fluent request builder and executor
//!
//! One builder instance performs one call: configure the endpoint, method,
//! arguments, behaviors and outcome handlers, then execute under a bounded
//! wait. Configuration errors are latched at the fluent call that caused
//! them and surface as the `Err` of `execute*` before any network
//! interaction; outcome-level failures (error status, transport failure,
//! timeout) are always reported through the returned
//! [`RestApiCallResult`], never as errors.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::arguments;
use crate::behavior::Behavior;
use crate::endpoint::EndpointDefinition;
use crate::error::{RestError, Result};
use crate::provider::{ConnectionError, ConnectionProvider, HttpMethod, ReqwestConnectionProvider};
use crate::result::RestApiCallResult;

/// Default timeout window for a single call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Status reported to error handlers when the transport layer fails outright
/// instead of answering with a status code.
const STATUS_GONE: u16 = 410;

type StatusHandler = Box<dyn FnOnce(u16) + Send>;
type TimeoutHandler = Box<dyn FnOnce() + Send>;

/// Entry points for building a REST call.
pub struct RestApiClientBuilder;

impl RestApiClientBuilder {
    /// Starts building a call; the base address is taken from the endpoint
    /// definition bound with [`from`](BuildOperation::from).
    pub fn build() -> BuildOperation {
        BuildOperation {
            state: BuilderState::new(None),
        }
    }

    /// Starts building a call against an explicit base address, which takes
    /// precedence over the definition's own.
    pub fn build_for(base_address: Url) -> BuildOperation {
        BuildOperation {
            state: BuilderState::new(Some(base_address)),
        }
    }
}

/// Working set of one call, threaded through the fluent phases.
struct BuilderState {
    base_address: Option<Url>,
    provider: Box<dyn ConnectionProvider>,
    behaviors: Vec<Arc<dyn Behavior>>,
    uri_arguments: HashMap<String, String>,
    query_argument: Option<(String, Value)>,
    error_handler: Option<StatusHandler>,
    success_handler: Option<StatusHandler>,
    timeout_handler: Option<TimeoutHandler>,
    config_error: Option<RestError>,
}

impl BuilderState {
    fn new(base_address: Option<Url>) -> Self {
        Self {
            base_address,
            provider: Box::new(ReqwestConnectionProvider::new()),
            behaviors: Vec::new(),
            uri_arguments: HashMap::new(),
            query_argument: None,
            error_handler: None,
            success_handler: None,
            timeout_handler: None,
            config_error: None,
        }
    }

    /// Latches the first configuration error; later ones are dropped.
    fn record_error(&mut self, error: RestError) {
        if self.config_error.is_none() {
            self.config_error = Some(error);
        }
    }

    /// Registering the identical behavior instance twice is a no-op.
    /// Identity is the data pointer, not the vtable, so the check holds for
    /// the same instance coerced at different call sites.
    fn register_behavior(&mut self, behavior: Arc<dyn Behavior>) {
        let registered = self.behaviors.iter().any(|existing| {
            std::ptr::eq(
                Arc::as_ptr(existing) as *const (),
                Arc::as_ptr(&behavior) as *const (),
            )
        });
        if !registered {
            self.behaviors.push(behavior);
        }
    }
}

/// Definition phase: pick the transport, behaviors and the endpoint.
pub struct BuildOperation {
    state: BuilderState,
}

impl BuildOperation {
    /// Replaces the default reqwest-backed transport.
    pub fn use_connection_provider(mut self, provider: impl ConnectionProvider + 'static) -> Self {
        self.state.provider = Box::new(provider);
        self
    }

    /// Registers a behavior intercepting the building of the call, for
    /// example to add OAuth2 security. Registering the identical instance
    /// twice is a no-op.
    pub fn behavior(mut self, behavior: Arc<dyn Behavior>) -> Self {
        self.state.register_behavior(behavior);
        self
    }

    /// Binds the endpoint definition to call. When no base address was given
    /// to [`build_for`](RestApiClientBuilder::build_for), the definition's
    /// base address becomes authoritative.
    pub fn from(mut self, definition: EndpointDefinition) -> DefinitionOperation {
        if self.state.base_address.is_none() {
            self.state.base_address = definition.base_address().cloned();
        }
        DefinitionOperation {
            state: self.state,
            definition,
        }
    }
}

/// Method phase: exactly one of get/post/put/delete.
pub struct DefinitionOperation {
    state: BuilderState,
    definition: EndpointDefinition,
}

impl DefinitionOperation {
    /// Defines a GET operation.
    pub fn get(self) -> RequestBuilder {
        self.into_request(HttpMethod::Get, None)
    }

    /// Defines a POST operation with `body` JSON-encoded as the payload.
    pub fn post<T: Serialize>(self, body: &T) -> RequestBuilder {
        self.with_body(HttpMethod::Post, body)
    }

    /// Defines a PUT operation with `body` JSON-encoded as the payload.
    pub fn put<T: Serialize>(self, body: &T) -> RequestBuilder {
        self.with_body(HttpMethod::Put, body)
    }

    /// Defines a DELETE operation.
    pub fn delete(self) -> RequestBuilder {
        self.into_request(HttpMethod::Delete, None)
    }

    fn with_body<T: Serialize>(mut self, method: HttpMethod, body: &T) -> RequestBuilder {
        match serde_json::to_value(body) {
            Ok(value) => self.into_request(method, Some(value)),
            Err(error) => {
                self.state.record_error(error.into());
                self.into_request(method, None)
            }
        }
    }

    fn into_request(self, method: HttpMethod, body: Option<Value>) -> RequestBuilder {
        RequestBuilder {
            state: self.state,
            definition: self.definition,
            method,
            body,
        }
    }
}

/// Execution phase: arguments, handlers and the execute calls.
pub struct RequestBuilder {
    state: BuilderState,
    definition: EndpointDefinition,
    method: HttpMethod,
    body: Option<Value>,
}

impl RequestBuilder {
    /// Supplies a value for a `{name}` placeholder in the action template.
    /// Repeatable; the last value wins per name. The name may be given with
    /// or without braces.
    pub fn with_uri_argument(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.state.uri_arguments.insert(name.into(), value.to_string());
        self
    }

    /// Supplies an object to be flattened into the GET query string under
    /// `model_variable_name`. Only valid on GET calls and at most once per
    /// call.
    pub fn with_query_argument<T: Serialize>(
        mut self,
        model_variable_name: impl Into<String>,
        value_in_query_params: &T,
    ) -> Self {
        if self.method != HttpMethod::Get {
            self.state.record_error(RestError::QueryArgumentNotAllowed);
            return self;
        }
        if self.state.query_argument.is_some() {
            self.state.record_error(RestError::DuplicateQueryArgument);
            return self;
        }
        match serde_json::to_value(value_in_query_params) {
            Ok(value) => {
                self.state.query_argument = Some((model_variable_name.into(), value));
            }
            Err(error) => self.state.record_error(error.into()),
        }
        self
    }

    /// Registers the handler fired when the call answers with a non-success
    /// status code or the transport fails. At most one per call.
    pub fn on_error(mut self, handler: impl FnOnce(u16) + Send + 'static) -> Self {
        if self.state.error_handler.is_some() {
            self.state
                .record_error(RestError::HandlerAlreadyRegistered("error"));
        } else {
            self.state.error_handler = Some(Box::new(handler));
        }
        self
    }

    /// Registers the handler fired when the call succeeds. At most one per
    /// call.
    pub fn on_success(mut self, handler: impl FnOnce(u16) + Send + 'static) -> Self {
        if self.state.success_handler.is_some() {
            self.state
                .record_error(RestError::HandlerAlreadyRegistered("success"));
        } else {
            self.state.success_handler = Some(Box::new(handler));
        }
        self
    }

    /// Registers the handler fired when the call is cancelled by the timeout
    /// window or the supplied token. At most one per call.
    pub fn on_timeout(mut self, handler: impl FnOnce() + Send + 'static) -> Self {
        if self.state.timeout_handler.is_some() {
            self.state
                .record_error(RestError::HandlerAlreadyRegistered("timeout"));
        } else {
            self.state.timeout_handler = Some(Box::new(handler));
        }
        self
    }

    /// Registers a behavior intercepting the building of the call.
    /// Registering the identical instance twice is a no-op.
    pub fn behavior(mut self, behavior: Arc<dyn Behavior>) -> Self {
        self.state.register_behavior(behavior);
        self
    }

    /// Executes the call with the default timeout of 5000 ms.
    pub async fn execute(self) -> Result<RestApiCallResult> {
        self.execute_with_timeout(DEFAULT_TIMEOUT).await
    }

    /// Executes the call, bounding the whole exchange by `timeout`. The
    /// per-call cancellation scope is created and released internally.
    pub async fn execute_with_timeout(self, timeout: Duration) -> Result<RestApiCallResult> {
        self.run(Cancellation::Timeout(timeout)).await
    }

    /// Executes the call bounded by a caller-owned cancellation token. The
    /// token is never cancelled or invalidated here; the caller may inspect
    /// or reuse it after the call returns.
    pub async fn execute_with_token(self, token: CancellationToken) -> Result<RestApiCallResult> {
        self.run(Cancellation::External(token)).await
    }

    async fn run(self, cancellation: Cancellation) -> Result<RestApiCallResult> {
        let RequestBuilder {
            mut state,
            definition,
            method,
            body,
        } = self;

        if let Some(error) = state.config_error.take() {
            return Err(error);
        }

        let timer = Instant::now();

        let base_address = state
            .base_address
            .clone()
            .ok_or(RestError::MissingBaseAddress)?;

        // Wire payload, produced before the URI is touched.
        let content = match (method, &body) {
            (HttpMethod::Post | HttpMethod::Put, Some(body)) => Some(serde_json::to_string(body)?),
            _ => None,
        };

        // The query object applies to GET requests only.
        let relative = if method == HttpMethod::Get {
            match &state.query_argument {
                Some((name, value)) => definition.uri_with_query(name, value)?,
                None => definition.uri(),
            }
        } else {
            definition.uri()
        };
        let relative = arguments::resolve(&relative, &state.uri_arguments)?;

        // Recorded before dispatch so the result carries the URI even when
        // the call fails or times out.
        let uri = base_address
            .join(&relative)
            .map_err(|e| RestError::InvalidUri(e.to_string()))?;
        let mut result = RestApiCallResult::new(uri);

        let token = match &cancellation {
            Cancellation::External(token) => token.clone(),
            Cancellation::Timeout(_) => CancellationToken::new(),
        };

        let mut hook_failure = None;
        for behavior in &state.behaviors {
            if let Err(error) = behavior
                .on_client_creation(state.provider.as_mut(), &base_address)
                .await
            {
                hook_failure = Some(error);
                break;
            }
        }

        let outcome = match hook_failure {
            Some(error) => Err(error),
            None => {
                let mut request =
                    state
                        .provider
                        .create_request(method, &base_address, &relative, content);
                for behavior in &state.behaviors {
                    behavior.on_request_created(&mut request);
                }

                debug!("dispatching {} {}", request.method, result.uri);

                match &cancellation {
                    Cancellation::Timeout(timeout) => tokio::select! {
                        response = state.provider.process_request(&request, &token) => response,
                        _ = tokio::time::sleep(*timeout) => {
                            // Unwind any in-flight transport work bound to the
                            // internal token.
                            token.cancel();
                            Err(ConnectionError::Cancelled)
                        }
                    },
                    Cancellation::External(_) => tokio::select! {
                        response = state.provider.process_request(&request, &token) => response,
                        _ = token.cancelled() => Err(ConnectionError::Cancelled),
                    },
                }
            }
        };

        match outcome {
            Err(ConnectionError::Cancelled) => {
                warn!("request timed out: {}", result.uri);
                if let Some(handler) = state.timeout_handler.take() {
                    handler();
                }
                result.errors.push(match &cancellation {
                    Cancellation::Timeout(timeout) => {
                        format!("Request timed out after {} ms", timeout.as_millis())
                    }
                    Cancellation::External(_) => {
                        "Request was cancelled by the supplied cancellation token".to_string()
                    }
                });
            }
            Err(ConnectionError::Transport(message)) => {
                warn!("request failed: {}: {}", result.uri, message);
                if let Some(handler) = state.error_handler.take() {
                    handler(STATUS_GONE);
                }
                result.errors.push(message);
            }
            Ok(response) if response.is_success => {
                debug!(
                    "request succeeded with status {}: {}",
                    response.status_code, result.uri
                );
                if let Some(handler) = state.success_handler.take() {
                    handler(response.status_code);
                }
                result.is_succeeded = true;
                result.content = response.response_string;
            }
            Ok(response) => {
                warn!(
                    "request failed with status {}: {}",
                    response.status_code, result.uri
                );
                if let Some(handler) = state.error_handler.take() {
                    handler(response.status_code);
                }
                result.errors.push(
                    response
                        .error_reason
                        .unwrap_or_else(|| format!("HTTP error {}", response.status_code)),
                );
            }
        }

        result.elapsed = timer.elapsed();
        Ok(result)
    }
}

/// How one execution is bounded.
enum Cancellation {
    /// Internal per-call scope, created and released by the executor.
    Timeout(Duration),
    /// Caller-owned token; ownership stays with the caller.
    External(CancellationToken),
}
