//! Unit tests for the request builder and executor
//!
//! Drives the outcome state machine with a scripted connection provider:
//! success, error, transport failure and cancellation classification,
//! handler exclusivity, configuration errors and URI resolution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use restcall_core::{
    Behavior, CancellationToken, ClientFactory, ConnectionError, ConnectionProvider,
    ConnectionRequest, ConnectionRequestResponse, EndpointDefinition, RestApiClientBuilder,
    RestError, Url,
};
use serde::Serialize;

#[derive(Clone)]
enum ScriptedOutcome {
    Response(ConnectionRequestResponse),
    Error(ConnectionError),
    NeverCompletes,
}

/// Connection provider answering from a script instead of the network.
struct ScriptedProvider {
    outcome: ScriptedOutcome,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<ConnectionRequest>>>,
    has_handlers: bool,
}

/// Test-side view of what the provider observed.
struct Probe {
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<ConnectionRequest>>>,
}

impl Probe {
    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> Option<ConnectionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

impl ScriptedProvider {
    fn new(outcome: ScriptedOutcome) -> (Self, Probe) {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(None));
        let probe = Probe {
            calls: Arc::clone(&calls),
            last_request: Arc::clone(&last_request),
        };
        (
            Self {
                outcome,
                calls,
                last_request,
                has_handlers: false,
            },
            probe,
        )
    }

    fn success(status_code: u16, body: &str) -> (Self, Probe) {
        Self::new(ScriptedOutcome::Response(ConnectionRequestResponse {
            is_success: true,
            status_code,
            response_string: Some(body.to_string()),
            error_reason: None,
        }))
    }

    fn failure(status_code: u16, reason: &str) -> (Self, Probe) {
        Self::new(ScriptedOutcome::Response(ConnectionRequestResponse {
            is_success: false,
            status_code,
            response_string: None,
            error_reason: Some(reason.to_string()),
        }))
    }
}

#[async_trait]
impl ConnectionProvider for ScriptedProvider {
    fn has_handlers(&self) -> bool {
        self.has_handlers
    }

    fn set_has_handlers(&mut self, has_handlers: bool) {
        self.has_handlers = has_handlers;
    }

    fn set_client_factory(&mut self, _factory: ClientFactory) {}

    async fn process_request(
        &mut self,
        request: &ConnectionRequest,
        token: &CancellationToken,
    ) -> Result<ConnectionRequestResponse, ConnectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.outcome {
            ScriptedOutcome::Response(response) => Ok(response.clone()),
            ScriptedOutcome::Error(error) => Err(error.clone()),
            ScriptedOutcome::NeverCompletes => {
                token.cancelled().await;
                Err(ConnectionError::Cancelled)
            }
        }
    }
}

fn base_uri() -> Url {
    "http://localhost-faulted".parse().unwrap()
}

fn search_definition() -> EndpointDefinition {
    EndpointDefinition::build_with_action(base_uri(), "Routes", "Search")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchCriteria {
    page: u32,
    page_size: u32,
}

#[tokio::test]
async fn test_success_outcome_fires_success_handler_only() {
    let (provider, _probe) = ScriptedProvider::success(200, "[]");
    let success_status = Arc::new(Mutex::new(None));
    let error_fired = Arc::new(AtomicUsize::new(0));
    let timeout_fired = Arc::new(AtomicUsize::new(0));

    let captured = Arc::clone(&success_status);
    let errors = Arc::clone(&error_fired);
    let timeouts = Arc::clone(&timeout_fired);

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .on_success(move |status| {
            *captured.lock().unwrap() = Some(status);
        })
        .on_error(move |_| {
            errors.fetch_add(1, Ordering::SeqCst);
        })
        .on_timeout(move || {
            timeouts.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await
        .unwrap();

    assert!(result.is_succeeded);
    assert!(result.errors.is_empty());
    assert_eq!(result.content.as_deref(), Some("[]"));
    assert_eq!(*success_status.lock().unwrap(), Some(200));
    assert_eq!(error_fired.load(Ordering::SeqCst), 0);
    assert_eq!(timeout_fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_error_outcome_reports_status_and_reason() {
    let (provider, probe) = ScriptedProvider::failure(400, "Bad Request");
    let error_status = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&error_status);

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .on_error(move |status| {
            *captured.lock().unwrap() = Some(status);
        })
        .execute()
        .await
        .unwrap();

    assert!(!result.is_succeeded);
    assert!(result.content.is_none());
    assert_eq!(result.errors, vec!["Bad Request"]);
    assert_eq!(*error_status.lock().unwrap(), Some(400));
    assert_eq!(result.uri.as_str(), "http://localhost-faulted/api/I/Routes/Search");
    assert_eq!(probe.call_count(), 1);
}

#[tokio::test]
async fn test_transport_error_reports_synthetic_gone_status() {
    let (provider, _probe) = ScriptedProvider::new(ScriptedOutcome::Error(
        ConnectionError::Transport("connection refused".to_string()),
    ));
    let error_status = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&error_status);

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .on_error(move |status| {
            *captured.lock().unwrap() = Some(status);
        })
        .execute()
        .await
        .unwrap();

    assert!(!result.is_succeeded);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("connection refused"));
    assert_eq!(*error_status.lock().unwrap(), Some(410));
}

#[tokio::test]
async fn test_timeout_outcome_fires_timeout_handler() {
    let (provider, _probe) = ScriptedProvider::new(ScriptedOutcome::NeverCompletes);
    let timeout_fired = Arc::new(AtomicUsize::new(0));
    let timeouts = Arc::clone(&timeout_fired);

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .on_timeout(move || {
            timeouts.fetch_add(1, Ordering::SeqCst);
        })
        .execute_with_timeout(Duration::from_millis(50))
        .await
        .unwrap();

    assert!(!result.is_succeeded);
    assert_eq!(timeout_fired.load(Ordering::SeqCst), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("50"));
    assert!(result.elapsed >= Duration::from_millis(50));
    assert_eq!(result.uri.as_str(), "http://localhost-faulted/api/I/Routes/Search");
}

#[tokio::test]
async fn test_external_token_cancellation_classifies_as_timeout() {
    let (provider, _probe) = ScriptedProvider::new(ScriptedOutcome::NeverCompletes);
    let timeout_fired = Arc::new(AtomicUsize::new(0));
    let timeouts = Arc::clone(&timeout_fired);

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .on_timeout(move || {
            timeouts.fetch_add(1, Ordering::SeqCst);
        })
        .execute_with_token(token.clone())
        .await
        .unwrap();

    assert!(!result.is_succeeded);
    assert_eq!(timeout_fired.load(Ordering::SeqCst), 1);
    assert_eq!(result.errors.len(), 1);
    // The caller's token stays usable after the call returns.
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn test_external_token_is_never_cancelled_by_the_executor() {
    let (provider, _probe) = ScriptedProvider::success(200, "{}");
    let token = CancellationToken::new();

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .execute_with_token(token.clone())
        .await
        .unwrap();

    assert!(result.is_succeeded);
    assert!(!token.is_cancelled());
}

#[tokio::test]
async fn test_uri_arguments_resolve_into_the_requested_uri() {
    let (provider, probe) = ScriptedProvider::failure(400, "Bad Request");

    let definition =
        EndpointDefinition::build_with_action(base_uri(), "Routes", "Request/{id}/{value}");

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(definition)
        .get()
        .with_uri_argument("id", 100)
        .with_uri_argument("{value}", 101)
        .execute()
        .await
        .unwrap();

    assert_eq!(
        result.uri.as_str(),
        "http://localhost-faulted/api/I/Routes/Request/100/101"
    );
    let request = probe.last_request().unwrap();
    assert_eq!(request.relative_uri, "/api/I/Routes/Request/100/101");
}

#[tokio::test]
async fn test_uri_argument_last_write_wins_per_name() {
    let (provider, probe) = ScriptedProvider::success(200, "{}");

    let definition = EndpointDefinition::build_with_action(base_uri(), "Routes", "Request/{id}");

    RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(definition)
        .get()
        .with_uri_argument("id", 1)
        .with_uri_argument("id", 2)
        .execute()
        .await
        .unwrap();

    let request = probe.last_request().unwrap();
    assert_eq!(request.relative_uri, "/api/I/Routes/Request/2");
}

#[tokio::test]
async fn test_missing_uri_argument_fails_before_any_network_call() {
    let (provider, probe) = ScriptedProvider::success(200, "{}");

    let definition =
        EndpointDefinition::build_with_action(base_uri(), "Routes", "Request/{id}/{value}");

    let error = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(definition)
        .get()
        .with_uri_argument("id", 100)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(error, RestError::ArgumentMissing { .. }));
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test]
async fn test_query_argument_reaches_the_wire_in_declaration_order() {
    let (provider, probe) = ScriptedProvider::success(200, "{}");

    let criteria = SearchCriteria {
        page: 1,
        page_size: 10,
    };

    RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .with_query_argument("model", &criteria)
        .execute()
        .await
        .unwrap();

    let request = probe.last_request().unwrap();
    assert_eq!(
        request.relative_uri,
        "/api/I/Routes/Search?model.page=1&model.pageSize=10"
    );
}

#[tokio::test]
async fn test_second_query_argument_is_rejected() {
    let (provider, probe) = ScriptedProvider::success(200, "{}");

    let criteria = SearchCriteria {
        page: 1,
        page_size: 10,
    };

    let error = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .with_query_argument("model", &criteria)
        .with_query_argument("other", &criteria)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(error, RestError::DuplicateQueryArgument));
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test]
async fn test_duplicate_handlers_fail_before_any_network_call() {
    let (provider, probe) = ScriptedProvider::success(200, "{}");

    let error = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .on_success(|_| {})
        .on_success(|_| {})
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        RestError::HandlerAlreadyRegistered("success")
    ));
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test]
async fn test_post_serializes_the_body_onto_the_request() {
    let (provider, probe) = ScriptedProvider::success(201, "{}");

    let criteria = SearchCriteria {
        page: 1,
        page_size: 10,
    };

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .post(&criteria)
        .execute()
        .await
        .unwrap();

    assert!(result.is_succeeded);
    let request = probe.last_request().unwrap();
    assert_eq!(request.content.as_deref(), Some(r#"{"page":1,"pageSize":10}"#));
    assert_eq!(request.relative_uri, "/api/I/Routes/Search");
}

#[tokio::test]
async fn test_delete_sends_no_content() {
    let (provider, probe) = ScriptedProvider::success(204, "");

    let definition = EndpointDefinition::build(base_uri(), "User");

    let result = RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(definition)
        .delete()
        .execute()
        .await
        .unwrap();

    assert!(result.is_succeeded);
    let request = probe.last_request().unwrap();
    assert!(request.content.is_none());
    assert_eq!(request.relative_uri, "/api/I/User");
}

#[tokio::test]
async fn test_explicit_base_address_takes_precedence() {
    let (provider, _probe) = ScriptedProvider::success(200, "{}");

    let result = RestApiClientBuilder::build_for("http://elsewhere:9999".parse().unwrap())
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .execute()
        .await
        .unwrap();

    assert_eq!(
        result.uri.as_str(),
        "http://elsewhere:9999/api/I/Routes/Search"
    );
}

// ============================================================================
// Behavior chain
// ============================================================================

struct RecordingBehavior {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Behavior for RecordingBehavior {
    async fn on_client_creation(
        &self,
        _provider: &mut dyn ConnectionProvider,
        _base_address: &Url,
    ) -> Result<(), ConnectionError> {
        self.log.lock().unwrap().push(format!("client:{}", self.name));
        Ok(())
    }

    fn on_request_created(&self, _request: &mut ConnectionRequest) {
        self.log.lock().unwrap().push(format!("request:{}", self.name));
    }
}

struct FailingBehavior;

#[async_trait]
impl Behavior for FailingBehavior {
    async fn on_client_creation(
        &self,
        _provider: &mut dyn ConnectionProvider,
        _base_address: &Url,
    ) -> Result<(), ConnectionError> {
        Err(ConnectionError::Transport(
            "token exchange failed: unreachable".to_string(),
        ))
    }
}

#[tokio::test]
async fn test_behavior_hooks_run_in_registration_order_per_hook_type() {
    let (provider, _probe) = ScriptedProvider::success(200, "{}");
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::new(RecordingBehavior {
        name: "first",
        log: Arc::clone(&log),
    });
    let second = Arc::new(RecordingBehavior {
        name: "second",
        log: Arc::clone(&log),
    });

    RestApiClientBuilder::build()
        .behavior(first)
        .behavior(second)
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .execute()
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["client:first", "client:second", "request:first", "request:second"]
    );
}

#[tokio::test]
async fn test_registering_the_same_behavior_instance_twice_is_a_noop() {
    let (provider, _probe) = ScriptedProvider::success(200, "{}");
    let log = Arc::new(Mutex::new(Vec::new()));

    let behavior = Arc::new(RecordingBehavior {
        name: "only",
        log: Arc::clone(&log),
    });

    RestApiClientBuilder::build()
        .behavior(Arc::clone(&behavior) as Arc<dyn Behavior>)
        .from(search_definition())
        .get()
        .behavior(behavior)
        .use_connection_provider(provider)
        .execute()
        .await
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["client:only", "request:only"]);
}

#[tokio::test]
async fn test_failing_client_creation_hook_classifies_as_error() {
    let (provider, probe) = ScriptedProvider::success(200, "{}");
    let error_status = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&error_status);

    let result = RestApiClientBuilder::build()
        .behavior(Arc::new(FailingBehavior))
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .on_error(move |status| {
            *captured.lock().unwrap() = Some(status);
        })
        .execute()
        .await
        .unwrap();

    assert!(!result.is_succeeded);
    assert_eq!(*error_status.lock().unwrap(), Some(410));
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("token exchange failed"));
    assert_eq!(result.uri.as_str(), "http://localhost-faulted/api/I/Routes/Search");
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test]
async fn test_accept_header_behavior_mutates_the_dispatched_request() {
    let (provider, probe) = ScriptedProvider::success(200, "{}");

    let behavior = restcall_core::AcceptHeaderBehavior::new(
        vec!["application/xml".to_string()],
        vec!["gzip".to_string()],
    );

    RestApiClientBuilder::build()
        .use_connection_provider(provider)
        .from(search_definition())
        .get()
        .behavior(behavior)
        .execute()
        .await
        .unwrap();

    let request = probe.last_request().unwrap();
    assert_eq!(request.header_accept_content_types, vec!["application/xml"]);
    assert_eq!(request.header_accept_encodings, vec!["gzip"]);
}

#[tokio::test]
async fn test_endpoint_convenience_passthrough_builds_a_full_call() {
    // The passthrough uses the default reqwest provider; an unmatched route
    // on the mock server answers 404, which classifies as an error outcome
    // reported through the result rather than as an `Err`.
    let server = wiremock::MockServer::start().await;
    let base: Url = server.uri().parse().unwrap();
    let definition = EndpointDefinition::build_with_action(base, "Routes", "Search");

    let error_status = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&error_status);

    let result = definition
        .get()
        .on_error(move |status| {
            *captured.lock().unwrap() = Some(status);
        })
        .execute()
        .await
        .unwrap();

    assert!(!result.is_succeeded);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(*error_status.lock().unwrap(), Some(404));
    assert_eq!(
        result.uri.as_str(),
        format!("{}/api/I/Routes/Search", server.uri())
    );
}
