//! Fluent builder for REST API calls against conventionally routed APIs
//!
//! Builds and executes a single HTTP call per builder instance, with
//! deterministic URI construction and a three-way outcome classification
//! (success / error / timeout).
//!
//! ## Features
//!
//! - **Endpoint definitions**: immutable controller/action route descriptors
//! - **Fluent building**: method, body, URI and query arguments, handlers
//! - **Pluggable transport**: replaceable [`ConnectionProvider`], reqwest default
//! - **Behaviors**: interceptors at client-creation and request-creation points
//! - **Bounded execution**: per-call timeout or caller-owned cancellation token
//! - **Structured results**: resolved URI, errors, content and elapsed time
//!
//! ## Example
//!
//! ```no_run
//! use restcall_core::{EndpointDefinition, RestApiClientBuilder, Url};
//!
//! # async fn run() -> restcall_core::Result<()> {
//! let base: Url = "http://localhost:4545".parse().unwrap();
//! let definition = EndpointDefinition::build_with_action(base, "Routes", "Search");
//!
//! let result = RestApiClientBuilder::build()
//!     .from(definition)
//!     .get()
//!     .on_error(|status| eprintln!("call failed with {status}"))
//!     .execute()
//!     .await?;
//!
//! if result.is_succeeded {
//!     println!("{}", result.content.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod arguments;
pub mod behavior;
pub mod builder;
pub mod endpoint;
pub mod error;
pub mod provider;
pub mod query;
pub mod result;

pub use behavior::{AcceptHeaderBehavior, Behavior};
pub use builder::{
    BuildOperation, DefinitionOperation, RequestBuilder, RestApiClientBuilder, DEFAULT_TIMEOUT,
};
pub use endpoint::EndpointDefinition;
pub use error::{RestError, Result};
pub use provider::{
    ClientFactory, ConnectionError, ConnectionProvider, ConnectionRequest,
    ConnectionRequestResponse, HttpMethod, ReqwestConnectionProvider,
};
pub use result::RestApiCallResult;

/// Re-export commonly used types
pub use reqwest::header;
pub use tokio_util::sync::CancellationToken;
pub use url::Url;
