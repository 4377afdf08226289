//! Error types for the call builder

use thiserror::Error;

/// Result type for builder operations
pub type Result<T> = std::result::Result<T, RestError>;

/// Errors raised while configuring or starting a call.
///
/// Outcome-level failures (non-success status codes, transport errors,
/// timeouts) are never reported through this type; they are encoded in the
/// returned [`RestApiCallResult`](crate::RestApiCallResult).
#[derive(Debug, Error)]
pub enum RestError {
    /// URI placeholder count does not match the supplied argument count
    #[error("not all URI arguments are given: the route defines {expected} placeholder(s) but {supplied} argument(s) were supplied")]
    ArgumentMissing { expected: usize, supplied: usize },

    /// A second query object was registered on the same call
    #[error("only one query object can be provided per call")]
    DuplicateQueryArgument,

    /// A query object was registered on a non-GET call
    #[error("query objects can only be used with GET requests")]
    QueryArgumentNotAllowed,

    /// A handler was registered twice for the same outcome category
    #[error("an \"{0}\" handler is already registered for this call")]
    HandlerAlreadyRegistered(&'static str),

    /// Neither the builder nor the endpoint definition carries a base address
    #[error("no base address was supplied and the endpoint definition does not carry one")]
    MissingBaseAddress,

    /// The resolved relative URI could not be joined onto the base address
    #[error("invalid request URI: {0}")]
    InvalidUri(String),

    /// Body or query object could not be serialized to JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The result carries no content to parse
    #[error("the call did not produce any content to parse")]
    NoContent,
}
