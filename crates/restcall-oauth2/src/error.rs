//! OAuth2 behavior error types

use thiserror::Error;

/// Errors raised while acquiring or installing client credentials
#[derive(Debug, Error)]
pub enum OAuth2Error {
    /// The token endpoint is not a usable URL
    #[error("invalid token endpoint: {0}")]
    InvalidEndpoint(String),

    /// The client-credentials exchange failed
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The authorizing transport client could not be built
    #[error("failed to build authorizing client: {0}")]
    ClientBuild(String),
}
