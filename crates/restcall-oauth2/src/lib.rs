//! OAuth2 client-credential behaviors for restcall
//!
//! Exchanges a client id/secret for a bearer token against a token endpoint
//! and installs the token on the transport client through the connection
//! provider's factory hook. The token-exchange protocol itself is delegated
//! to the `oauth2` crate's client-credentials flow.
//!
//! ## Features
//!
//! - **Standard flow**: [`ClientCredentialsBehavior`] for any OAuth2 token
//!   endpoint
//! - **Auth0 dialect**: [`Auth0ClientCredentialBehavior`] adding the
//!   `audience` parameter
//! - **Double-wrap guard**: respects the provider's `has_handlers` flag so a
//!   second credential behavior leaves the installed client untouched

pub mod behaviors;
pub mod error;
pub mod settings;

pub use behaviors::{Auth0ClientCredentialBehavior, ClientCredentialsBehavior};
pub use error::OAuth2Error;
pub use settings::{Auth0ClientCredentialSettings, ClientCredentialSettings};
