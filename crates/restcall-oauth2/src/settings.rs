//! Settings for the client-credential behaviors

use url::Url;

/// Settings for [`ClientCredentialsBehavior`](crate::ClientCredentialsBehavior).
#[derive(Debug, Clone)]
pub struct ClientCredentialSettings {
    /// Token endpoint of the OAuth2 client-credentials handler
    pub token_endpoint: Url,
    /// Client id registered with the authorization server
    pub client_id: String,
    /// Client secret registered with the authorization server
    pub client_secret: String,
}

/// Settings for [`Auth0ClientCredentialBehavior`](crate::Auth0ClientCredentialBehavior).
#[derive(Debug, Clone)]
pub struct Auth0ClientCredentialSettings {
    /// Token endpoint of the Auth0 tenant
    pub token_endpoint: Url,
    /// Client id registered with the tenant
    pub client_id: String,
    /// Client secret registered with the tenant
    pub client_secret: String,
    /// API identifier the issued token is intended for
    pub audience: String,
}
