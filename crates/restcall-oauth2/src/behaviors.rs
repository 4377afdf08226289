//! Client-credential behaviors installing an authorizing transport client

use std::sync::Arc;

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{AuthUrl, ClientId, ClientSecret, TokenResponse, TokenUrl};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use restcall_core::{Behavior, ConnectionError, ConnectionProvider, Url};
use tracing::debug;

use crate::error::OAuth2Error;
use crate::settings::{Auth0ClientCredentialSettings, ClientCredentialSettings};

/// Behavior implementing the OAuth2 client-credentials flow.
///
/// On client creation the behavior exchanges the configured id/secret for a
/// bearer token and installs a transport client carrying it as a default
/// `Authorization` header. When the provider already has a customized client
/// installed for the call (`has_handlers`), the behavior leaves it untouched.
pub struct ClientCredentialsBehavior {
    settings: ClientCredentialSettings,
}

impl ClientCredentialsBehavior {
    /// Creates the behavior from its settings.
    pub fn create(settings: ClientCredentialSettings) -> Arc<Self> {
        Arc::new(Self { settings })
    }

    async fn acquire_token(&self) -> Result<String, OAuth2Error> {
        let client = credentials_client(
            &self.settings.token_endpoint,
            &self.settings.client_id,
            &self.settings.client_secret,
        )?;

        let token = client
            .exchange_client_credentials()
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuth2Error::TokenExchange(e.to_string()))?;

        Ok(token.access_token().secret().clone())
    }
}

#[async_trait]
impl Behavior for ClientCredentialsBehavior {
    async fn on_client_creation(
        &self,
        provider: &mut dyn ConnectionProvider,
        base_address: &Url,
    ) -> Result<(), ConnectionError> {
        if provider.has_handlers() {
            debug!("authorizing client already installed for {}, skipping token exchange", base_address);
            return Ok(());
        }

        let access_token = self
            .acquire_token()
            .await
            .map_err(|error| ConnectionError::Transport(error.to_string()))?;

        debug!("installing OAuth2 authorizing client for {}", base_address);
        install_authorizing_client(provider, &access_token)
            .map_err(|error| ConnectionError::Transport(error.to_string()))
    }
}

/// Behavior implementing the client-credentials flow against an Auth0
/// tenant, which expects the target API as an `audience` parameter of the
/// token request.
pub struct Auth0ClientCredentialBehavior {
    settings: Auth0ClientCredentialSettings,
}

impl Auth0ClientCredentialBehavior {
    /// Creates the behavior from its settings.
    pub fn create(settings: Auth0ClientCredentialSettings) -> Arc<Self> {
        Arc::new(Self { settings })
    }

    async fn acquire_token(&self) -> Result<String, OAuth2Error> {
        let client = credentials_client(
            &self.settings.token_endpoint,
            &self.settings.client_id,
            &self.settings.client_secret,
        )?;

        let token = client
            .exchange_client_credentials()
            .add_extra_param("audience", self.settings.audience.clone())
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuth2Error::TokenExchange(e.to_string()))?;

        Ok(token.access_token().secret().clone())
    }
}

#[async_trait]
impl Behavior for Auth0ClientCredentialBehavior {
    async fn on_client_creation(
        &self,
        provider: &mut dyn ConnectionProvider,
        base_address: &Url,
    ) -> Result<(), ConnectionError> {
        if provider.has_handlers() {
            debug!("authorizing client already installed for {}, skipping token exchange", base_address);
            return Ok(());
        }

        let access_token = self
            .acquire_token()
            .await
            .map_err(|error| ConnectionError::Transport(error.to_string()))?;

        debug!("installing Auth0 authorizing client for {}", base_address);
        install_authorizing_client(provider, &access_token)
            .map_err(|error| ConnectionError::Transport(error.to_string()))
    }
}

/// The client-credentials flow never redirects through an authorization
/// endpoint; the token endpoint stands in for both URLs the client wants.
fn credentials_client(
    token_endpoint: &Url,
    client_id: &str,
    client_secret: &str,
) -> Result<BasicClient, OAuth2Error> {
    let endpoint = token_endpoint.to_string();
    Ok(BasicClient::new(
        ClientId::new(client_id.to_string()),
        Some(ClientSecret::new(client_secret.to_string())),
        AuthUrl::new(endpoint.clone()).map_err(|e| OAuth2Error::InvalidEndpoint(e.to_string()))?,
        Some(TokenUrl::new(endpoint).map_err(|e| OAuth2Error::InvalidEndpoint(e.to_string()))?),
    ))
}

/// Builds a client carrying the bearer token as a default header and
/// installs it through the provider's factory hook.
fn install_authorizing_client(
    provider: &mut dyn ConnectionProvider,
    access_token: &str,
) -> Result<(), OAuth2Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {access_token}"))
        .map_err(|e| OAuth2Error::ClientBuild(format!("token is not a valid header value: {e}")))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| OAuth2Error::ClientBuild(e.to_string()))?;

    provider.set_client_factory(Box::new(move |_| Some(client.clone())));
    provider.set_has_handlers(true);
    Ok(())
}
