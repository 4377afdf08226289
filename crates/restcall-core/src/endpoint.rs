//! Endpoint definitions for conventionally routed APIs

use serde::Serialize;
use url::Url;

use crate::builder::{RequestBuilder, RestApiClientBuilder};
use crate::error::Result;
use crate::query;

/// API version prefix baked into every route.
const API_VERSION: &str = "api/I";

/// Immutable description of a logical API route.
///
/// Routes follow the `/{apiVersion}/{controller}[/{action}]` convention. The
/// action segment may contain `{name}` placeholders that are resolved when a
/// call executes:
///
/// - controller `"User"`, action `"Details/{id}"` => `/api/I/User/Details/{id}`
/// - controller `"User"`, action `"{id}"` => `/api/I/User/{id}`
#[derive(Debug, Clone)]
pub struct EndpointDefinition {
    api_version: String,
    controller: String,
    action_with_arguments: String,
    base_address: Option<Url>,
}

impl EndpointDefinition {
    /// Builds a definition for a controller route without an action segment.
    pub fn build(base_address: Url, controller: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            controller: controller.into(),
            action_with_arguments: String::new(),
            base_address: Some(base_address),
        }
    }

    /// Builds a definition with an action template, which may contain
    /// `{name}` placeholders.
    pub fn build_with_action(
        base_address: Url,
        controller: impl Into<String>,
        action_with_arguments: impl Into<String>,
    ) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            controller: controller.into(),
            action_with_arguments: action_with_arguments.into(),
            base_address: Some(base_address),
        }
    }

    /// Builds a definition without a base address; the builder it is fed
    /// into must supply one via
    /// [`build_for`](crate::RestApiClientBuilder::build_for).
    pub fn build_relative(
        controller: impl Into<String>,
        action_with_arguments: impl Into<String>,
    ) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            controller: controller.into(),
            action_with_arguments: action_with_arguments.into(),
            base_address: None,
        }
    }

    /// API version prefix of the route.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Controller segment of the route.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Action template of the route, empty when absent.
    pub fn action_with_arguments(&self) -> &str {
        &self.action_with_arguments
    }

    /// Base address the definition was built for, if any.
    pub fn base_address(&self) -> Option<&Url> {
        self.base_address.as_ref()
    }

    /// Relative URI of the route. Placeholder tokens in the action segment
    /// pass through literally for later resolution.
    pub fn uri(&self) -> String {
        let mut relative = format!("/{}/{}", self.api_version, self.controller);
        if !self.action_with_arguments.trim().is_empty() {
            relative.push('/');
            relative.push_str(&self.action_with_arguments);
        }
        relative
    }

    /// Relative URI of the route with `query_object` flattened under
    /// `query_argument_name`. When flattening yields no pairs the URI carries
    /// no query string at all.
    pub fn uri_with_query<T: Serialize>(
        &self,
        query_argument_name: &str,
        query_object: &T,
    ) -> Result<String> {
        let value = serde_json::to_value(query_object)?;
        let pairs = query::flatten(query_argument_name, &value);

        let mut relative = self.uri();
        if !pairs.is_empty() {
            relative.push('?');
            relative.push_str(&pairs.join("&"));
        }
        Ok(relative)
    }

    /// Starts a GET call scoped to this definition's base address.
    pub fn get(&self) -> RequestBuilder {
        RestApiClientBuilder::build().from(self.clone()).get()
    }

    /// Starts a POST call scoped to this definition's base address.
    pub fn post<T: Serialize>(&self, body: &T) -> RequestBuilder {
        RestApiClientBuilder::build().from(self.clone()).post(body)
    }

    /// Starts a PUT call scoped to this definition's base address.
    pub fn put<T: Serialize>(&self, body: &T) -> RequestBuilder {
        RestApiClientBuilder::build().from(self.clone()).put(body)
    }

    /// Starts a DELETE call scoped to this definition's base address.
    pub fn delete(&self) -> RequestBuilder {
        RestApiClientBuilder::build().from(self.clone()).delete()
    }
}
