//! Pluggable behaviors intercepting client and request creation

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::provider::{ConnectionError, ConnectionProvider, ConnectionRequest};

/// Interceptor invoked at the two extension points of a call.
///
/// Both hooks are no-ops by default. For each hook, registered behaviors run
/// in registration order and later behaviors observe earlier behaviors'
/// mutations.
#[async_trait]
pub trait Behavior: Send + Sync {
    /// Invoked once per execution, before any request is built. Typical use
    /// is replacing the provider's client factory, e.g. to install an
    /// authorizing client obtained from a token exchange.
    ///
    /// A returned error aborts the call and is classified as a failed
    /// outcome.
    async fn on_client_creation(
        &self,
        provider: &mut dyn ConnectionProvider,
        base_address: &Url,
    ) -> Result<(), ConnectionError> {
        let _ = (provider, base_address);
        Ok(())
    }

    /// Invoked once per execution, immediately after the transport request is
    /// assembled and before dispatch. Typical use is overriding accept
    /// headers.
    fn on_request_created(&self, request: &mut ConnectionRequest) {
        let _ = request;
    }
}

/// Behavior that overrides the accept content-types and encodings of the
/// outgoing request.
pub struct AcceptHeaderBehavior {
    content_types: Vec<String>,
    encodings: Vec<String>,
}

impl AcceptHeaderBehavior {
    /// Creates a behavior overriding the accept content-type list.
    pub fn content_types(content_types: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            content_types,
            encodings: Vec::new(),
        })
    }

    /// Creates a behavior overriding both accept lists. Empty lists leave the
    /// corresponding header untouched.
    pub fn new(content_types: Vec<String>, encodings: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            content_types,
            encodings,
        })
    }
}

#[async_trait]
impl Behavior for AcceptHeaderBehavior {
    fn on_request_created(&self, request: &mut ConnectionRequest) {
        if !self.content_types.is_empty() {
            request.header_accept_content_types = self.content_types.clone();
        }
        if !self.encodings.is_empty() {
            request.header_accept_encodings = self.encodings.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HttpMethod;

    #[test]
    fn test_accept_header_behavior_overrides_request_lists() {
        let behavior = AcceptHeaderBehavior::new(
            vec!["application/xml".to_string()],
            vec!["gzip".to_string()],
        );

        let base: Url = "http://localhost:4545".parse().unwrap();
        let mut request =
            ConnectionRequest::new(HttpMethod::Get, base, "/api/I/User".to_string(), None);
        behavior.on_request_created(&mut request);

        assert_eq!(request.header_accept_content_types, vec!["application/xml"]);
        assert_eq!(request.header_accept_encodings, vec!["gzip"]);
    }

    #[test]
    fn test_empty_lists_leave_defaults_untouched() {
        let behavior = AcceptHeaderBehavior::content_types(Vec::new());

        let base: Url = "http://localhost:4545".parse().unwrap();
        let mut request =
            ConnectionRequest::new(HttpMethod::Get, base, "/api/I/User".to_string(), None);
        behavior.on_request_created(&mut request);

        assert_eq!(request.header_accept_content_types, vec!["application/json"]);
        assert_eq!(request.header_accept_encodings, vec!["utf-8"]);
    }
}
