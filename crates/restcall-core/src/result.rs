//! Structured result of an executed call

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{RestError, Result};

/// Outcome of a single executed call.
///
/// `is_succeeded == true` implies `errors` is empty and `content` carries the
/// response payload; `is_succeeded == false` implies at least one error
/// entry. The resolved URI is recorded before dispatch, so it is present even
/// when the call fails or times out.
#[derive(Debug)]
pub struct RestApiCallResult {
    /// Indication that all went well
    pub is_succeeded: bool,
    /// Errors gathered while executing, empty on success
    pub errors: Vec<String>,
    /// Raw response payload, `None` unless the call succeeded
    pub content: Option<String>,
    /// The fully resolved URI that was requested
    pub uri: Url,
    /// Wall-clock duration of the whole call
    pub elapsed: Duration,
}

impl RestApiCallResult {
    pub(crate) fn new(uri: Url) -> Self {
        Self {
            is_succeeded: false,
            errors: Vec::new(),
            content: None,
            uri,
            elapsed: Duration::ZERO,
        }
    }

    /// Parses the JSON payload in [`content`](Self::content) into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        let content = self.content.as_deref().ok_or(RestError::NoContent)?;
        Ok(serde_json::from_str(content)?)
    }

    /// Joins all recorded errors into a single message.
    pub fn error_message(&self) -> String {
        self.errors.join("\n")
    }
}
