//! URI placeholder resolution

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RestError, Result};

/// Matches well-formed `{identifier}` placeholder tokens. Stray `{` or `}`
/// characters outside a complete token are not counted as placeholders.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").expect("placeholder pattern is valid"));

/// Substitutes `{name}` placeholders in `uri_text` with the supplied values.
///
/// An empty argument map returns the URI unchanged. Otherwise the number of
/// placeholder tokens must equal the number of supplied arguments exactly;
/// supplying fewer or more both fail with
/// [`RestError::ArgumentMissing`]. Argument names may be given with or
/// without enclosing braces (`"id"` and `"{id}"` are interchangeable).
pub fn resolve(uri_text: &str, arguments: &HashMap<String, String>) -> Result<String> {
    if arguments.is_empty() {
        return Ok(uri_text.to_string());
    }

    let expected = PLACEHOLDER.find_iter(uri_text).count();
    if expected != arguments.len() {
        return Err(RestError::ArgumentMissing {
            expected,
            supplied: arguments.len(),
        });
    }

    let mut resolved = uri_text.to_string();
    for (name, value) in arguments {
        let key = name.trim_matches(|c| c == '{' || c == '}');
        resolved = resolved.replace(&format!("{{{key}}}"), value);
    }
    Ok(resolved)
}
