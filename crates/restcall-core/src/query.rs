//! Query object flattening
//!
//! Projects an object graph into `root.path.to.leaf=value` query pairs.
//! Values are concatenated as-is, without percent-encoding: consumers of the
//! produced query strings depend on the literal format, so changing this is a
//! compatibility decision rather than a bug fix.

use serde_json::Value;

/// Flattens `object` under `root_name` into an ordered list of
/// `root.path.to.leaf=value` pairs.
///
/// The root name is lowercased in full; every path segment has its first
/// letter forced to lower-case. Null values are skipped at every level.
/// Arrays and non-object top-level values have no key-path projection and
/// contribute no pairs.
///
/// Pair order follows the object's own property order, which requires
/// serde_json's `preserve_order` feature (enabled by this crate).
pub fn flatten(root_name: &str, object: &Value) -> Vec<String> {
    let root = root_name.to_lowercase();
    let mut pairs = Vec::new();
    if let Value::Object(map) = object {
        collect(&root, "", map, &mut pairs);
    }
    pairs
}

fn collect(
    root: &str,
    current_path: &str,
    map: &serde_json::Map<String, Value>,
    pairs: &mut Vec<String>,
) {
    for (name, value) in map {
        let segment = first_letter_to_lowercase(name);
        match value {
            Value::Null => {}
            Value::String(text) => pairs.push(format_pair(root, current_path, &segment, text)),
            Value::Number(number) => {
                pairs.push(format_pair(root, current_path, &segment, &number.to_string()));
            }
            Value::Bool(flag) => {
                pairs.push(format_pair(root, current_path, &segment, &flag.to_string()));
            }
            Value::Object(sub) => {
                let path = if current_path.is_empty() {
                    segment
                } else {
                    format!("{current_path}.{segment}")
                };
                collect(root, &path, sub, pairs);
            }
            Value::Array(_) => {}
        }
    }
}

fn format_pair(root: &str, path: &str, segment: &str, value: &str) -> String {
    if path.is_empty() {
        format!("{root}.{segment}={value}")
    } else {
        format!("{root}.{path}.{segment}={value}")
    }
}

pub(crate) fn first_letter_to_lowercase(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
