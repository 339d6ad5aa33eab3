//! Utility functions and helpers

use serde_json::Value;

/// Longest rendering of an offending value carried in an error
pub const MAX_DIAGNOSTIC_LEN: usize = 64;

/// Whether a value is a JSON integer
///
/// Decided by the number's literal text, so integers outside the 64-bit range
/// still count. Relies on serde_json's `arbitrary_precision` feature.
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => !n.to_string().contains(['.', 'e', 'E']),
        _ => false,
    }
}

/// JSON Schema type name of a value
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) if is_integer(value) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a value for an operator-facing diagnostic
///
/// Compact JSON, cut at [`MAX_DIAGNOSTIC_LEN`] characters.
pub fn describe_value(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= MAX_DIAGNOSTIC_LEN {
        return rendered;
    }
    let cut: String = rendered.chars().take(MAX_DIAGNOSTIC_LEN).collect();
    format!("{}...", cut)
}

/// Sanitize a remote location for logging (hide embedded credentials)
pub fn sanitize_for_logging(s: &str) -> String {
    let (scheme, rest) = match s.find("://") {
        Some(idx) => (&s[..idx + 3], &s[idx + 3..]),
        None => ("", s),
    };

    // userinfo ends at the last '@' before the first path separator
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}***@{}", scheme, &rest[at + 1..]),
        None => s.to_string(),
    }
}
