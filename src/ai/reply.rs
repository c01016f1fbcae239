//! Model reply parsing
//!
//! Models are asked to answer with a bare JSON object but often wrap it in a
//! markdown code fence. Unparseable replies are turned into a small object
//! carrying the raw text instead of an error.

use serde_json::{json, Map, Value};

const MAX_FALLBACK_CHARS: usize = 500;

/// Strip markdown code fences and surrounding whitespace
pub fn strip_code_fence(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Parse a model reply into a JSON object
///
/// Non-object JSON and invalid JSON both yield
/// `{"response": <text, truncated>, "parse_error": <reason>}`.
pub fn parse_json_reply(text: &str) -> Map<String, Value> {
    let body = strip_code_fence(text);

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => fallback(body, format!("expected a JSON object, got {}", kind(&other))),
        Err(e) => fallback(body, e.to_string()),
    }
}

fn fallback(body: &str, reason: String) -> Map<String, Value> {
    let response = if body.is_empty() {
        "Unable to parse response".to_string()
    } else {
        body.chars().take(MAX_FALLBACK_CHARS).collect()
    };

    tracing::debug!(reason = %reason, "Model reply was not a JSON object");

    match json!({ "response": response, "parse_error": reason }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read a string field, treating empty strings and "null" as absent
pub fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(s.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a boolean field, accepting "true"/"false" strings
pub fn bool_field(map: &Map<String, Value>, key: &str) -> Option<bool> {
    match map.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let map = parse_json_reply(r#"{"response": "hi", "needs_more_info": true}"#);
        assert_eq!(map["response"], "hi");
        assert_eq!(map["needs_more_info"], true);
    }

    #[test]
    fn test_fenced_json() {
        let map = parse_json_reply("```json\n{\"risk\": \"Red\"}\n```");
        assert_eq!(map["risk"], "Red");

        let map = parse_json_reply("```\n{\"risk\": \"Green\"}\n```  ");
        assert_eq!(map["risk"], "Green");
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let map = parse_json_reply("Sorry, I cannot help with that.");
        assert_eq!(map["response"], "Sorry, I cannot help with that.");
        assert!(map.contains_key("parse_error"));
    }

    #[test]
    fn test_empty_reply() {
        let map = parse_json_reply("   ");
        assert_eq!(map["response"], "Unable to parse response");
    }

    #[test]
    fn test_long_invalid_reply_truncated() {
        let long = "x".repeat(2000);
        let map = parse_json_reply(&long);
        assert_eq!(map["response"].as_str().unwrap().len(), 500);
    }

    #[test]
    fn test_non_object_json() {
        let map = parse_json_reply("[1, 2, 3]");
        assert!(map["parse_error"].as_str().unwrap().contains("an array"));
    }

    #[test]
    fn test_field_helpers() {
        let map = parse_json_reply(r#"{"a": " x ", "b": "", "c": "null", "d": "yes", "e": 3}"#);
        assert_eq!(str_field(&map, "a").as_deref(), Some("x"));
        assert_eq!(str_field(&map, "b"), None);
        assert_eq!(str_field(&map, "c"), None);
        assert_eq!(str_field(&map, "e").as_deref(), Some("3"));
        assert_eq!(bool_field(&map, "d"), Some(true));
        assert_eq!(bool_field(&map, "missing"), None);
    }
}
