//! Token template resolution
//!
//! Action params may embed `{{dotted.path}}` tokens resolved against the
//! per-execution context object. Objects JSON-stringify, null becomes the
//! empty string, and an unresolvable path leaves the token verbatim (and
//! warns) so template bugs surface in output instead of vanishing.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.]*)\s*\}\}").unwrap())
}

/// Outcome of a context lookup
///
/// `Found(null)` and `NotFound` are deliberately distinct: the former
/// renders as an empty string, the latter keeps the token.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Path resolved to a value (possibly null)
    Found(Value),

    /// An intermediate key was missing
    NotFound,
}

/// Look up a dotted path in a context object
pub fn lookup(context: &Value, path: &str) -> Resolution {
    let mut current = context;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Resolution::NotFound,
        }
    }
    Resolution::Found(current.clone())
}

/// Render a resolved value into a template string
fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => value.to_string(),
        other => other.to_string(),
    }
}

/// Resolve every token in a template string
pub fn resolve_string(template: &str, context: &Value) -> String {
    token_regex()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let path = &caps[1];
            match lookup(context, path) {
                Resolution::Found(value) => render(&value),
                Resolution::NotFound => {
                    warn!(token = path, "Unresolvable template token left in place");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Resolve tokens in every string field of a JSON value, recursively
///
/// Non-string scalars pass through untouched.
pub fn resolve_value(value: &Value, context: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_string(s, context)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| resolve_value(v, context)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_resolution() {
        let ctx = json!({"device": {"name": "Front Door"}});
        assert_eq!(
            resolve_string("Hello {{device.name}}", &ctx),
            "Hello Front Door"
        );
    }

    #[test]
    fn test_unresolvable_token_survives_verbatim() {
        let ctx = json!({"device": {}});
        assert_eq!(
            resolve_string("Hello {{device.name}}", &ctx),
            "Hello {{device.name}}"
        );

        // Missing intermediate key too
        let ctx = json!({});
        assert_eq!(
            resolve_string("Hello {{device.name}}", &ctx),
            "Hello {{device.name}}"
        );
    }

    #[test]
    fn test_null_renders_as_empty_string() {
        let ctx = json!({"zone": {"name": null}});
        assert_eq!(resolve_string("Zone: '{{zone.name}}'", &ctx), "Zone: ''");
    }

    #[test]
    fn test_objects_json_stringify() {
        let ctx = json!({"event": {"payload": {"displayState": "open"}}});
        assert_eq!(
            resolve_string("payload={{event.payload}}", &ctx),
            r#"payload={"displayState":"open"}"#
        );
    }

    #[test]
    fn test_scalar_forms() {
        let ctx = json!({"event": {"count": 3, "armed": true}});
        assert_eq!(
            resolve_string("{{event.count}} hits, armed={{event.armed}}", &ctx),
            "3 hits, armed=true"
        );
    }

    #[test]
    fn test_multiple_tokens_and_whitespace() {
        let ctx = json!({"a": "1", "b": {"c": "2"}});
        assert_eq!(resolve_string("{{ a }}-{{ b.c }}", &ctx), "1-2");
    }

    #[test]
    fn test_resolve_value_walks_structures() {
        let ctx = json!({"device": {"name": "Cam"}});
        let params = json!({
            "url": "https://x/{{device.name}}",
            "nested": {"label": "{{device.name}}"},
            "list": ["{{device.name}}", 7],
            "count": 7
        });

        let resolved = resolve_value(&params, &ctx);
        assert_eq!(resolved["url"], "https://x/Cam");
        assert_eq!(resolved["nested"]["label"], "Cam");
        assert_eq!(resolved["list"][0], "Cam");
        assert_eq!(resolved["count"], 7);
    }

    #[test]
    fn test_lookup_distinguishes_null_from_missing() {
        let ctx = json!({"a": {"b": null}});
        assert_eq!(lookup(&ctx, "a.b"), Resolution::Found(Value::Null));
        assert_eq!(lookup(&ctx, "a.c"), Resolution::NotFound);
    }
}
