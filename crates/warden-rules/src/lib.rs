//! Generic rules engine
//!
//! Evaluates a JSON condition tree (AND/OR nesting over
//! attribute/operator/value leaves) against a flat fact map. Automation
//! trigger conditions are authored externally as JSON and deserialized into
//! [`RuleNode`]; the evaluator never mutates facts and reports unknown
//! facts as errors so callers can fail closed.

mod node;
mod ops;

pub use node::{ConditionLeaf, Operator, RuleNode};
pub use ops::evaluate;

use thiserror::Error;

/// Flat fact map the engine evaluates against
///
/// Fact values are plain JSON; absent-but-known facts must be present as
/// `null` (the fact builder normalizes them), so a genuinely unknown key
/// means the rule references something the engine was never given.
pub type FactMap = serde_json::Map<String, serde_json::Value>;

/// Rules engine errors
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule references unknown fact: {0}")]
    UnknownFact(String),

    #[error("invalid regex pattern in rule: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid rule: {0}")]
    InvalidRule(String),
}

/// Result type for rule evaluation
pub type RuleResult<T> = Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts(value: serde_json::Value) -> FactMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_simple_equal_condition() {
        let rule: RuleNode = serde_json::from_value(json!({
            "fact": "event.type",
            "operator": "equal",
            "value": "door_opened"
        }))
        .unwrap();

        let f = facts(json!({"event.type": "door_opened"}));
        assert!(evaluate(&rule, &f).unwrap());

        let f = facts(json!({"event.type": "door_closed"}));
        assert!(!evaluate(&rule, &f).unwrap());
    }

    #[test]
    fn test_nested_all_any() {
        let rule: RuleNode = serde_json::from_value(json!({
            "all": [
                {"fact": "device.type", "operator": "equal", "value": "contact_sensor"},
                {"any": [
                    {"fact": "event.displayState", "operator": "equal", "value": "open"},
                    {"fact": "event.type", "operator": "equal", "value": "glass_break"}
                ]}
            ]
        }))
        .unwrap();

        let f = facts(json!({
            "device.type": "contact_sensor",
            "event.displayState": "open",
            "event.type": "door_opened"
        }));
        assert!(evaluate(&rule, &f).unwrap());

        let f = facts(json!({
            "device.type": "contact_sensor",
            "event.displayState": "closed",
            "event.type": "door_closed"
        }));
        assert!(!evaluate(&rule, &f).unwrap());
    }

    #[test]
    fn test_unknown_fact_is_an_error() {
        let rule: RuleNode = serde_json::from_value(json!({
            "fact": "zone.mood",
            "operator": "equal",
            "value": "calm"
        }))
        .unwrap();

        let f = facts(json!({"event.type": "door_opened"}));
        assert!(matches!(
            evaluate(&rule, &f),
            Err(RuleError::UnknownFact(fact)) if fact == "zone.mood"
        ));
    }

    #[test]
    fn test_null_fact_is_not_an_error() {
        let rule: RuleNode = serde_json::from_value(json!({
            "fact": "zone.name",
            "operator": "equal",
            "value": "Perimeter"
        }))
        .unwrap();

        // Known-but-absent facts are null, not missing
        let f = facts(json!({"zone.name": null}));
        assert!(!evaluate(&rule, &f).unwrap());
    }

    #[test]
    fn test_numeric_comparisons() {
        let rule: RuleNode = serde_json::from_value(json!({
            "fact": "event.batteryPercentage",
            "operator": "lessThan",
            "value": 20
        }))
        .unwrap();

        let f = facts(json!({"event.batteryPercentage": 12}));
        assert!(evaluate(&rule, &f).unwrap());

        let f = facts(json!({"event.batteryPercentage": 55}));
        assert!(!evaluate(&rule, &f).unwrap());

        // Non-numeric fact never satisfies a numeric comparison
        let f = facts(json!({"event.batteryPercentage": "low"}));
        assert!(!evaluate(&rule, &f).unwrap());
    }

    #[test]
    fn test_in_and_contains() {
        let rule: RuleNode = serde_json::from_value(json!({
            "fact": "event.type",
            "operator": "in",
            "value": ["door_opened", "window_opened"]
        }))
        .unwrap();

        let f = facts(json!({"event.type": "window_opened"}));
        assert!(evaluate(&rule, &f).unwrap());

        let contains: RuleNode = serde_json::from_value(json!({
            "fact": "device.tags",
            "operator": "contains",
            "value": "perimeter"
        }))
        .unwrap();

        let f = facts(json!({"device.tags": ["perimeter", "exterior"]}));
        assert!(evaluate(&contains, &f).unwrap());
    }

    #[test]
    fn test_not_node() {
        let rule: RuleNode = serde_json::from_value(json!({
            "not": {"fact": "connector.category", "operator": "equal", "value": "sensor_hub"}
        }))
        .unwrap();

        let f = facts(json!({"connector.category": "camera_platform"}));
        assert!(evaluate(&rule, &f).unwrap());
    }

    #[test]
    fn test_matches_operator() {
        let rule: RuleNode = serde_json::from_value(json!({
            "fact": "device.name",
            "operator": "matches",
            "value": "^Gate "
        }))
        .unwrap();

        let f = facts(json!({"device.name": "Gate 1 Camera"}));
        assert!(evaluate(&rule, &f).unwrap());

        let f = facts(json!({"device.name": "Lobby Camera"}));
        assert!(!evaluate(&rule, &f).unwrap());
    }

    #[test]
    fn test_cross_type_number_equality() {
        let rule: RuleNode = serde_json::from_value(json!({
            "fact": "event.count",
            "operator": "equal",
            "value": 1
        }))
        .unwrap();

        let f = facts(json!({"event.count": 1.0}));
        assert!(evaluate(&rule, &f).unwrap());
    }

    #[test]
    fn test_empty_groups() {
        let all: RuleNode = serde_json::from_value(json!({"all": []})).unwrap();
        let any: RuleNode = serde_json::from_value(json!({"any": []})).unwrap();
        let f = FactMap::new();

        assert!(evaluate(&all, &f).unwrap());
        assert!(!evaluate(&any, &f).unwrap());
    }
}
