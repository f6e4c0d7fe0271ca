//! Rule tree evaluation
//!
//! Pure functions over a rule tree and a fact map. Group nodes
//! short-circuit; leaves delegate to the operator implementations below.

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::node::{ConditionLeaf, Operator, RuleNode};
use crate::{FactMap, RuleError, RuleResult};

/// Evaluate a rule tree against a fact map
pub fn evaluate(node: &RuleNode, facts: &FactMap) -> RuleResult<bool> {
    match node {
        RuleNode::All { all } => {
            for child in all {
                if !evaluate(child, facts)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        RuleNode::Any { any } => {
            for child in any {
                if evaluate(child, facts)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        RuleNode::Not { not } => Ok(!evaluate(not, facts)?),
        RuleNode::Leaf(leaf) => eval_leaf(leaf, facts),
    }
}

fn eval_leaf(leaf: &ConditionLeaf, facts: &FactMap) -> RuleResult<bool> {
    let fact_value = facts
        .get(&leaf.fact)
        .ok_or_else(|| RuleError::UnknownFact(leaf.fact.clone()))?;

    let result = match leaf.operator {
        Operator::Equal => json_eq(fact_value, &leaf.value),
        Operator::NotEqual => !json_eq(fact_value, &leaf.value),
        Operator::LessThan => numeric_cmp(fact_value, &leaf.value, |a, b| a < b),
        Operator::LessThanInclusive => numeric_cmp(fact_value, &leaf.value, |a, b| a <= b),
        Operator::GreaterThan => numeric_cmp(fact_value, &leaf.value, |a, b| a > b),
        Operator::GreaterThanInclusive => numeric_cmp(fact_value, &leaf.value, |a, b| a >= b),
        Operator::In => value_in_list(fact_value, &leaf.value),
        Operator::NotIn => !value_in_list(fact_value, &leaf.value),
        Operator::Contains => list_contains(fact_value, &leaf.value),
        Operator::DoesNotContain => !list_contains(fact_value, &leaf.value),
        Operator::Matches => matches_pattern(fact_value, &leaf.value)?,
    };

    trace!(
        fact = %leaf.fact,
        operator = ?leaf.operator,
        result,
        "Evaluated condition leaf"
    );

    Ok(result)
}

/// JSON equality with cross-type number comparison (1 == 1.0)
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Numeric comparison; non-numeric operands never satisfy it
fn numeric_cmp(fact: &Value, value: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (json_to_f64(fact), json_to_f64(value)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Coerce a JSON value to f64, accepting numeric strings
fn json_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Whether the fact value appears in the rule's list value
fn value_in_list(fact: &Value, list: &Value) -> bool {
    match list {
        Value::Array(items) => items.iter().any(|item| json_eq(fact, item)),
        _ => false,
    }
}

/// Whether the fact (array or string) contains the rule value
fn list_contains(fact: &Value, value: &Value) -> bool {
    match fact {
        Value::Array(items) => items.iter().any(|item| json_eq(item, value)),
        Value::String(s) => value.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
        _ => false,
    }
}

/// Regex match over the string form of the fact
fn matches_pattern(fact: &Value, pattern: &Value) -> RuleResult<bool> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| RuleError::InvalidRule("matches operator requires a string pattern".into()))?;
    let re = Regex::new(pattern)?;

    let haystack = match fact {
        Value::String(s) => s.clone(),
        Value::Null => return Ok(false),
        other => other.to_string(),
    };

    Ok(re.is_match(&haystack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_eq_numbers() {
        assert!(json_eq(&json!(1), &json!(1.0)));
        assert!(!json_eq(&json!(1), &json!("1")));
        assert!(json_eq(&json!("a"), &json!("a")));
    }

    #[test]
    fn test_numeric_string_coercion() {
        assert!(numeric_cmp(&json!("42"), &json!(40), |a, b| a > b));
    }

    #[test]
    fn test_contains_on_string_fact() {
        assert!(list_contains(&json!("front gate"), &json!("gate")));
        assert!(!list_contains(&json!("front gate"), &json!("dock")));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        assert!(matches_pattern(&json!("abc"), &json!("(")).is_err());
    }
}
