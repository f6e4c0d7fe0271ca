//! Rule tree model
//!
//! Rules are authored externally as JSON and stored inside automation
//! configs. The tree is a boolean combination of condition leaves; group
//! nodes nest arbitrarily.

use serde::{Deserialize, Serialize};

/// A node in a rule tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    /// All children must match (AND)
    All {
        all: Vec<RuleNode>,
    },

    /// Any child must match (OR)
    Any {
        any: Vec<RuleNode>,
    },

    /// Child must not match (NOT)
    Not {
        not: Box<RuleNode>,
    },

    /// Leaf condition
    Leaf(ConditionLeaf),
}

impl RuleNode {
    /// Create an AND group
    pub fn all(children: Vec<RuleNode>) -> Self {
        RuleNode::All { all: children }
    }

    /// Create an OR group
    pub fn any(children: Vec<RuleNode>) -> Self {
        RuleNode::Any { any: children }
    }

    /// Create a leaf condition
    pub fn leaf(
        fact: impl Into<String>,
        operator: Operator,
        value: serde_json::Value,
    ) -> Self {
        RuleNode::Leaf(ConditionLeaf {
            fact: fact.into(),
            operator,
            value,
        })
    }
}

/// A single attribute/operator/value condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionLeaf {
    /// Fact key to look up (e.g. "event.type", "zone.armedState")
    pub fact: String,

    /// Comparison operator
    pub operator: Operator,

    /// Value to compare against
    pub value: serde_json::Value,
}

/// Comparison operators
///
/// Names follow the externally-authored rule JSON (camelCase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanInclusive,
    GreaterThan,
    GreaterThanInclusive,
    In,
    NotIn,
    Contains,
    DoesNotContain,
    /// Regex match over the string form of the fact
    Matches,
}
