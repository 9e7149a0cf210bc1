//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

/// One entry in the hierarchical ledger.
///
/// A node with `children` present (even empty) is a parent whose value is
/// derived from its children. A node without `children` is a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique across the whole ledger
    pub id: String,
    pub label: String,
    pub value: f64,
    /// Derived, display-only deviation from the baseline value
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub variance: Option<Variance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// Create a leaf node.
    pub fn leaf(id: impl Into<String>, label: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value,
            variance: None,
            children: None,
        }
    }

    /// Create a parent node. Its value starts as the sum of `children`.
    pub fn parent(id: impl Into<String>, label: impl Into<String>, children: Vec<Node>) -> Self {
        let value = children.iter().map(|c| c.value).sum();
        Self {
            id: id.into(),
            label: label.into(),
            value,
            variance: None,
            children: Some(children),
        }
    }

    /// Override the value (used for parents whose authored value differs from the sum).
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Children as a slice; empty for leaves.
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Sum of the immediate children's values (0 for leaves and empty parents).
    pub fn children_total(&self) -> f64 {
        self.children().iter().map(|c| c.value).sum()
    }
}

/// Percentage deviation of a node's value from its baseline value.
///
/// `Display` yields the two-decimal form shown to users, e.g. `25.00%`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Variance {
    /// Finite percentage
    Percent(f64),
    /// Nonzero value against a zero baseline
    Infinite { negative: bool },
    /// Zero value against a zero baseline (only under the propagate policy)
    Undefined,
}

impl Variance {
    pub const ZERO: Variance = Variance::Percent(0.0);
}

impl fmt::Display for Variance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `+ 0.0` folds negative zero so an unchanged value never prints as -0.00%
            Variance::Percent(p) => write!(f, "{:.2}%", p + 0.0),
            Variance::Infinite { negative: false } => write!(f, "∞%"),
            Variance::Infinite { negative: true } => write!(f, "-∞%"),
            Variance::Undefined => write!(f, "NaN%"),
        }
    }
}

impl Serialize for Variance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How an edit request derives the target's new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// `new = original + original * amount / 100`
    Percentage,
    /// `new = amount`
    Direct,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Percentage => write!(f, "percentage"),
            EditMode::Direct => write!(f, "direct"),
        }
    }
}

impl FromStr for EditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "percentage" | "percent" | "pct" | "%" => Ok(EditMode::Percentage),
            "direct" | "value" | "val" => Ok(EditMode::Direct),
            other => Err(format!("unknown edit mode: {other}")),
        }
    }
}

/// A single user edit: which node, how, and optionally by how much.
///
/// When `amount` is absent the pending amount from [`InputValues`] is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    #[serde(rename = "id", alias = "target_id", alias = "targetId")]
    pub target_id: String,
    pub mode: EditMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl EditRequest {
    pub fn new(target_id: impl Into<String>, mode: EditMode, amount: Option<f64>) -> Self {
        Self {
            target_id: target_id.into(),
            mode,
            amount,
        }
    }

    pub fn percentage(target_id: impl Into<String>, amount: f64) -> Self {
        Self::new(target_id, EditMode::Percentage, Some(amount))
    }

    pub fn direct(target_id: impl Into<String>, amount: f64) -> Self {
        Self::new(target_id, EditMode::Direct, Some(amount))
    }

    /// Request that takes its amount from the pending input values.
    pub fn pending(target_id: impl Into<String>, mode: EditMode) -> Self {
        Self::new(target_id, mode, None)
    }
}

/// Pending per-node input amounts, owned by the host.
///
/// Never cleared by an edit: the same amount can be submitted repeatedly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputValues(BTreeMap<String, f64>);

impl InputValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: impl Into<String>, amount: f64) {
        self.0.insert(id.into(), amount);
    }

    /// Pending amount for `id`; non-finite entries read as absent.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied().filter(|a| a.is_finite())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for InputValues {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
