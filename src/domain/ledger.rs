//! The ledger forest and its immutable baseline snapshot.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::aggregation::aggregate;
use crate::domain::entities::Node;
use crate::domain::error::DomainError;
use crate::domain::variance::{compute_variance, ZeroBaselinePolicy};

/// Depth-first search for `id`, first match wins.
pub fn find_node<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(node.children(), id) {
            return Some(found);
        }
    }
    None
}

/// Search only the top level of `nodes`.
pub fn find_top_level<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    nodes.iter().find(|n| n.id == id)
}

/// Ordered list of top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ledger {
    #[serde(rename = "node")]
    nodes: Vec<Node>,
}

impl Ledger {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Build a ledger after checking id uniqueness and value finiteness.
    #[instrument(level = "debug", skip(nodes), fields(roots = nodes.len()))]
    pub fn try_new(nodes: Vec<Node>) -> Result<Self, DomainError> {
        let ledger = Self::new(nodes);
        ledger.validate()?;
        Ok(ledger)
    }

    /// Electronics/Furniture sample used when no ledger document is given.
    pub fn sample() -> Self {
        Self::new(vec![
            Node::parent(
                "electronics",
                "Electronics",
                vec![
                    Node::leaf("phones", "Phones", 800.0),
                    Node::leaf("laptops", "Laptops", 700.0),
                ],
            ),
            Node::parent(
                "furniture",
                "Furniture",
                vec![
                    Node::leaf("tables", "Tables", 300.0),
                    Node::leaf("chairs", "Chairs", 700.0),
                ],
            ),
        ])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        find_node(&self.nodes, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Every node paired with its depth, in depth-first pre-order.
    pub fn walk(&self) -> Vec<(usize, &Node)> {
        fn visit<'a>(nodes: &'a [Node], depth: usize, out: &mut Vec<(usize, &'a Node)>) {
            for node in nodes {
                out.push((depth, node));
                visit(node.children(), depth + 1, out);
            }
        }
        let mut out = Vec::new();
        visit(&self.nodes, 0, &mut out);
        out
    }

    /// Total number of nodes at every level.
    pub fn len(&self) -> usize {
        self.walk().len()
    }

    /// Roll child values up into parents.
    pub fn aggregated(&self) -> Self {
        Self::new(aggregate(&self.nodes))
    }

    /// Annotate every node with its variance against `baseline`.
    pub fn with_variance(&self, baseline: &Baseline, policy: ZeroBaselinePolicy) -> Self {
        Self::new(compute_variance(&self.nodes, baseline, policy))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for (_, node) in self.walk() {
            if node.id.is_empty() {
                return Err(DomainError::EmptyId {
                    label: node.label.clone(),
                });
            }
            if !node.value.is_finite() {
                return Err(DomainError::NonFiniteValue {
                    id: node.id.clone(),
                });
            }
            if !seen.insert(node.id.as_str()) {
                return Err(DomainError::DuplicateId(node.id.clone()));
            }
        }
        Ok(())
    }
}

impl From<Vec<Node>> for Ledger {
    fn from(nodes: Vec<Node>) -> Self {
        Self::new(nodes)
    }
}

/// Where an edit looks up the "original value" of its target in the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineLookup {
    /// Depth-first over every level, same as the variance engine
    #[default]
    Recursive,
    /// Top-level entries only; nested targets fall back to their current value
    TopLevel,
}

impl fmt::Display for BaselineLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineLookup::Recursive => write!(f, "recursive"),
            BaselineLookup::TopLevel => write!(f, "top-level"),
        }
    }
}

impl FromStr for BaselineLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recursive" => Ok(Self::Recursive),
            "top-level" => Ok(Self::TopLevel),
            other => Err(format!(
                "unknown baseline lookup '{other}' (expected recursive or top-level)"
            )),
        }
    }
}

/// Deep, independent copy of the ledger as first loaded.
///
/// Exposes no mutating API; it is the reference for variance and for the
/// "original value" of percentage and direct edits.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline(Ledger);

impl Baseline {
    pub fn capture(ledger: &Ledger) -> Self {
        Self(ledger.clone())
    }

    pub fn ledger(&self) -> &Ledger {
        &self.0
    }

    /// Recursive lookup across every level.
    pub fn find(&self, id: &str) -> Option<&Node> {
        find_node(self.0.nodes(), id)
    }

    /// Lookup among top-level entries only.
    pub fn find_top_level(&self, id: &str) -> Option<&Node> {
        find_top_level(self.0.nodes(), id)
    }

    /// Baseline value of `id` under the given lookup rule.
    pub fn original_value(&self, id: &str, lookup: BaselineLookup) -> Option<f64> {
        match lookup {
            BaselineLookup::Recursive => self.find(id),
            BaselineLookup::TopLevel => self.find_top_level(id),
        }
        .map(|n| n.value)
    }
}
