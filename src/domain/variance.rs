//! Percentage deviation of every node from its baseline value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::entities::{Node, Variance};
use crate::domain::ledger::Baseline;

/// What a zero baseline value turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroBaselinePolicy {
    /// `0 -> 0` is 0.00%, `0 -> v` is ±∞%
    #[default]
    Sentinel,
    /// Always 0.00%
    Clamp,
    /// `0 -> v` is ±∞%, `0 -> 0` is NaN%
    Propagate,
}

impl fmt::Display for ZeroBaselinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroBaselinePolicy::Sentinel => write!(f, "sentinel"),
            ZeroBaselinePolicy::Clamp => write!(f, "clamp"),
            ZeroBaselinePolicy::Propagate => write!(f, "propagate"),
        }
    }
}

impl FromStr for ZeroBaselinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentinel" => Ok(Self::Sentinel),
            "clamp" => Ok(Self::Clamp),
            "propagate" => Ok(Self::Propagate),
            other => Err(format!(
                "unknown zero-baseline policy '{other}' (expected sentinel, clamp or propagate)"
            )),
        }
    }
}

/// Variance of `value` against `baseline`: `(value - baseline) / baseline * 100`.
pub fn variance_between(value: f64, baseline: f64, policy: ZeroBaselinePolicy) -> Variance {
    if baseline != 0.0 {
        return Variance::Percent((value - baseline) / baseline * 100.0);
    }
    match (policy, value == 0.0) {
        (ZeroBaselinePolicy::Clamp, _) | (ZeroBaselinePolicy::Sentinel, true) => Variance::ZERO,
        (ZeroBaselinePolicy::Propagate, true) => Variance::Undefined,
        (_, false) => Variance::Infinite {
            negative: value < 0.0,
        },
    }
}

/// Annotate every node with its variance against the full baseline.
///
/// Baseline nodes are matched by id at any depth. A node missing from the
/// baseline is compared against itself.
pub fn compute_variance(nodes: &[Node], baseline: &Baseline, policy: ZeroBaselinePolicy) -> Vec<Node> {
    nodes
        .iter()
        .map(|node| {
            let original = baseline.find(&node.id).map_or(node.value, |b| b.value);
            let variance = variance_between(node.value, original, policy);
            trace!(id = %node.id, value = node.value, original, %variance, "variance");
            Node {
                variance: Some(variance),
                children: node
                    .children
                    .as_ref()
                    .map(|children| compute_variance(children, baseline, policy)),
                ..node.clone()
            }
        })
        .collect()
}
