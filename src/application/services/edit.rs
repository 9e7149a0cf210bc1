//! Edit controller
//!
//! Orchestrates one user edit: resolve the target's new value, allocate it to
//! the target's children, splice the node back, then aggregate and recompute
//! variance over the whole ledger.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::{
    allocate, find_node, Baseline, BaselineLookup, EditMode, EditRequest, InputValues, Ledger,
    Node, ZeroBaselinePolicy,
};

/// Policies governing how an edit is recalculated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecalcPolicy {
    /// Where the "original value" of an edited node comes from
    pub baseline_lookup: BaselineLookup,
    /// Variance rendering for zero baseline values
    pub zero_baseline: ZeroBaselinePolicy,
}

/// Compute the new value of `target` for `request`.
///
/// The amount is the request's own, else the pending input for the target.
pub fn resolve_new_value(
    target: &Node,
    baseline: &Baseline,
    inputs: &InputValues,
    request: &EditRequest,
    lookup: BaselineLookup,
) -> f64 {
    let original = baseline
        .original_value(&target.id, lookup)
        .unwrap_or(target.value);
    let amount = request
        .amount
        .filter(|a| a.is_finite())
        .or_else(|| inputs.get(&request.target_id));

    match request.mode {
        EditMode::Percentage => original + original * (amount.unwrap_or(0.0) / 100.0),
        EditMode::Direct => amount.unwrap_or(original),
    }
}

/// Apply one edit and return the next consistent ledger.
///
/// An unknown target id leaves the ledger unchanged. The input ledger is never
/// modified.
#[instrument(level = "debug", skip(tree, baseline, inputs), fields(id = %request.target_id, mode = %request.mode))]
pub fn apply_edit(
    tree: &Ledger,
    baseline: &Baseline,
    inputs: &InputValues,
    request: &EditRequest,
    policy: RecalcPolicy,
) -> Ledger {
    let Some(target) = find_node(tree.nodes(), &request.target_id) else {
        warn!("edit target not found: {}", request.target_id);
        return tree.clone();
    };

    let new_value = resolve_new_value(target, baseline, inputs, request, policy.baseline_lookup);
    debug!(old = target.value, new = new_value, "resolved new value");

    let mut replacement = Some(allocate(target, new_value));
    let spliced = splice(tree.nodes(), &request.target_id, &mut replacement);

    Ledger::new(spliced)
        .aggregated()
        .with_variance(baseline, policy.zero_baseline)
}

/// Rebuild `nodes`, swapping the first node with `id` for `replacement`.
fn splice(nodes: &[Node], id: &str, replacement: &mut Option<Node>) -> Vec<Node> {
    nodes
        .iter()
        .map(|node| {
            if replacement.is_some() && node.id == id {
                if let Some(updated) = replacement.take() {
                    return updated;
                }
            }
            match &node.children {
                Some(children) if replacement.is_some() => Node {
                    children: Some(splice(children, id, replacement)),
                    ..node.clone()
                },
                _ => node.clone(),
            }
        })
        .collect()
}

/// Edit controller bound to one baseline and policy.
#[derive(Debug, Clone)]
pub struct EditController {
    baseline: Baseline,
    policy: RecalcPolicy,
}

impl EditController {
    pub fn new(baseline: Baseline, policy: RecalcPolicy) -> Self {
        Self { baseline, policy }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn policy(&self) -> RecalcPolicy {
        self.policy
    }

    /// See [`apply_edit`].
    pub fn apply(&self, tree: &Ledger, inputs: &InputValues, request: &EditRequest) -> Ledger {
        apply_edit(tree, &self.baseline, inputs, request, self.policy)
    }

    /// Aggregate and annotate a ledger without editing it.
    pub fn recalculate(&self, tree: &Ledger) -> Ledger {
        tree.aggregated()
            .with_variance(&self.baseline, self.policy.zero_baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_percentage_without_amount_when_resolving_then_uses_original() {
        let ledger = Ledger::sample();
        let baseline = Baseline::capture(&ledger);
        let target = ledger.find("electronics").unwrap();
        let request = EditRequest::pending("electronics", EditMode::Percentage);
        let value = resolve_new_value(
            target,
            &baseline,
            &InputValues::new(),
            &request,
            BaselineLookup::Recursive,
        );
        assert_eq!(value, 1500.0);
    }

    #[test]
    fn given_pending_input_when_resolving_then_request_amount_wins() {
        let ledger = Ledger::sample();
        let baseline = Baseline::capture(&ledger);
        let target = ledger.find("phones").unwrap();
        let mut inputs = InputValues::new();
        inputs.set("phones", 5.0);

        let pending = EditRequest::pending("phones", EditMode::Direct);
        let explicit = EditRequest::direct("phones", 7.0);
        let lookup = BaselineLookup::Recursive;
        assert_eq!(resolve_new_value(target, &baseline, &inputs, &pending, lookup), 5.0);
        assert_eq!(resolve_new_value(target, &baseline, &inputs, &explicit, lookup), 7.0);
    }

    #[test]
    fn given_direct_zero_when_resolving_then_zero_is_an_amount() {
        let ledger = Ledger::sample();
        let baseline = Baseline::capture(&ledger);
        let target = ledger.find("phones").unwrap();
        let request = EditRequest::direct("phones", 0.0);
        let value = resolve_new_value(
            target,
            &baseline,
            &InputValues::new(),
            &request,
            BaselineLookup::Recursive,
        );
        assert_eq!(value, 0.0);
    }

    #[test]
    fn given_nested_target_and_top_level_lookup_when_resolving_then_uses_current_value() {
        let ledger = Ledger::sample();
        let baseline = Baseline::capture(&ledger);
        let edited = apply_edit(
            &ledger,
            &baseline,
            &InputValues::new(),
            &EditRequest::direct("phones", 1000.0),
            RecalcPolicy::default(),
        );
        let target = edited.find("phones").unwrap();
        let request = EditRequest::percentage("phones", 10.0);

        let top = resolve_new_value(
            target,
            &baseline,
            &InputValues::new(),
            &request,
            BaselineLookup::TopLevel,
        );
        let recursive = resolve_new_value(
            target,
            &baseline,
            &InputValues::new(),
            &request,
            BaselineLookup::Recursive,
        );
        assert!((top - 1100.0).abs() < 1e-9);
        assert!((recursive - 880.0).abs() < 1e-9);
    }

    #[test]
    fn given_splice_when_id_repeats_then_only_first_replaced() {
        let nodes = vec![Node::leaf("x", "First", 1.0), Node::leaf("x", "Second", 2.0)];
        let mut replacement = Some(Node::leaf("x", "Replaced", 9.0));
        let out = splice(&nodes, "x", &mut replacement);
        assert_eq!(out[0].label, "Replaced");
        assert_eq!(out[1].label, "Second");
    }
}
