//! Proportional redistribution of a node's new value across its children.

use tracing::trace;

use crate::domain::entities::Node;

/// Redistribute `new_value` over the immediate children of `node`.
///
/// Each child keeps its share of the current children total. The returned node
/// carries `value == new_value`. Leaves and parents whose children sum to zero
/// keep their children untouched. Grandchildren are never rescaled here.
pub fn allocate(node: &Node, new_value: f64) -> Node {
    let children = node.children.as_ref().map(|children| {
        let original_total: f64 = children.iter().map(|c| c.value).sum();
        if original_total == 0.0 {
            trace!(id = %node.id, "children sum to zero, skipping redistribution");
            return children.clone();
        }
        children
            .iter()
            .map(|child| Node {
                value: new_value * (child.value / original_total),
                ..child.clone()
            })
            .collect()
    });

    Node {
        value: new_value,
        children,
        ..node.clone()
    }
}
