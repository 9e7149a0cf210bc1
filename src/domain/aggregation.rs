//! Bottom-up roll-up of child values into parent sums.

use crate::domain::entities::Node;

/// Recompute every parent's value as the sum of its (aggregated) children.
///
/// Leaves pass through; an empty parent sums to zero. Idempotent.
pub fn aggregate(nodes: &[Node]) -> Vec<Node> {
    nodes.iter().map(aggregate_node).collect()
}

fn aggregate_node(node: &Node) -> Node {
    match &node.children {
        None => node.clone(),
        Some(children) => {
            let children = aggregate(children);
            Node {
                value: children.iter().map(|c| c.value).sum(),
                children: Some(children),
                ..node.clone()
            }
        }
    }
}
