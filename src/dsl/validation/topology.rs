use crate::domain::model::{Flow, NodeKind};
use crate::graph::{EdgeType, FlowGraph};

use super::types::Diagnostic;

/// Checks on the edges as the dispatcher will see them.
pub(super) fn validate(flow: &Flow) -> Vec<Diagnostic> {
    let graph = FlowGraph::build(flow);
    let mut diags = Vec::new();

    for node in graph.graph.node_weights() {
        let outgoing = graph.outgoing(&node.id);
        match &node.kind {
            NodeKind::Condition(_) => {
                for edge in outgoing.iter().filter(|e| e.edge_type == EdgeType::Normal) {
                    diags.push(
                        Diagnostic::warning(
                            "W101",
                            format!(
                                "Condition edge {} has no \"true\"/\"false\" handle and is never followed",
                                edge.id
                            ),
                        )
                        .on_node(&node.id)
                        .on_edge(&edge.id),
                    );
                }
            }
            NodeKind::Parallel(_) => {}
            NodeKind::End => {
                if !outgoing.is_empty() {
                    diags.push(
                        Diagnostic::warning("W104", "End node has outgoing edges")
                            .on_node(&node.id),
                    );
                }
            }
            _ => {
                if let [first, extra @ ..] = outgoing.as_slice() {
                    for edge in extra {
                        diags.push(
                            Diagnostic::warning(
                                "W102",
                                format!(
                                    "Node {} follows only its first edge {}; {} is ignored",
                                    node.id, first.id, edge.id
                                ),
                            )
                            .on_node(&node.id)
                            .on_edge(&edge.id),
                        );
                    }
                }
            }
        }
    }

    for node_id in graph.unreachable_nodes() {
        diags.push(
            Diagnostic::warning("W103", format!("Unreachable node: {}", node_id)).on_node(node_id),
        );
    }

    diags
}
