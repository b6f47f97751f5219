use std::collections::HashSet;

use crate::domain::model::{Flow, NodeKind};

use super::types::Diagnostic;

/// Node-level and reference checks that do not need a graph.
pub(super) fn validate(flow: &Flow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let starts: Vec<&str> = flow
        .nodes
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::Start))
        .map(|n| n.id.as_str())
        .collect();
    match starts.as_slice() {
        [] => diags.push(Diagnostic::error("E002", "No start node found")),
        [_] => {}
        [first, rest @ ..] => {
            for extra in rest {
                diags.push(
                    Diagnostic::warning(
                        "W001",
                        format!("Multiple start nodes; only {} is used", first),
                    )
                    .on_node(*extra),
                );
            }
        }
    }

    let mut ids = HashSet::new();
    for node in &flow.nodes {
        if !ids.insert(node.id.as_str()) {
            diags.push(
                Diagnostic::error("E003", format!("Duplicate node id: {}", node.id))
                    .on_node(&node.id),
            );
        }
    }

    for edge in &flow.edges {
        if !ids.contains(edge.source.as_str()) {
            diags.push(
                Diagnostic::error("E004", format!("Edge source not found: {}", edge.source))
                    .on_edge(&edge.id),
            );
        }
        if !ids.contains(edge.target.as_str()) {
            diags.push(
                Diagnostic::error("E005", format!("Edge target not found: {}", edge.target))
                    .on_edge(&edge.id),
            );
        }
    }

    diags
}
