use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, EdgeRef};

use crate::domain::model::{Flow, FlowNode, NodeKind};

use super::types::*;

/// Immutable, indexed view of a [`Flow`] used for traversal.
///
/// Duplicate node ids keep the first occurrence. Edges from an unknown
/// node are dropped. Edges from a known node to an unknown target stay in
/// its outgoing order, so a path that picks one simply ends there.
/// `validate_flow` reports both.
#[derive(Debug)]
pub struct FlowGraph {
    pub flow_id: String,
    pub name: String,
    pub graph: StableDiGraph<FlowNode, GraphEdge>,
    pub node_index_map: NodeIndexMap,
    pub start_node_idx: Option<NodeIndex>,
    pub dangling_edges: Vec<String>,
    /// Outgoing edges whose target is not a node, keyed by source id.
    unresolved_out: HashMap<String, Vec<GraphEdge>>,
}

impl FlowGraph {
    pub fn build(flow: &Flow) -> Self {
        let mut graph = StableDiGraph::<FlowNode, GraphEdge>::new();
        let mut node_index_map: HashMap<String, NodeIndex> = HashMap::new();

        for node in &flow.nodes {
            if node_index_map.contains_key(&node.id) {
                continue;
            }
            let idx = graph.add_node(node.clone());
            node_index_map.insert(node.id.clone(), idx);
        }

        let mut dangling_edges = Vec::new();
        let mut unresolved_out: HashMap<String, Vec<GraphEdge>> = HashMap::new();
        for (order, edge) in flow.edges.iter().enumerate() {
            let graph_edge = GraphEdge {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                edge_type: EdgeType::from_source_handle(&edge.source_handle),
                order,
            };
            match (
                node_index_map.get(&edge.source),
                node_index_map.get(&edge.target),
            ) {
                (Some(source_idx), Some(target_idx)) => {
                    graph.add_edge(*source_idx, *target_idx, graph_edge);
                }
                (Some(_), None) => {
                    dangling_edges.push(edge.id.clone());
                    unresolved_out
                        .entry(edge.source.clone())
                        .or_default()
                        .push(graph_edge);
                }
                (None, _) => dangling_edges.push(edge.id.clone()),
            }
        }

        let start_node_idx = flow
            .start_node()
            .and_then(|n| node_index_map.get(&n.id))
            .copied();

        FlowGraph {
            flow_id: flow.id.clone(),
            name: flow.name.clone(),
            graph,
            node_index_map,
            start_node_idx,
            dangling_edges,
            unresolved_out,
        }
    }

    pub fn get_node(&self, node_id: &str) -> Option<&FlowNode> {
        self.node_index_map
            .get(node_id)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn start_node(&self) -> Option<&FlowNode> {
        self.start_node_idx
            .and_then(|idx| self.graph.node_weight(idx))
    }

    /// All outgoing edges of a node in document order.
    pub fn outgoing(&self, node_id: &str) -> Vec<&GraphEdge> {
        let Some(idx) = self.node_index_map.get(node_id) else {
            return Vec::new();
        };
        let mut edges: Vec<&GraphEdge> = self
            .graph
            .edges_directed(*idx, petgraph::Direction::Outgoing)
            .map(|e| e.weight())
            .chain(self.unresolved_out.get(node_id).into_iter().flatten())
            .collect();
        edges.sort_by_key(|e| e.order);
        edges
    }

    /// The first outgoing edge, whatever its handle.
    pub fn first_successor(&self, node_id: &str) -> Option<&str> {
        self.outgoing(node_id)
            .into_iter()
            .next()
            .map(|e| e.target.as_str())
    }

    /// The first outgoing edge of the given type.
    pub fn get_successor_by_edge_type(&self, node_id: &str, edge_type: &EdgeType) -> Option<&str> {
        self.outgoing(node_id)
            .into_iter()
            .find(|e| &e.edge_type == edge_type)
            .map(|e| e.target.as_str())
    }

    /// Targets of every outgoing edge, in document order.
    pub fn get_successors(&self, node_id: &str) -> Vec<&str> {
        self.outgoing(node_id)
            .into_iter()
            .map(|e| e.target.as_str())
            .collect()
    }

    pub fn start_node_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .filter(|n| matches!(n.kind, NodeKind::Start))
            .count()
    }

    /// Ids of nodes not reachable from the start node.
    pub fn unreachable_nodes(&self) -> Vec<String> {
        let Some(start) = self.start_node_idx else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(idx) = bfs.next(&self.graph) {
            seen.insert(idx);
        }
        let mut unreachable: Vec<String> = self
            .graph
            .node_indices()
            .filter(|idx| !seen.contains(idx))
            .filter_map(|idx| self.graph.node_weight(idx).map(|n| n.id.clone()))
            .collect();
        unreachable.sort();
        unreachable
    }
}
