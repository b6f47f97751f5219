use petgraph::stable_graph::NodeIndex;

/// An edge of the flow graph, as stored in the petgraph index.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    /// Position of the edge in the flow document. Successor lookups follow
    /// document order.
    pub order: usize,
}

/// Edge type derived from the `sourceHandle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeType {
    Normal,
    /// Condition node `true` branch
    TrueBranch,
    /// Condition node `false` branch
    FalseBranch,
}

impl EdgeType {
    pub fn from_source_handle(handle: &Option<String>) -> Self {
        match handle.as_deref() {
            Some("true") => EdgeType::TrueBranch,
            Some("false") => EdgeType::FalseBranch,
            _ => EdgeType::Normal,
        }
    }

    pub fn branch(result: bool) -> Self {
        if result {
            EdgeType::TrueBranch
        } else {
            EdgeType::FalseBranch
        }
    }
}

/// Node id to petgraph `NodeIndex` mapping.
pub type NodeIndexMap = std::collections::HashMap<String, NodeIndex>;
