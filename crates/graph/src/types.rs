use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// Opening classification attached to the node where its line ends
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpeningLabel {
    /// ECO code (e.g., "C20")
    pub eco: String,

    /// Opening name, unique per node
    pub name: String,

    /// Literal move text of the record that produced this label
    pub full_line: String,
}

/// Position in the opening graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionNode {
    /// Canonical position key (full FEN)
    pub fen: String,

    /// Ply count from the initial position, taken at first arrival
    pub depth: usize,

    /// Move notation -> child key
    pub moves: BTreeMap<String, String>,

    /// Openings that terminate exactly here
    pub openings: Vec<OpeningLabel>,
}

impl PositionNode {
    pub fn new(fen: impl Into<String>, depth: usize) -> Self {
        Self {
            fen: fen.into(),
            depth,
            moves: BTreeMap::new(),
            openings: Vec::new(),
        }
    }

    pub fn has_opening(&self, name: &str) -> bool {
        self.openings.iter().any(|op| op.name == name)
    }
}

/// Most specific label: the longest name, ties going to the greater name
pub fn most_specific(labels: &[OpeningLabel]) -> Option<&OpeningLabel> {
    labels
        .iter()
        .max_by(|a, b| {
            a.name
                .chars()
                .count()
                .cmp(&b.name.chars().count())
                .then_with(|| a.name.cmp(&b.name))
        })
}

/// Edge in the position graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEdge {
    /// Move notation (SAN)
    pub notation: String,
}

/// Result of inserting an edge for a (node, notation) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeInsert {
    Added,
    /// Edge already present with the same target
    Existing,
    /// Edge already present with a different target
    Conflict { existing: String },
}

/// Mutable position graph, owned by the builder while it grows
///
/// Nodes, edges and labels are only ever added.
#[derive(Debug, Clone)]
pub struct PositionGraph {
    /// Directed graph (position -> position, labeled by move)
    pub(crate) graph: DiGraph<PositionNode, MoveEdge>,

    /// Canonical key -> NodeIndex, ordered for deterministic iteration
    pub(crate) key_index: BTreeMap<String, NodeIndex>,

    pub(crate) root: NodeIndex,
}

impl PositionGraph {
    /// Create a graph holding only the root position
    pub fn new(root_key: impl Into<String>) -> Self {
        let root_key = root_key.into();
        let mut graph = DiGraph::new();
        let root = graph.add_node(PositionNode::new(root_key.clone(), 0));

        let mut key_index = BTreeMap::new();
        key_index.insert(root_key, root);

        Self {
            graph,
            key_index,
            root,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_key(&self) -> &str {
        &self.graph[self.root].fen
    }

    /// Find node by canonical key
    pub fn find_node(&self, key: &str) -> Option<NodeIndex> {
        self.key_index.get(key).copied()
    }

    pub fn get_node(&self, idx: NodeIndex) -> Option<&PositionNode> {
        self.graph.node_weight(idx)
    }

    /// Get node data by canonical key
    pub fn node(&self, key: &str) -> Option<&PositionNode> {
        self.find_node(key).and_then(|idx| self.get_node(idx))
    }

    /// Get or create the node for `key`; returns whether it was created
    pub fn ensure_node(&mut self, key: &str, depth: usize) -> (NodeIndex, bool) {
        if let Some(idx) = self.find_node(key) {
            return (idx, false);
        }

        let idx = self.graph.add_node(PositionNode::new(key, depth));
        self.key_index.insert(key.to_string(), idx);
        (idx, true)
    }

    /// Record that `notation` played at `from` leads to `to`
    ///
    /// The first write for a (node, notation) pair wins; later writes must
    /// agree with it.
    pub fn insert_edge(&mut self, from: NodeIndex, notation: &str, to: NodeIndex) -> EdgeInsert {
        let to_key = self.graph[to].fen.clone();

        if let Some(existing) = self.graph[from].moves.get(notation) {
            if *existing == to_key {
                return EdgeInsert::Existing;
            }
            return EdgeInsert::Conflict {
                existing: existing.clone(),
            };
        }

        self.graph[from].moves.insert(notation.to_string(), to_key);
        self.graph.add_edge(
            from,
            to,
            MoveEdge {
                notation: notation.to_string(),
            },
        );
        EdgeInsert::Added
    }

    /// Attach an opening label unless the node already has one with that name
    pub fn attach_label(&mut self, idx: NodeIndex, label: OpeningLabel) -> bool {
        let node = &mut self.graph[idx];
        if node.has_opening(&label.name) {
            return false;
        }
        node.openings.push(label);
        true
    }

    /// All nodes in ascending key order
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &PositionNode)> {
        self.key_index
            .iter()
            .map(move |(key, &idx)| (key.as_str(), &self.graph[idx]))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Total number of opening labels across all nodes
    pub fn label_count(&self) -> usize {
        self.graph
            .node_weights()
            .map(|node| node.openings.len())
            .sum()
    }

    /// Stop accepting mutations
    pub fn freeze(self) -> FrozenGraph {
        FrozenGraph { inner: self }
    }
}

/// Read-only view handed to the exporter and lookup
#[derive(Debug, Clone)]
pub struct FrozenGraph {
    inner: PositionGraph,
}

impl Deref for FrozenGraph {
    type Target = PositionGraph;

    fn deref(&self) -> &PositionGraph {
        &self.inner
    }
}
