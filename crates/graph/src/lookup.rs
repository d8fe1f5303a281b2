use crate::error::{EcoError, Result};
use crate::export::{graph_artifact, GraphArtifact, NodeArtifact};
use crate::types::{most_specific, FrozenGraph};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;

/// Confidence of a match that ignored the move counters
const COUNTERS_IGNORED: f32 = 0.9;

/// Confidence lost per ply when the opening is inherited from an ancestor
const INHERITED_DECAY: f32 = 0.8;

/// Opening identified for a position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningMatch {
    pub opening_name: String,
    pub eco_code: String,
    pub full_san_line: String,
    /// Key of the matched node
    pub fen: String,
    /// Depth of the node carrying the opening
    pub matching_depth: usize,
    /// 1.0 for an exact key with its own label; lower when the move counters
    /// were ignored or the opening was inherited from an earlier position
    pub confidence: f32,
    /// Other openings that end in the same position
    pub transpositions: Vec<String>,
    /// Theory moves available from here
    pub next_moves: Vec<String>,
}

/// Read-side view over a built or exported graph
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    nodes: GraphArtifact,

    /// Placement, side, castling and en-passant fields -> smallest full key
    by_position: BTreeMap<String, String>,

    /// Child key -> parent keys, ascending
    parents: BTreeMap<String, Vec<String>>,
}

impl OpeningBook {
    pub fn from_artifact(nodes: GraphArtifact) -> Self {
        let mut by_position = BTreeMap::new();
        let mut parents: BTreeMap<String, Vec<String>> = BTreeMap::new();
        // Keys iterate in ascending order, so the first insert is the smallest
        // and parent lists come out sorted
        for (key, node) in &nodes {
            by_position
                .entry(position_fields(key))
                .or_insert_with(|| key.clone());
            for child in node.moves.values() {
                let list = parents.entry(child.clone()).or_default();
                if !list.contains(key) {
                    list.push(key.clone());
                }
            }
        }
        Self {
            nodes,
            by_position,
            parents,
        }
    }

    pub fn from_graph(graph: &FrozenGraph) -> Self {
        Self::from_artifact(graph_artifact(graph))
    }

    /// Load a full graph artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EcoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let nodes: GraphArtifact = serde_json::from_str(&text)?;
        log::info!("ECO theory loaded: {} positions", nodes.len());
        Ok(Self::from_artifact(nodes))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find the node for `fen`, falling back to a match that ignores the
    /// halfmove and fullmove counters
    fn resolve(&self, fen: &str) -> Option<(&NodeArtifact, f32)> {
        if let Some(node) = self.nodes.get(fen.trim()) {
            return Some((node, 1.0));
        }
        let key = self.by_position.get(&position_fields(fen))?;
        self.nodes.get(key).map(|node| (node, COUNTERS_IGNORED))
    }

    /// Closest labeled position reached by walking moves backwards from
    /// `key`, with its distance in plies. Ties at equal distance go to the
    /// smallest key.
    pub fn nearest_named_ancestor(&self, key: &str) -> Option<(&NodeArtifact, usize)> {
        let mut queue = VecDeque::from([(key, 0usize)]);
        let mut seen = HashSet::from([key]);

        while let Some((current, distance)) = queue.pop_front() {
            if distance > 0 {
                if let Some(node) = self.nodes.get(current) {
                    if !node.openings.is_empty() {
                        return Some((node, distance));
                    }
                }
            }
            for parent in self.parents.get(current).into_iter().flatten() {
                if seen.insert(parent.as_str()) {
                    queue.push_back((parent.as_str(), distance + 1));
                }
            }
        }

        None
    }

    /// Identify the named opening for `fen`
    ///
    /// The most specific label is reported; the remaining labels on the node
    /// are listed as transpositions. A position past the end of every named
    /// line inherits the opening of its nearest labeled ancestor, with the
    /// confidence scaled down per ply walked back.
    pub fn identify(&self, fen: &str) -> Option<OpeningMatch> {
        let (node, confidence) = self.resolve(fen)?;
        let (named, confidence) = if node.openings.is_empty() {
            let (ancestor, distance) = self.nearest_named_ancestor(&node.fen)?;
            log::debug!(
                "{} inherits its opening from {} plies back",
                node.fen,
                distance
            );
            (ancestor, confidence * INHERITED_DECAY.powi(distance as i32))
        } else {
            (node, confidence)
        };
        let best = most_specific(&named.openings)?;

        Some(OpeningMatch {
            opening_name: best.name.clone(),
            eco_code: best.eco.clone(),
            full_san_line: best.full_line.clone(),
            fen: node.fen.clone(),
            matching_depth: named.depth,
            confidence,
            transpositions: named
                .openings
                .iter()
                .filter(|op| op.name != best.name)
                .map(|op| op.name.clone())
                .collect(),
            next_moves: node.moves.keys().cloned().collect(),
        })
    }

    /// Theory moves from `fen`, empty if the position is unknown
    pub fn theory_moves(&self, fen: &str) -> Vec<String> {
        self.resolve(fen)
            .map(|(node, _)| node.moves.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn position_fields(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OpeningLabel, PositionGraph};

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    const E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
    const E4_E5_NF3: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2";

    fn label(name: &str) -> OpeningLabel {
        OpeningLabel {
            eco: "B00".to_string(),
            name: name.to_string(),
            full_line: "1. e4".to_string(),
        }
    }

    /// root -e4-> E4 (two labels) -e5-> E4_E5 -Nf3-> E4_E5_NF3, none below E4 named
    fn book() -> OpeningBook {
        let mut graph = PositionGraph::new(START);
        let root = graph.root();
        let (e4, _) = graph.ensure_node(E4, 1);
        let (e5, _) = graph.ensure_node(E4_E5, 2);
        let (nf3, _) = graph.ensure_node(E4_E5_NF3, 3);
        graph.insert_edge(root, "e4", e4);
        graph.insert_edge(e4, "e5", e5);
        graph.insert_edge(e5, "Nf3", nf3);
        for name in ["King's Pawn", "King's Pawn Opening"] {
            graph.attach_label(e4, label(name));
        }
        OpeningBook::from_graph(&graph.freeze())
    }

    #[test]
    fn test_identify_exact() {
        let found = book().identify(E4).unwrap();
        assert_eq!(found.opening_name, "King's Pawn Opening");
        assert_eq!(found.eco_code, "B00");
        assert_eq!(found.matching_depth, 1);
        assert_eq!(found.confidence, 1.0);
        assert_eq!(found.transpositions, vec!["King's Pawn".to_string()]);
        assert_eq!(found.next_moves, vec!["e5".to_string()]);
    }

    #[test]
    fn test_identify_ignores_move_counters() {
        let found = book()
            .identify("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 3 9")
            .unwrap();
        assert_eq!(found.confidence, COUNTERS_IGNORED);
        assert_eq!(found.fen, E4);
    }

    #[test]
    fn test_unnamed_position_inherits_ancestor_opening() {
        let book = book();

        let found = book.identify(E4_E5_NF3).unwrap();
        assert_eq!(found.opening_name, "King's Pawn Opening");
        assert_eq!(found.fen, E4_E5_NF3);
        assert_eq!(found.matching_depth, 1);
        assert!(found.next_moves.is_empty());
        assert!(found.confidence < book.identify(E4_E5).unwrap().confidence);
        assert!(found.confidence < 1.0);

        let (ancestor, distance) = book.nearest_named_ancestor(E4_E5_NF3).unwrap();
        assert_eq!(ancestor.fen, E4);
        assert_eq!(distance, 2);
    }

    #[test]
    fn test_ancestor_walk_prefers_closest_label() {
        let mut graph = PositionGraph::new("root");
        let root = graph.root();
        let (a, _) = graph.ensure_node("A", 1);
        let (b, _) = graph.ensure_node("B", 2);
        let (c, _) = graph.ensure_node("C", 1);
        let (d, _) = graph.ensure_node("D", 3);
        graph.insert_edge(root, "a", a);
        graph.insert_edge(a, "b", b);
        graph.insert_edge(root, "c", c);
        graph.insert_edge(c, "d", b);
        graph.insert_edge(b, "e", d);
        graph.attach_label(root, label("Start"));
        graph.attach_label(c, label("Opening C"));
        let book = OpeningBook::from_graph(&graph.freeze());

        let (named, distance) = book.nearest_named_ancestor("D").unwrap();
        assert_eq!(named.fen, "C");
        assert_eq!(distance, 2);
        let (named, distance) = book.nearest_named_ancestor("A").unwrap();
        assert_eq!(named.fen, "root");
        assert_eq!(distance, 1);
    }

    #[test]
    fn test_unnamed_or_unknown_positions() {
        let book = book();
        assert!(book.identify(START).is_none());
        assert!(book.identify("8/8/8/8/8/8/8/8 w - - 0 1").is_none());
        assert!(book.nearest_named_ancestor(START).is_none());
        assert_eq!(book.theory_moves(START), vec!["e4".to_string()]);
        assert!(book.theory_moves("8/8/8/8/8/8/8/8 w - - 0 1").is_empty());
    }
}
