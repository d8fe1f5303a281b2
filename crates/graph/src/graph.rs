use crate::error::{EcoError, Result};
use crate::types::PositionGraph;
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use std::collections::HashSet;

impl PositionGraph {
    /// Check the structural invariants of the graph
    pub fn validate(&self) -> Result<()> {
        let root = &self.graph[self.root];
        if root.depth != 0 {
            return Err(EcoError::Inconsistent(format!(
                "root depth is {}",
                root.depth
            )));
        }
        if self
            .graph
            .neighbors_directed(self.root, Direction::Incoming)
            .next()
            .is_some()
        {
            return Err(EcoError::Inconsistent(
                "root has incoming edges".to_string(),
            ));
        }

        let mut reached = 0usize;
        let mut bfs = Bfs::new(&self.graph, self.root);
        while bfs.next(&self.graph).is_some() {
            reached += 1;
        }
        if reached != self.node_count() {
            return Err(EcoError::Inconsistent(format!(
                "{} of {} nodes unreachable from root",
                self.node_count() - reached,
                self.node_count()
            )));
        }

        for edge in self.graph.edge_references() {
            let from = &self.graph[edge.source()];
            let to = &self.graph[edge.target()];
            if to.depth != from.depth + 1 {
                return Err(EcoError::Inconsistent(format!(
                    "edge {} from depth {} reaches depth {}",
                    edge.weight().notation,
                    from.depth,
                    to.depth
                )));
            }
        }

        for node in self.graph.node_weights() {
            let mut names = HashSet::new();
            for op in &node.openings {
                if !names.insert(op.name.as_str()) {
                    return Err(EcoError::Inconsistent(format!(
                        "duplicate opening {} at {}",
                        op.name, node.fen
                    )));
                }
            }
        }

        Ok(())
    }
}
