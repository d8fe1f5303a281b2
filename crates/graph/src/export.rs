use crate::error::{EcoError, Result};
use crate::types::{FrozenGraph, OpeningLabel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Serialized form of a position node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeArtifact {
    pub fen: String,
    pub moves: BTreeMap<String, String>,
    pub openings: Vec<OpeningLabel>,
    pub depth: usize,
}

/// Full graph artifact: canonical key -> node
pub type GraphArtifact = BTreeMap<String, NodeArtifact>;

/// One named opening in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub eco: String,
    pub fen: String,
    pub moves: String,
}

/// Index artifact: ECO code -> entries, shortest names first
pub type IndexArtifact = BTreeMap<String, Vec<IndexEntry>>;

/// Where and under which names the artifacts are written
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub out_dir: PathBuf,
    pub graph_file: String,
    pub index_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("public/data"),
            graph_file: "eco_theory.json".to_string(),
            index_file: "eco_index.json".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            ..Self::default()
        }
    }

    pub fn graph_path(&self) -> PathBuf {
        self.out_dir.join(&self.graph_file)
    }

    pub fn index_path(&self) -> PathBuf {
        self.out_dir.join(&self.index_file)
    }
}

/// Paths of the artifacts that were written
#[derive(Debug, Clone, Serialize)]
pub struct ExportedArtifacts {
    pub graph: PathBuf,
    pub index: PathBuf,
}

/// Reshape the graph into its serialized form
///
/// Labels are written sorted by code, name and line rather than in arrival
/// order, so the artifact does not depend on record order.
pub fn graph_artifact(graph: &FrozenGraph) -> GraphArtifact {
    graph
        .nodes()
        .map(|(key, node)| {
            let mut openings = node.openings.clone();
            openings.sort_by(|a, b| {
                (&a.eco, &a.name, &a.full_line).cmp(&(&b.eco, &b.name, &b.full_line))
            });
            (
                key.to_string(),
                NodeArtifact {
                    fen: node.fen.clone(),
                    moves: node.moves.clone(),
                    openings,
                    depth: node.depth,
                },
            )
        })
        .collect()
}

/// Group every opening label by ECO code
///
/// A name appears once per code: nodes are visited in key order and the first
/// occurrence wins. Entries are ordered by name length (in characters), then
/// by name and key so that equal lengths stay reproducible.
pub fn index_artifact(graph: &FrozenGraph) -> IndexArtifact {
    let mut index = IndexArtifact::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for (key, node) in graph.nodes() {
        for op in &node.openings {
            if !seen.insert((op.eco.as_str(), op.name.as_str())) {
                continue;
            }
            index.entry(op.eco.clone()).or_default().push(IndexEntry {
                name: op.name.clone(),
                eco: op.eco.clone(),
                fen: key.to_string(),
                moves: op.full_line.clone(),
            });
        }
    }

    for entries in index.values_mut() {
        entries.sort_by(|a, b| {
            a.name
                .chars()
                .count()
                .cmp(&b.name.chars().count())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.fen.cmp(&b.fen))
        });
    }

    index
}

/// Pretty JSON with two-space indent and a trailing newline
pub fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write both artifacts
///
/// Each file is staged next to its destination and renamed into place, so a
/// failure never leaves a truncated artifact behind.
pub fn write_artifacts(graph: &FrozenGraph, config: &ExportConfig) -> Result<ExportedArtifacts> {
    let graph_path = config.graph_path();
    log::info!("Exporting graph to {}", graph_path.display());
    write_json_atomic(&graph_path, &graph_artifact(graph))?;

    let index_path = config.index_path();
    log::info!("Exporting index to {}", index_path.display());
    write_json_atomic(&index_path, &index_artifact(graph))?;

    Ok(ExportedArtifacts {
        graph: graph_path,
        index: index_path,
    })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = to_json_bytes(value)?;
    let export_err = |source: std::io::Error| EcoError::Export {
        artifact: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(export_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(export_err)?;
    tmp.write_all(&bytes).map_err(export_err)?;
    tmp.flush().map_err(export_err)?;
    tmp.persist(path).map_err(|err| export_err(err.error))?;

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
