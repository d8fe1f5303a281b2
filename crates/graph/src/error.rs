use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EcoError>;

/// Identity of an input record, used in diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordId {
    /// Position of the record in the input sequence (0-based)
    pub index: usize,
    pub eco: String,
    pub name: String,
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} ({})", self.index, self.eco, self.name)
    }
}

#[derive(Error, Debug)]
pub enum EcoError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Graph inconsistency at record {record}: move {notation} from {from} \
         already leads to {existing}, rules produced {attempted}"
    )]
    GraphInconsistency {
        record: RecordId,
        from: String,
        notation: String,
        existing: String,
        attempted: String,
    },

    #[error("Graph invariant violated: {0}")]
    Inconsistent(String),

    #[error("No records could be processed ({skipped} skipped)")]
    NoRecordsProcessed { skipped: usize },

    #[error("Failed to export {artifact}: {source}")]
    Export {
        artifact: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by a rules provider for a single move token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Unparseable move token: {0}")]
    Unparseable(String),

    #[error("Illegal move {token} in position {fen}")]
    Illegal { token: String, fen: String },
}
