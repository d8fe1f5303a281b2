//! # ECO Graph
//!
//! Canonical opening-classification database: a position graph in which
//! transposed move orders collapse into one node.
//!
//! ## Architecture
//!
//! ```text
//! TSV rows (eco, name, moves)
//!     │
//!     ├──> Record Loader
//!     │      └─ Drop malformed rows, keep order
//!     │
//!     ├──> Graph Builder ──(per move)──> Rules Provider (shakmaty)
//!     │      ├─ Replay each line from the initial position
//!     │      ├─ Merge positions by canonical FEN
//!     │      └─ Label the terminal node
//!     │
//!     ├──> Position Graph (petgraph), frozen after the build
//!     │
//!     └──> Exporter / Opening Book
//!            ├─ eco_theory.json (fen -> node)
//!            ├─ eco_index.json  (eco -> entries)
//!            └─ Identify openings by FEN
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use eco_graph::{load_records_from_paths, write_artifacts, ExportConfig, GraphBuilder};
//!
//! fn main() -> eco_graph::Result<()> {
//!     let loaded = load_records_from_paths(&["a.tsv", "b.tsv"])?;
//!     let (graph, report) = GraphBuilder::standard().build(&loaded.records)?;
//!     write_artifacts(&graph, &ExportConfig::default())?;
//!
//!     println!("{} positions, {} skipped", report.unique_positions, report.skipped);
//!     Ok(())
//! }
//! ```

mod builder;
mod error;
mod export;
mod graph;
mod loader;
mod lookup;
mod rules;
mod types;

pub use builder::{BuildReport, FailureKind, GraphBuilder, RecordFailure, RecordOutcome};
pub use error::{EcoError, RecordId, Result, RulesError};
pub use export::{
    graph_artifact, index_artifact, to_json_bytes, write_artifacts, ExportConfig,
    ExportedArtifacts, GraphArtifact, IndexArtifact, IndexEntry, NodeArtifact,
};
pub use loader::{
    load_records_from_path, load_records_from_paths, parse_records, LoadOutcome, MalformedRow,
    OpeningRecord, HEADER_SENTINEL,
};
pub use lookup::{OpeningBook, OpeningMatch};
pub use rules::{tokenize_move_text, AppliedMove, RulesProvider, ShakmatyRules};
pub use types::{EdgeInsert, FrozenGraph, MoveEdge, OpeningLabel, PositionGraph, PositionNode};
