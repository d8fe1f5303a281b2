use crate::error::{EcoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// First field of the header row in the lichess ECO datasets
pub const HEADER_SENTINEL: &str = "eco";

/// One labeled opening line from the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningRecord {
    /// ECO code (e.g., "B00")
    pub eco: String,

    /// Opening name (e.g., "King's Pawn")
    pub name: String,

    /// Move text in SAN, optionally with move numbers (e.g., "1. e4 e5")
    pub moves: String,
}

impl OpeningRecord {
    pub fn new(eco: impl Into<String>, name: impl Into<String>, moves: impl Into<String>) -> Self {
        Self {
            eco: eco.into(),
            name: name.into(),
            moves: moves.into(),
        }
    }
}

/// A row that was dropped because it had fewer than three fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    /// 1-based line number within its source
    pub line: usize,
    pub fields: usize,
}

/// Result of loading one or more dataset files
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub records: Vec<OpeningRecord>,
    pub malformed: Vec<MalformedRow>,
}

impl LoadOutcome {
    fn extend(&mut self, other: LoadOutcome) {
        self.records.extend(other.records);
        self.malformed.extend(other.malformed);
    }
}

/// Parse tab-separated ECO rows, skipping the header and malformed rows
pub fn parse_records(text: &str) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if idx == 0 && line.starts_with(HEADER_SENTINEL) {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            log::warn!(
                "Dropping malformed row at line {} ({} fields)",
                idx + 1,
                fields.len()
            );
            outcome.malformed.push(MalformedRow {
                line: idx + 1,
                fields: fields.len(),
            });
            continue;
        }

        outcome
            .records
            .push(OpeningRecord::new(fields[0], fields[1], fields[2]));
    }

    outcome
}

/// Load records from a single TSV file
pub fn load_records_from_path(path: impl AsRef<Path>) -> Result<LoadOutcome> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| EcoError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let outcome = parse_records(&text);
    log::info!(
        "Parsed {}: {} records, {} malformed rows",
        path.display(),
        outcome.records.len(),
        outcome.malformed.len()
    );
    Ok(outcome)
}

/// Load and concatenate records from several TSV files, in the given order
pub fn load_records_from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<LoadOutcome> {
    let mut outcome = LoadOutcome::default();
    for path in paths {
        outcome.extend(load_records_from_path(path)?);
    }
    Ok(outcome)
}
