use crate::error::{EcoError, RecordId, Result, RulesError};
use crate::loader::OpeningRecord;
use crate::rules::{tokenize_move_text, RulesProvider, ShakmatyRules};
use crate::types::{EdgeInsert, FrozenGraph, OpeningLabel, PositionGraph};
use serde::Serialize;
use std::collections::HashMap;

/// How often build progress is logged
const PROGRESS_EVERY: usize = 500;

/// Why a record did not fully merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Nothing could be replayed; the record was dropped
    MoveParse,
    /// A later token failed; the replayed prefix stays in the graph
    IllegalMidLine,
}

/// Per-record diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub record: RecordId,
    pub kind: FailureKind,
    /// Plies merged before the failure
    pub plies: usize,
    pub reason: String,
}

/// Outcome of folding one record into the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Every token replayed
    Merged { plies: usize, label_attached: bool },
    /// Record dropped before any move was merged
    Dropped { reason: String },
    /// Stopped at an illegal token after `plies` moves
    Truncated { plies: usize, error: RulesError },
}

/// Run-level counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Records replayed to the end
    pub processed: usize,

    /// Records with a parse failure or an illegal move
    pub skipped: usize,

    pub parse_failures: usize,
    pub illegal_mid_line: usize,

    /// Labels newly attached to terminal nodes
    pub labels_attached: usize,

    /// Fully replayed records whose name was already present at their node
    pub duplicate_labels: usize,

    pub unique_positions: usize,

    pub failures: Vec<RecordFailure>,
}

impl BuildReport {
    fn record(&mut self, id: RecordId, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Merged {
                label_attached: true,
                ..
            } => {
                self.processed += 1;
                self.labels_attached += 1;
            }
            RecordOutcome::Merged { .. } => {
                self.processed += 1;
                self.duplicate_labels += 1;
            }
            RecordOutcome::Dropped { reason } => {
                self.skipped += 1;
                self.parse_failures += 1;
                log::warn!("Skipping {}: {}", id, reason);
                self.failures.push(RecordFailure {
                    record: id,
                    kind: FailureKind::MoveParse,
                    plies: 0,
                    reason: reason.clone(),
                });
            }
            RecordOutcome::Truncated { plies, error } => {
                self.skipped += 1;
                self.illegal_mid_line += 1;
                log::warn!("Truncated {} after {} plies: {}", id, plies, error);
                self.failures.push(RecordFailure {
                    record: id,
                    kind: FailureKind::IllegalMidLine,
                    plies: *plies,
                    reason: error.to_string(),
                });
            }
        }
    }
}

/// Folds opening records into a transposition-merged position graph
pub struct GraphBuilder<R: RulesProvider = ShakmatyRules> {
    rules: R,
}

impl GraphBuilder<ShakmatyRules> {
    pub fn standard() -> Self {
        Self::new(ShakmatyRules)
    }
}

impl<R: RulesProvider> GraphBuilder<R> {
    pub fn new(rules: R) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Empty graph rooted at the initial position
    pub fn empty_graph(&self) -> PositionGraph {
        PositionGraph::new(self.rules.canonical_key(&self.rules.initial()))
    }

    /// Build graph from records
    pub fn build(&self, records: &[OpeningRecord]) -> Result<(FrozenGraph, BuildReport)> {
        let mut graph = self.empty_graph();
        let mut report = self.merge_all(&mut graph, records)?;

        if !records.is_empty() && report.processed == 0 {
            return Err(EcoError::NoRecordsProcessed {
                skipped: report.skipped,
            });
        }

        graph.validate()?;
        log::debug!("Graph invariants hold");

        report.unique_positions = graph.node_count();
        log::info!(
            "Finished processing {} ECO openings ({} skipped)",
            report.processed,
            report.skipped
        );
        log::info!(
            "Total unique positions (transpositions merged): {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok((graph.freeze(), report))
    }

    /// Merge records into an existing graph, in order
    pub fn merge_all(
        &self,
        graph: &mut PositionGraph,
        records: &[OpeningRecord],
    ) -> Result<BuildReport> {
        log::info!("Building move graph from {} ECO lines", records.len());

        let mut report = BuildReport::default();
        for (index, record) in records.iter().enumerate() {
            let id = RecordId {
                index,
                eco: record.eco.clone(),
                name: record.name.clone(),
            };
            let outcome = self.merge_record(graph, &id, record)?;
            report.record(id, &outcome);

            if matches!(outcome, RecordOutcome::Merged { .. })
                && report.processed % PROGRESS_EVERY == 0
            {
                log::info!("Processed {} openings...", report.processed);
            }
        }

        report.unique_positions = graph.node_count();
        Ok(report)
    }

    /// Replay one record and fold it into the graph
    ///
    /// Only a conflicting edge is an error; bad move text is reported
    /// through the outcome. The whole line is replayed and checked against
    /// the graph before anything is written, so an aborted record leaves the
    /// graph as it was.
    pub fn merge_record(
        &self,
        graph: &mut PositionGraph,
        id: &RecordId,
        record: &OpeningRecord,
    ) -> Result<RecordOutcome> {
        let tokens = tokenize_move_text(&record.moves);
        if tokens.is_empty() {
            return Ok(RecordOutcome::Dropped {
                reason: "no moves in move text".to_string(),
            });
        }

        let mut position = self.rules.initial();
        let mut steps: Vec<(String, String)> = Vec::with_capacity(tokens.len());
        let mut stopped = None;

        for (ply, token) in tokens.iter().enumerate() {
            match self.rules.apply(&position, token) {
                Ok(applied) => {
                    steps.push((applied.notation, applied.key));
                    position = applied.position;
                }
                Err(error) if ply == 0 => {
                    return Ok(RecordOutcome::Dropped {
                        reason: error.to_string(),
                    })
                }
                Err(error) => {
                    stopped = Some((ply, error));
                    break;
                }
            }
        }

        check_line(graph, id, &steps)?;

        let mut current = graph.root();
        for (notation, key) in &steps {
            let depth = graph.get_node(current).map_or(0, |node| node.depth) + 1;
            let (next, _) = graph.ensure_node(key, depth);
            if let EdgeInsert::Conflict { existing } = graph.insert_edge(current, notation, next) {
                return Err(EcoError::Inconsistent(format!(
                    "edge {notation} already leads to {existing} after the line was checked"
                )));
            }
            current = next;
        }

        if let Some((plies, error)) = stopped {
            return Ok(RecordOutcome::Truncated { plies, error });
        }

        let label_attached = graph.attach_label(
            current,
            OpeningLabel {
                eco: record.eco.clone(),
                name: record.name.clone(),
                full_line: record.moves.clone(),
            },
        );

        Ok(RecordOutcome::Merged {
            plies: tokens.len(),
            label_attached,
        })
    }
}

/// Walk a replayed line against the graph without touching it
///
/// Edges the line itself would add count too, so a line that revisits a
/// key with a different continuation is caught here as well.
fn check_line(graph: &PositionGraph, id: &RecordId, steps: &[(String, String)]) -> Result<()> {
    let mut pending: HashMap<(&str, &str), &str> = HashMap::new();
    let mut from = graph.root_key();

    for (notation, key) in steps {
        let existing = graph
            .node(from)
            .and_then(|node| node.moves.get(notation))
            .map(String::as_str)
            .or_else(|| pending.get(&(from, notation.as_str())).copied());

        match existing {
            Some(existing) if existing != key => {
                return Err(EcoError::GraphInconsistency {
                    record: id.clone(),
                    from: from.to_string(),
                    notation: notation.clone(),
                    existing: existing.to_string(),
                    attempted: key.clone(),
                });
            }
            Some(_) => {}
            None => {
                pending.insert((from, notation.as_str()), key.as_str());
            }
        }
        from = key;
    }

    Ok(())
}
