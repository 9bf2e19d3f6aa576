//! Merging per-batch results and coverage accounting

use crate::annotation::BatchFailure;
use crate::annotation::TurnAnnotation;
use serde::Deserialize;
use serde::Serialize;

/// Coverage of an interview: how many turns were successfully annotated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    /// Turns with a successful annotation
    pub analyzed_turns: usize,
    /// Total turns in the interview
    pub total_turns: usize,
}

impl Coverage {
    /// Coverage percentage. An interview with zero turns is vacuously
    /// covered (100.0), so empty documents never flag as low coverage.
    pub fn percentage(&self) -> f64 {
        if self.total_turns == 0 {
            return 100.0;
        }
        100.0 * self.analyzed_turns as f64 / self.total_turns as f64
    }

    /// Whether every turn was annotated
    pub fn is_complete(&self) -> bool {
        self.analyzed_turns == self.total_turns
    }
}

/// Outcome of one batch call, fed to the merger
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// The batch call succeeded with these per-turn annotations
    Annotated(Vec<TurnAnnotation>),
    /// The batch call failed after exhausting retries
    Failed(BatchFailure),
}

/// Merged per-turn results for one interview
#[derive(Debug, Clone)]
pub struct MergedAnnotations {
    /// Successful annotations in turn order
    pub turns: Vec<TurnAnnotation>,
    /// Batches that failed after retries, in batch order
    pub failed_batches: Vec<BatchFailure>,
    /// Coverage over the whole interview
    pub coverage: Coverage,
}

/// Concatenate per-batch results in turn order and recompute coverage.
///
/// Pure aggregation: batches are non-overlapping and arrive in batch order,
/// so no conflict resolution is needed. The coverage numerator counts only
/// turns from successful batches; `analyzed_turns <= total_turns` holds by
/// construction.
pub fn merge_batch_outcomes(total_turns: usize, outcomes: Vec<BatchOutcome>) -> MergedAnnotations {
    let mut turns = Vec::new();
    let mut failed_batches = Vec::new();

    for outcome in outcomes {
        match outcome {
            BatchOutcome::Annotated(mut annotations) => turns.append(&mut annotations),
            BatchOutcome::Failed(failure) => failed_batches.push(failure),
        }
    }

    turns.sort_by_key(|t| t.turn_index);
    let analyzed_turns = turns.len().min(total_turns);

    MergedAnnotations {
        turns,
        failed_batches,
        coverage: Coverage {
            analyzed_turns,
            total_turns,
        },
    }
}
