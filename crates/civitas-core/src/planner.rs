//! Batch planning over interview turns

use serde::Deserialize;
use serde::Serialize;
use std::ops::Range;

/// A fixed-size group of consecutive turns submitted together in one LLM
/// call. Ephemeral: batches exist only while annotation calls are in flight
/// and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnBatch {
    /// Zero-based batch position within the interview
    pub index: usize,
    /// First turn index covered by this batch (inclusive)
    pub start: usize,
    /// One past the last turn index covered by this batch
    pub end: usize,
}

impl TurnBatch {
    /// The turn index range covered by this batch
    pub fn turn_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Number of turns in this batch
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the batch covers no turns
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Partition `total_turns` turns into consecutive, non-overlapping batches
/// of size ≤ `batch_size`; the last batch may be smaller.
///
/// Deterministic and order-preserving: re-planning the same inputs yields
/// identical boundaries. Zero turns yields zero batches. `batch_size` must
/// be nonzero; config validation rejects zero before the planner runs.
pub fn plan_batches(total_turns: usize, batch_size: usize) -> Vec<TurnBatch> {
    assert!(batch_size > 0, "batch_size must be nonzero");

    (0..total_turns)
        .step_by(batch_size)
        .enumerate()
        .map(|(index, start)| TurnBatch {
            index,
            start,
            end: (start + batch_size).min(total_turns),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_partition() {
        let batches = plan_batches(16, 4);
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[0], TurnBatch { index: 0, start: 0, end: 4 });
        assert_eq!(batches[3], TurnBatch { index: 3, start: 12, end: 16 });
        assert!(batches.iter().all(|b| b.len() == 4));
    }

    #[test]
    fn test_last_batch_may_be_smaller() {
        let batches = plan_batches(10, 4);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].turn_range(), 8..10);
        assert_eq!(batches[2].len(), 2);
    }

    #[test]
    fn test_empty_input_yields_zero_batches() {
        assert!(plan_batches(0, 4).is_empty());
    }

    #[test]
    fn test_partition_is_idempotent_and_gapless() {
        let first = plan_batches(37, 5);
        let second = plan_batches(37, 5);
        assert_eq!(first, second);

        // Consecutive, non-overlapping, and covering every turn exactly once
        let mut expected_start = 0;
        for batch in &first {
            assert_eq!(batch.start, expected_start);
            expected_start = batch.end;
        }
        assert_eq!(expected_start, 37);
    }

    #[test]
    fn test_batch_larger_than_interview() {
        let batches = plan_batches(3, 10);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].turn_range(), 0..3);
    }
}
