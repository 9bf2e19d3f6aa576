//! Quality validation and the per-interview state machine

use crate::merge::Coverage;
use serde::Deserialize;
use serde::Serialize;

/// Thresholds applied to a merged interview annotation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum acceptable coverage percentage
    pub min_coverage_pct: f64,
    /// Minimum acceptable mean turn confidence
    pub min_confidence: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_coverage_pct: 95.0,
            min_confidence: 0.5,
        }
    }
}

/// Outcome of quality validation for one interview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Derived quality score (1.0, 0.95, or 0.85)
    pub quality_score: f64,
    /// Human-readable issues; empty when the interview is accepted
    pub issues: Vec<String>,
}

impl QualityReport {
    /// Whether the interview passed validation without issues
    pub fn is_accepted(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Pipeline state of one interview.
///
/// `Pending → InProgress → Merged → Validated → {Accepted | FlaggedForReview}`.
/// Accepted and FlaggedForReview are terminal; a flagged interview is not
/// retried automatically and needs an external rerun of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewState {
    /// Loaded, not yet submitted
    Pending,
    /// Per-batch annotation calls in flight
    InProgress,
    /// Batch results merged, coverage computed
    Merged,
    /// Thresholds applied
    Validated,
    /// Terminal: passed validation
    Accepted,
    /// Terminal: failed one or more threshold checks
    FlaggedForReview,
}

impl InterviewState {
    /// Whether a transition from `self` to `next` is allowed
    pub fn can_transition_to(self, next: InterviewState) -> bool {
        use InterviewState::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Merged)
                | (Merged, Validated)
                | (Validated, Accepted)
                | (Validated, FlaggedForReview)
        )
    }

    /// Whether this state is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::FlaggedForReview)
    }
}

/// Apply fixed thresholds to coverage and mean confidence.
///
/// The quality score is a deterministic lookup, not a weighted model:
/// full coverage scores 1.0, partial-but-acceptable coverage 0.95, and
/// anything below the coverage threshold 0.85; low confidence caps the
/// score at 0.85.
pub fn validate_quality(
    coverage: Coverage,
    overall_confidence: f64,
    thresholds: &QualityThresholds,
) -> QualityReport {
    let pct = coverage.percentage();
    let mut issues = Vec::new();

    if pct < thresholds.min_coverage_pct {
        issues.push(format!("Low turn coverage: {pct:.1}%"));
    }
    let confident = coverage.analyzed_turns == 0 || overall_confidence >= thresholds.min_confidence;
    if !confident {
        issues.push("Low confidence".to_string());
    }

    let coverage_score: f64 = if coverage.is_complete() {
        1.0
    } else if pct >= thresholds.min_coverage_pct {
        0.95
    } else {
        0.85
    };
    let quality_score = if confident {
        coverage_score
    } else {
        coverage_score.min(0.85)
    };

    QualityReport {
        quality_score,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(analyzed: usize, total: usize) -> Coverage {
        Coverage {
            analyzed_turns: analyzed,
            total_turns: total,
        }
    }

    #[test]
    fn test_full_coverage_scores_one_with_no_issues() {
        let report = validate_quality(coverage(8, 8), 0.9, &QualityThresholds::default());
        assert_eq!(report.quality_score, 1.0);
        assert!(report.issues.is_empty());
        assert!(report.is_accepted());
    }

    #[test]
    fn test_low_coverage_flag_present_iff_below_threshold() {
        // 12 of 16 turns analyzed: 75.0%
        let report = validate_quality(coverage(12, 16), 0.9, &QualityThresholds::default());
        assert_eq!(report.quality_score, 0.85);
        assert_eq!(report.issues, vec!["Low turn coverage: 75.0%"]);

        // Exactly at threshold: no flag
        let report = validate_quality(coverage(19, 20), 0.9, &QualityThresholds::default());
        assert!(report.issues.is_empty());
        assert_eq!(report.quality_score, 0.95);
    }

    #[test]
    fn test_low_confidence_caps_score() {
        let report = validate_quality(coverage(8, 8), 0.3, &QualityThresholds::default());
        assert_eq!(report.quality_score, 0.85);
        assert_eq!(report.issues, vec!["Low confidence"]);
    }

    #[test]
    fn test_empty_interview_is_accepted() {
        let report = validate_quality(coverage(0, 0), 0.0, &QualityThresholds::default());
        assert!(report.is_accepted());
        assert_eq!(report.quality_score, 1.0);
    }

    #[test]
    fn test_state_machine_transitions() {
        use InterviewState::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Merged));
        assert!(Merged.can_transition_to(Validated));
        assert!(Validated.can_transition_to(Accepted));
        assert!(Validated.can_transition_to(FlaggedForReview));

        assert!(!Pending.can_transition_to(Merged));
        assert!(!Accepted.can_transition_to(InProgress));
        assert!(!FlaggedForReview.can_transition_to(Validated));

        assert!(Accepted.is_terminal());
        assert!(FlaggedForReview.is_terminal());
        assert!(!Merged.is_terminal());
    }
}
