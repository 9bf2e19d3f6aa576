//! Corpus-level validation report

use crate::annotation::InterviewAnnotation;
use crate::validate::InterviewState;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Per-interview metrics surfaced in the corpus report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewMetrics {
    /// Coverage percentage
    pub coverage_percentage: f64,
    /// Turns successfully annotated
    pub analyzed_turns: usize,
    /// Total turns in the interview
    pub total_turns: usize,
    /// Mean turn confidence
    pub overall_confidence: f64,
    /// Cost attributable to the interview in USD
    pub cost_usd: f64,
    /// End-to-end processing time in milliseconds
    pub processing_time_ms: u64,
}

/// One interview's line in the corpus report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSummary {
    /// Interview identifier
    pub interview_id: String,
    /// Terminal pipeline state
    pub state: InterviewState,
    /// Derived quality score
    pub quality_score: f64,
    /// Processing metrics
    pub metrics: InterviewMetrics,
    /// Quality issues, empty when accepted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl InterviewSummary {
    /// Build a summary line from a finalized annotation
    pub fn from_annotation(annotation: &InterviewAnnotation) -> Self {
        Self {
            interview_id: annotation.interview_id.clone(),
            state: annotation.state,
            quality_score: annotation.quality.quality_score,
            metrics: InterviewMetrics {
                coverage_percentage: annotation.stats.coverage_percentage,
                analyzed_turns: annotation.stats.analyzed_turns,
                total_turns: annotation.stats.total_turns,
                overall_confidence: annotation.overall_confidence(),
                cost_usd: annotation.stats.cost_usd,
                processing_time_ms: annotation.stats.processing_time_ms,
            },
            issues: annotation.quality.issues.clone(),
        }
    }
}

/// A document that never produced an annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    /// Path of the document
    pub path: PathBuf,
    /// Why it was skipped
    pub error: String,
}

/// Counts of interviews by quality band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityDistribution {
    /// quality_score >= 0.95
    pub high: usize,
    /// 0.85 <= quality_score < 0.95
    pub medium: usize,
    /// quality_score < 0.85
    pub low: usize,
}

/// Corpus-level aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusAggregates {
    /// Interviews that produced an annotation
    pub interviews_processed: usize,
    /// Interviews accepted without issues
    pub interviews_accepted: usize,
    /// Interviews flagged for review
    pub interviews_flagged: usize,
    /// Documents skipped before annotation
    pub documents_skipped: usize,
    /// Accepted interviews over all documents seen
    pub success_rate: f64,
    /// Quality band counts
    pub quality_distribution: QualityDistribution,
    /// Sum of per-interview costs in USD
    pub total_cost_usd: f64,
    /// Mean cost per processed interview in USD
    pub average_cost_usd: f64,
    /// Total LLM calls across the corpus
    pub total_api_calls: u64,
}

/// The single validation summary written across all interviews in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusReport {
    /// Identifier of the pipeline run
    pub run_id: Uuid,
    /// When the report was generated
    pub generated_at: DateTime<Utc>,
    /// Per-interview summaries in processing order
    pub interviews: Vec<InterviewSummary>,
    /// Documents that never entered the pipeline
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedDocument>,
    /// Corpus-level aggregates
    pub aggregates: CorpusAggregates,
}

impl CorpusReport {
    /// Assemble the report and compute aggregates from the summaries
    pub fn new(
        run_id: Uuid,
        interviews: Vec<InterviewSummary>,
        skipped: Vec<SkippedDocument>,
        total_api_calls: u64,
    ) -> Self {
        let processed = interviews.len();
        let accepted = interviews
            .iter()
            .filter(|s| s.state == InterviewState::Accepted)
            .count();
        let flagged = processed - accepted;

        let mut distribution = QualityDistribution::default();
        for summary in &interviews {
            if summary.quality_score >= 0.95 {
                distribution.high += 1;
            } else if summary.quality_score >= 0.85 {
                distribution.medium += 1;
            } else {
                distribution.low += 1;
            }
        }

        let total_cost_usd: f64 = interviews.iter().map(|s| s.metrics.cost_usd).sum();
        let documents_seen = processed + skipped.len();

        let aggregates = CorpusAggregates {
            interviews_processed: processed,
            interviews_accepted: accepted,
            interviews_flagged: flagged,
            documents_skipped: skipped.len(),
            success_rate: if documents_seen > 0 {
                accepted as f64 / documents_seen as f64
            } else {
                0.0
            },
            quality_distribution: distribution,
            total_cost_usd,
            average_cost_usd: if processed > 0 {
                total_cost_usd / processed as f64
            } else {
                0.0
            },
            total_api_calls,
        };

        Self {
            run_id,
            generated_at: Utc::now(),
            interviews,
            skipped,
            aggregates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, state: InterviewState, score: f64, cost: f64) -> InterviewSummary {
        InterviewSummary {
            interview_id: id.to_string(),
            state,
            quality_score: score,
            metrics: InterviewMetrics {
                coverage_percentage: 100.0,
                analyzed_turns: 8,
                total_turns: 8,
                overall_confidence: 0.9,
                cost_usd: cost,
                processing_time_ms: 1200,
            },
            issues: vec![],
        }
    }

    #[test]
    fn test_aggregate_cost_is_sum_of_interview_costs() {
        let report = CorpusReport::new(
            Uuid::new_v4(),
            vec![
                summary("a", InterviewState::Accepted, 1.0, 0.031),
                summary("b", InterviewState::Accepted, 1.0, 0.027),
                summary("c", InterviewState::FlaggedForReview, 0.85, 0.012),
            ],
            vec![],
            9,
        );
        assert!((report.aggregates.total_cost_usd - 0.07).abs() < 1e-9);
        assert!((report.aggregates.average_cost_usd - 0.07 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_quality_distribution_bands() {
        let report = CorpusReport::new(
            Uuid::new_v4(),
            vec![
                summary("a", InterviewState::Accepted, 1.0, 0.0),
                summary("b", InterviewState::Accepted, 0.95, 0.0),
                summary("c", InterviewState::FlaggedForReview, 0.85, 0.0),
                summary("d", InterviewState::FlaggedForReview, 0.5, 0.0),
            ],
            vec![],
            0,
        );
        assert_eq!(
            report.aggregates.quality_distribution,
            QualityDistribution {
                high: 2,
                medium: 1,
                low: 1
            }
        );
    }

    #[test]
    fn test_success_rate_counts_skipped_documents() {
        let report = CorpusReport::new(
            Uuid::new_v4(),
            vec![
                summary("a", InterviewState::Accepted, 1.0, 0.0),
                summary("b", InterviewState::FlaggedForReview, 0.85, 0.0),
            ],
            vec![SkippedDocument {
                path: PathBuf::from("bad.txt"),
                error: "Document error: invalid UTF-8".to_string(),
            }],
            4,
        );
        assert_eq!(report.aggregates.interviews_accepted, 1);
        assert_eq!(report.aggregates.documents_skipped, 1);
        assert!((report.aggregates.success_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_corpus_has_zero_rates() {
        let report = CorpusReport::new(Uuid::new_v4(), vec![], vec![], 0);
        assert_eq!(report.aggregates.success_rate, 0.0);
        assert_eq!(report.aggregates.average_cost_usd, 0.0);
    }
}
