//! Annotation result types

use crate::validate::InterviewState;
use crate::validate::QualityReport;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Per-turn annotation produced by one batch call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnAnnotation {
    /// Index of the annotated turn within the interview
    pub turn_index: usize,
    /// What the utterance does in the conversation (question, proposal, ...)
    #[serde(default)]
    pub functional_tags: Vec<String>,
    /// Topics the utterance is about
    #[serde(default)]
    pub content_tags: Vec<String>,
    /// Kinds of evidence offered (personal experience, hearsay, data, ...)
    #[serde(default)]
    pub evidence_tags: Vec<String>,
    /// Emotional register of the utterance
    #[serde(default)]
    pub emotional_tags: Vec<String>,
    /// Model confidence in this annotation (0.0 to 1.0)
    pub confidence: f32,
}

/// Interview-level synthesis from the whole-interview pass.
///
/// The source material's per-interview variable schema is rendered as a
/// fixed set of optional fields; absent fields are omitted from the
/// persisted artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterviewSynthesis {
    /// Priorities the participant voiced, most salient first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub priorities: Vec<String>,
    /// Narrative features of the interview as a whole
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrative_features: Vec<String>,
    /// Short profile of the participant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_profile: Option<String>,
}

/// Usage attributable to a single LLM call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CallUsage {
    /// Tokens in the rendered prompt
    pub prompt_tokens: u64,
    /// Tokens in the model response
    pub completion_tokens: u64,
    /// Cost of the call in USD
    pub cost_usd: f64,
    /// Wall-clock time of the call in milliseconds
    pub elapsed_ms: u64,
}

impl CallUsage {
    /// Total tokens consumed by the call
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A batch whose annotation call failed after exhausting retries.
///
/// Recorded partial failure: the batch's turns are excluded from the
/// coverage numerator and the interview still completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Index of the failed batch
    pub batch_index: usize,
    /// Turn indexes left unanalyzed
    pub turn_indexes: Vec<usize>,
    /// Final error after the last retry
    pub error: String,
}

/// Processing metadata accumulated for one interview
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Number of LLM API calls issued (including retries)
    pub api_calls: u32,
    /// Number of retry attempts performed
    pub retries: u32,
    /// Total tokens across all calls
    pub total_tokens: u64,
    /// Total cost attributable to this interview in USD
    pub cost_usd: f64,
    /// End-to-end processing time in milliseconds
    pub processing_time_ms: u64,
    /// Turns successfully annotated
    pub analyzed_turns: usize,
    /// Total turns in the interview
    pub total_turns: usize,
    /// `100 * analyzed_turns / total_turns`
    pub coverage_percentage: f64,
}

/// The final annotation artifact for one interview.
///
/// Created once per interview and written once to storage; never mutated
/// after finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewAnnotation {
    /// Interview identifier
    pub interview_id: String,
    /// When the interview was recorded, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// When this annotation was produced
    pub annotated_at: DateTime<Utc>,
    /// Per-turn annotations in turn order
    pub turns: Vec<TurnAnnotation>,
    /// Interview-level synthesis
    pub synthesis: InterviewSynthesis,
    /// Batches that failed after retries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_batches: Vec<BatchFailure>,
    /// Processing metadata
    pub stats: ProcessingStats,
    /// Quality validation outcome
    pub quality: QualityReport,
    /// Terminal pipeline state
    pub state: InterviewState,
}

impl InterviewAnnotation {
    /// Mean confidence across annotated turns, 0.0 when nothing was analyzed
    pub fn overall_confidence(&self) -> f64 {
        if self.turns.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.turns.iter().map(|t| f64::from(t.confidence)).sum();
        sum / self.turns.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_usage_totals() {
        let usage = CallUsage {
            prompt_tokens: 900,
            completion_tokens: 300,
            cost_usd: 0.012,
            elapsed_ms: 850,
        };
        assert_eq!(usage.total_tokens(), 1200);
    }

    #[test]
    fn test_synthesis_omits_empty_fields() {
        let json = serde_json::to_value(InterviewSynthesis::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let synthesis = InterviewSynthesis {
            priorities: vec!["transit".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&synthesis).unwrap();
        assert_eq!(json, serde_json::json!({ "priorities": ["transit"] }));
    }

    #[test]
    fn test_turn_annotation_tag_defaults() {
        let annotation: TurnAnnotation =
            serde_json::from_str(r#"{"turn_index": 2, "confidence": 0.9}"#).unwrap();
        assert_eq!(annotation.turn_index, 2);
        assert!(annotation.functional_tags.is_empty());
        assert!(annotation.emotional_tags.is_empty());
    }
}
