//! Data models for prompt templates

use civitas_core::annotation::TurnAnnotation;
use civitas_core::interview::Interview;
use civitas_core::interview::SpeakerRole;
use civitas_core::planner::TurnBatch;
use serde::Deserialize;
use serde::Serialize;

/// One turn as rendered into a prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnView {
    /// Turn index within the interview
    pub index: usize,
    /// Speaker label
    pub speaker: String,
    /// Utterance text
    pub text: String,
}

fn speaker_label(role: SpeakerRole) -> &'static str {
    match role {
        SpeakerRole::Interviewer => "interviewer",
        SpeakerRole::Participant => "participant",
        SpeakerRole::Unknown => "speaker",
    }
}

/// Context for the batch annotation prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchContext {
    /// Interview identifier
    pub interview_id: String,
    /// Batch position within the interview
    pub batch_index: usize,
    /// The turns in this batch
    pub turns: Vec<TurnView>,
}

impl BatchContext {
    /// Build the render context for one batch of an interview
    pub fn from_interview(interview: &Interview, batch: &TurnBatch) -> Self {
        let turns = interview.turns[batch.turn_range()]
            .iter()
            .map(|turn| TurnView {
                index: turn.index,
                speaker: speaker_label(turn.speaker).to_string(),
                text: turn.text.clone(),
            })
            .collect();
        Self {
            interview_id: interview.id.clone(),
            batch_index: batch.index,
            turns,
        }
    }

    /// The turn indexes this context expects annotations for
    pub fn expected_indexes(&self) -> Vec<usize> {
        self.turns.iter().map(|t| t.index).collect()
    }
}

/// Context for the interview synthesis prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisContext {
    /// Interview identifier
    pub interview_id: String,
    /// The whole interview as speaker-labelled lines
    pub transcript: String,
}

impl SynthesisContext {
    /// Build the render context for the interview-level pass
    pub fn from_interview(interview: &Interview) -> Self {
        let transcript = interview
            .turns
            .iter()
            .map(|turn| format!("{}: {}", speaker_label(turn.speaker), turn.text))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            interview_id: interview.id.clone(),
            transcript,
        }
    }
}

/// Expected shape of the batch annotation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnnotationResponse {
    /// Per-turn annotations for the batch
    pub turn_annotations: Vec<TurnAnnotation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use civitas_core::interview::InterviewMetadata;
    use civitas_core::interview::Turn;
    use civitas_core::planner::plan_batches;

    fn interview() -> Interview {
        Interview {
            id: "ab12".to_string(),
            raw_text: String::new(),
            metadata: InterviewMetadata::default(),
            turns: vec![
                Turn {
                    index: 0,
                    speaker: SpeakerRole::Interviewer,
                    text: "How is the new bus line?".to_string(),
                },
                Turn {
                    index: 1,
                    speaker: SpeakerRole::Participant,
                    text: "Honestly, a big improvement.".to_string(),
                },
                Turn {
                    index: 2,
                    speaker: SpeakerRole::Unknown,
                    text: "(laughs)".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_batch_context_covers_exactly_the_batch() {
        let interview = interview();
        let batches = plan_batches(interview.total_turns(), 2);
        let context = BatchContext::from_interview(&interview, &batches[1]);
        assert_eq!(context.batch_index, 1);
        assert_eq!(context.expected_indexes(), vec![2]);
        assert_eq!(context.turns[0].speaker, "speaker");
    }

    #[test]
    fn test_synthesis_context_joins_labelled_lines() {
        let context = SynthesisContext::from_interview(&interview());
        assert!(context
            .transcript
            .starts_with("interviewer: How is the new bus line?"));
        assert_eq!(context.transcript.lines().count(), 3);
    }
}
