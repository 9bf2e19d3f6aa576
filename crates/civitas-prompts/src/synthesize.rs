//! Interview-level synthesis

use crate::annotate_batch::extract_json_object;
use crate::models::SynthesisContext;
use crate::PromptEngine;
use civitas_core::annotation::CallUsage;
use civitas_core::annotation::InterviewSynthesis;
use civitas_core::error::Error;
use civitas_core::error::Result;
use civitas_llm::CompletionParams;
use civitas_llm::LLMClient;
use civitas_llm::Message;
use tracing::debug;

/// Produce the interview-level synthesis with a single whole-interview call
pub async fn synthesize_interview(
    engine: &PromptEngine,
    context: &SynthesisContext,
    llm: &dyn LLMClient,
    params: &CompletionParams,
) -> Result<(InterviewSynthesis, CallUsage)> {
    debug!(interview = %context.interview_id, "Synthesizing interview");
    let prompt = engine.synthesize_interview(context)?;

    let messages = vec![
        Message::system(
            "You are an expert analyst of citizen interview transcripts. Return your response as valid JSON.",
        ),
        Message::user(prompt),
    ];

    let start = std::time::Instant::now();
    let completion = llm.complete(&messages, params).await?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let json_str = extract_json_object(&completion.text)?;
    let synthesis: InterviewSynthesis = serde_json::from_str(json_str)
        .map_err(|e| Error::schema(format!("synthesis response did not match schema: {e}")))?;

    Ok((
        synthesis,
        CallUsage {
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            cost_usd: completion.cost_usd,
            elapsed_ms,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_parses_optional_fields() {
        let json = r#"{"priorities": ["housing"], "narrative_features": []}"#;
        let synthesis: InterviewSynthesis =
            serde_json::from_str(extract_json_object(json).unwrap()).unwrap();
        assert_eq!(synthesis.priorities, vec!["housing"]);
        assert!(synthesis.participant_profile.is_none());
    }
}
