//! Turn-level batch annotation

use crate::models::BatchAnnotationResponse;
use crate::models::BatchContext;
use crate::PromptEngine;
use civitas_core::annotation::CallUsage;
use civitas_core::annotation::TurnAnnotation;
use civitas_core::error::Error;
use civitas_core::error::Result;
use civitas_llm::CompletionParams;
use civitas_llm::LLMClient;
use civitas_llm::Message;
use std::collections::HashSet;
use tracing::debug;

/// Locate the JSON object in a model response that may carry surrounding
/// prose or code fences.
pub(crate) fn extract_json_object(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| Error::schema("response contains no JSON object"))?;
    let end = response
        .rfind('}')
        .map(|i| i + 1)
        .ok_or_else(|| Error::schema("response contains no closing brace"))?;
    if end <= start {
        return Err(Error::schema("response contains no JSON object"));
    }
    Ok(&response[start..end])
}

/// Annotate one batch of turns with a single LLM call.
///
/// The response must annotate exactly the turns in the batch; anything
/// else is a schema violation, surfaced as a retryable error so the
/// pipeline's bounded retry treats it like a transient failure.
pub async fn annotate_batch(
    engine: &PromptEngine,
    context: &BatchContext,
    llm: &dyn LLMClient,
    params: &CompletionParams,
) -> Result<(Vec<TurnAnnotation>, CallUsage)> {
    debug!(
        interview = %context.interview_id,
        batch = context.batch_index,
        "Annotating turn batch"
    );
    let prompt = engine.annotate_batch(context)?;

    let messages = vec![
        Message::system(
            "You are an expert annotator of citizen interview transcripts. Return your response as valid JSON.",
        ),
        Message::user(prompt),
    ];

    let start = std::time::Instant::now();
    let completion = llm.complete(&messages, params).await?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let annotations = parse_batch_response(&completion.text, &context.expected_indexes())?;

    Ok((
        annotations,
        CallUsage {
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            cost_usd: completion.cost_usd,
            elapsed_ms,
        },
    ))
}

/// Parse and validate the model response for one batch
fn parse_batch_response(response: &str, expected: &[usize]) -> Result<Vec<TurnAnnotation>> {
    let json_str = extract_json_object(response)?;
    let parsed: BatchAnnotationResponse = serde_json::from_str(json_str)
        .map_err(|e| Error::schema(format!("batch response did not match schema: {e}")))?;

    let mut annotations = parsed.turn_annotations;

    let got: HashSet<usize> = annotations.iter().map(|a| a.turn_index).collect();
    let want: HashSet<usize> = expected.iter().copied().collect();
    if got != want {
        return Err(Error::schema(format!(
            "response annotated turns {got:?}, batch expected {want:?}"
        )));
    }
    if annotations.len() != expected.len() {
        return Err(Error::schema("duplicate turn annotations in response"));
    }

    for annotation in &mut annotations {
        annotation.confidence = annotation.confidence.clamp(0.0, 1.0);
    }
    annotations.sort_by_key(|a| a.turn_index);
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_RESPONSE: &str = r#"
    Here is the annotation you asked for:
    {
        "turn_annotations": [
            {"turn_index": 4, "functional_tags": ["question"], "content_tags": ["transit"], "evidence_tags": [], "emotional_tags": ["neutral"], "confidence": 0.92},
            {"turn_index": 5, "functional_tags": ["answer"], "content_tags": ["transit"], "evidence_tags": ["personal_experience"], "emotional_tags": ["hopeful"], "confidence": 0.88}
        ]
    }
    "#;

    #[test]
    fn test_parse_valid_response_with_surrounding_prose() {
        let annotations = parse_batch_response(GOOD_RESPONSE, &[4, 5]).unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].turn_index, 4);
        assert_eq!(annotations[1].evidence_tags, vec!["personal_experience"]);
    }

    #[test]
    fn test_wrong_turn_indexes_are_schema_errors() {
        let err = parse_batch_response(GOOD_RESPONSE, &[0, 1]).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_missing_turn_is_a_schema_error() {
        let err = parse_batch_response(GOOD_RESPONSE, &[4, 5, 6]).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation(_)));
    }

    #[test]
    fn test_non_json_response_is_a_schema_error() {
        let err = parse_batch_response("I cannot annotate this.", &[0]).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation(_)));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let response = r#"{"turn_annotations": [
            {"turn_index": 0, "confidence": 1.7}
        ]}"#;
        let annotations = parse_batch_response(response, &[0]).unwrap();
        assert_eq!(annotations[0].confidence, 1.0);
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object(r#"x {"a": 1} y"#).unwrap(), r#"{"a": 1}"#);
        assert!(extract_json_object("no braces here").is_err());
    }
}
