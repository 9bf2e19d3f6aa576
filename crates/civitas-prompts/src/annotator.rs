//! Annotation backend over an LLM client

use crate::annotate_batch::annotate_batch;
use crate::models::BatchContext;
use crate::models::SynthesisContext;
use crate::synthesize::synthesize_interview;
use crate::PromptEngine;
use civitas_core::annotation::CallUsage;
use civitas_core::annotation::InterviewSynthesis;
use civitas_core::annotation::TurnAnnotation;
use civitas_core::error::Result;
use civitas_core::interview::Interview;
use civitas_core::pipeline::BatchAnnotator;
use civitas_core::planner::TurnBatch;
use civitas_llm::CompletionParams;
use civitas_llm::LLMClient;
use std::sync::Arc;

/// The production annotation backend: prompt engine + LLM client.
///
/// Implements the pipeline's [`BatchAnnotator`] so the driver never sees
/// prompts or providers.
pub struct LlmAnnotator {
    engine: PromptEngine,
    client: Arc<dyn LLMClient>,
    params: CompletionParams,
}

impl LlmAnnotator {
    /// Create an annotator over a client, with low-temperature defaults
    /// suited to consistent tagging.
    pub fn new(client: Arc<dyn LLMClient>) -> Result<Self> {
        Ok(Self {
            engine: PromptEngine::new()?,
            client,
            params: CompletionParams {
                temperature: Some(0.1),
                ..Default::default()
            },
        })
    }

    /// Override the completion parameters
    pub fn with_params(mut self, params: CompletionParams) -> Self {
        self.params = params;
        self
    }
}

impl BatchAnnotator for LlmAnnotator {
    async fn annotate_batch(
        &self,
        interview: &Interview,
        batch: &TurnBatch,
    ) -> Result<(Vec<TurnAnnotation>, CallUsage)> {
        let context = BatchContext::from_interview(interview, batch);
        annotate_batch(&self.engine, &context, self.client.as_ref(), &self.params).await
    }

    async fn synthesize(&self, interview: &Interview) -> Result<(InterviewSynthesis, CallUsage)> {
        let context = SynthesisContext::from_interview(interview);
        synthesize_interview(&self.engine, &context, self.client.as_ref(), &self.params).await
    }
}
