//! Civitas Prompts - Prompt engineering module for annotation LLM calls
//!
//! This crate provides the structured prompts for the two annotation
//! passes and the glue between them and the core pipeline:
//! - Turn-level batch annotation
//! - Interview-level synthesis
//! - The `LlmAnnotator` backend driving both over an LLM client

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod annotate_batch;
pub mod annotator;
pub mod models;
pub mod synthesize;
pub mod templates;

use anyhow::Result;
use handlebars::Handlebars;
use serde::Serialize;

pub use annotator::LlmAnnotator;

/// Prompt engine for managing and rendering templates
pub struct PromptEngine {
    handlebars: Handlebars<'static>,
}

impl PromptEngine {
    /// Create a new prompt engine with all templates registered
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        handlebars
            .register_template_string("annotate_batch", templates::ANNOTATE_BATCH_TEMPLATE)?;
        handlebars.register_template_string(
            "synthesize_interview",
            templates::SYNTHESIZE_INTERVIEW_TEMPLATE,
        )?;

        Ok(Self { handlebars })
    }

    /// Render a template with the given data
    pub fn render<T: Serialize>(&self, template_name: &str, data: &T) -> Result<String> {
        Ok(self.handlebars.render(template_name, data)?)
    }

    /// Generate the batch annotation prompt
    pub fn annotate_batch<T: Serialize>(&self, data: &T) -> Result<String> {
        self.render("annotate_batch", data)
    }

    /// Generate the interview synthesis prompt
    pub fn synthesize_interview<T: Serialize>(&self, data: &T) -> Result<String> {
        self.render("synthesize_interview", data)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new().expect("Failed to create prompt engine")
    }
}
