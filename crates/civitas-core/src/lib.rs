//! Civitas Core - Core types and pipeline orchestration for interview annotation
//!
//! This crate provides the fundamental building blocks for the Civitas system:
//! - Interview data structures (turns, metadata, annotations)
//! - Document loading and turn segmentation
//! - Batch planning, merging, and coverage accounting
//! - Quality validation and the per-interview state machine
//! - The annotation pipeline driver and corpus report
//! - Persistence of final annotation artifacts

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod annotation;
pub mod budget;
pub mod config;
pub mod error;
pub mod interview;
pub mod loader;
pub mod merge;
pub mod persist;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod retry;
pub mod segmenter;
pub mod validate;

pub use error::Error;
pub use error::Result;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::annotation::InterviewAnnotation;
    pub use crate::annotation::TurnAnnotation;
    pub use crate::budget::CostLedger;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::interview::Interview;
    pub use crate::interview::SpeakerRole;
    pub use crate::interview::Turn;
    pub use crate::pipeline::AnnotationPipeline;
    pub use crate::pipeline::BatchAnnotator;
    pub use crate::pipeline::PipelineConfig;
    pub use crate::planner::TurnBatch;
    pub use crate::report::CorpusReport;
    pub use crate::validate::InterviewState;
    pub use crate::validate::QualityThresholds;
}
