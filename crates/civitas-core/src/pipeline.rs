//! Annotation pipeline driver
//!
//! Drives the multi-pass annotation of a corpus: per-batch turn annotation
//! calls, one interview-level synthesis pass, merging, quality validation,
//! and persistence. Interviews are processed by a fixed-size worker pool;
//! batch calls within one interview run sequentially.

use crate::annotation::BatchFailure;
use crate::annotation::CallUsage;
use crate::annotation::InterviewAnnotation;
use crate::annotation::InterviewSynthesis;
use crate::annotation::ProcessingStats;
use crate::annotation::TurnAnnotation;
use crate::budget::CostLedger;
use crate::config::ConfigError;
use crate::config::ConfigValidation;
use crate::error::Result;
use crate::interview::Interview;
use crate::merge::merge_batch_outcomes;
use crate::merge::BatchOutcome;
use crate::persist::AnnotationStore;
use crate::planner::plan_batches;
use crate::planner::TurnBatch;
use crate::report::CorpusReport;
use crate::report::InterviewSummary;
use crate::report::SkippedDocument;
use crate::retry::with_retries;
use crate::validate::validate_quality;
use crate::validate::InterviewState;
use crate::validate::QualityThresholds;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::instrument;
use tracing::warn;
use uuid::Uuid;

/// Backend issuing the actual LLM calls for one batch or one interview.
///
/// Implemented in `civitas-prompts` over a prompt engine and an LLM client;
/// the pipeline only sees annotations and usage.
pub trait BatchAnnotator: Send + Sync {
    /// Annotate one batch of consecutive turns
    fn annotate_batch(
        &self,
        interview: &Interview,
        batch: &TurnBatch,
    ) -> impl Future<Output = Result<(Vec<TurnAnnotation>, CallUsage)>> + Send;

    /// Produce the interview-level synthesis
    fn synthesize(
        &self,
        interview: &Interview,
    ) -> impl Future<Output = Result<(InterviewSynthesis, CallUsage)>> + Send;
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Turns per annotation batch
    pub batch_size: usize,
    /// Attempts per LLM call before the batch is recorded as unanalyzed
    pub max_retries: u32,
    /// Interviews processed concurrently
    pub worker_count: usize,
    /// Overall run deadline in seconds; after it no new work is issued
    pub run_timeout_secs: u64,
    /// Quality thresholds applied to merged annotations
    pub thresholds: QualityThresholds,
    /// Process-wide cost ceiling in USD
    pub budget_limit_usd: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            max_retries: 3,
            worker_count: 6,
            run_timeout_secs: 1800,
            thresholds: QualityThresholds::default(),
            budget_limit_usd: None,
        }
    }
}

impl ConfigValidation for PipelineConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Validation(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Validation(
                "worker_count must be greater than 0".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Phase of a running pipeline, for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Interviews being annotated
    Annotating,
    /// Corpus report being assembled
    Reporting,
    /// Run finished
    Completed,
}

/// Progress snapshot handed to the caller's callback
#[derive(Debug, Clone, Copy)]
pub struct PipelineProgress {
    /// Current phase
    pub phase: ProgressPhase,
    /// Interviews finished so far
    pub current: usize,
    /// Interviews in the corpus
    pub total: usize,
}

enum TaskOutcome {
    Processed(InterviewSummary),
    Skipped(SkippedDocument),
}

/// The corpus annotation driver
pub struct AnnotationPipeline<A> {
    annotator: Arc<A>,
    store: AnnotationStore,
    ledger: Arc<CostLedger>,
    config: PipelineConfig,
}

impl<A> Clone for AnnotationPipeline<A> {
    fn clone(&self) -> Self {
        Self {
            annotator: Arc::clone(&self.annotator),
            store: self.store.clone(),
            ledger: Arc::clone(&self.ledger),
            config: self.config.clone(),
        }
    }
}

impl<A> AnnotationPipeline<A>
where
    A: BatchAnnotator + 'static,
{
    /// Create a pipeline over an annotator backend and an output store
    pub fn new(annotator: A, store: AnnotationStore, config: PipelineConfig) -> Self {
        let ledger = Arc::new(CostLedger::new(config.budget_limit_usd));
        Self {
            annotator: Arc::new(annotator),
            store,
            ledger,
            config,
        }
    }

    /// The shared cost ledger for this run
    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    /// Annotate a whole corpus and write the validation summary.
    ///
    /// Unreadable documents arrive as `skipped` from the loader and are
    /// carried through to the report. Never fails the whole run for a
    /// single interview: per-interview outcomes land in the report.
    pub async fn run_corpus(
        &self,
        interviews: Vec<Interview>,
        skipped: Vec<(PathBuf, String)>,
        progress: Option<&(dyn Fn(PipelineProgress) + Sync)>,
    ) -> Result<CorpusReport> {
        let cancel = CancellationToken::new();
        let watchdog = {
            let cancel = cancel.clone();
            let deadline = Duration::from_secs(self.config.run_timeout_secs);
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                warn!("Run deadline reached, no new work will be issued");
                cancel.cancel();
            })
        };

        let report = self
            .run_with_cancellation(interviews, skipped, cancel, progress)
            .await;
        watchdog.abort();
        report
    }

    /// Corpus run against an externally controlled cancellation token
    #[instrument(skip_all, fields(interviews = interviews.len()))]
    pub async fn run_with_cancellation(
        &self,
        interviews: Vec<Interview>,
        skipped: Vec<(PathBuf, String)>,
        cancel: CancellationToken,
        progress: Option<&(dyn Fn(PipelineProgress) + Sync)>,
    ) -> Result<CorpusReport> {
        let run_id = Uuid::new_v4();
        let total = interviews.len();
        info!(%run_id, total, "Starting corpus annotation run");

        let semaphore = Arc::new(Semaphore::new(self.config.worker_count));
        let mut handles = Vec::with_capacity(total);

        for interview in interviews {
            let pipeline = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return TaskOutcome::Skipped(SkippedDocument {
                            path: interview.metadata.source_path.clone(),
                            error: "worker pool closed".to_string(),
                        })
                    }
                };
                if cancel.is_cancelled() {
                    return TaskOutcome::Skipped(SkippedDocument {
                        path: interview.metadata.source_path.clone(),
                        error: "run deadline exceeded before processing started".to_string(),
                    });
                }
                pipeline.annotate_and_persist(interview, cancel).await
            }));
        }

        let mut summaries = Vec::new();
        let mut all_skipped: Vec<SkippedDocument> = skipped
            .into_iter()
            .map(|(path, error)| SkippedDocument { path, error })
            .collect();
        let mut finished = 0usize;

        for handle in handles {
            match handle.await {
                Ok(TaskOutcome::Processed(summary)) => summaries.push(summary),
                Ok(TaskOutcome::Skipped(doc)) => all_skipped.push(doc),
                Err(join_error) => {
                    warn!("Interview task panicked: {join_error}");
                }
            }
            finished += 1;
            if let Some(callback) = progress {
                callback(PipelineProgress {
                    phase: ProgressPhase::Annotating,
                    current: finished,
                    total,
                });
            }
        }

        if let Some(callback) = progress {
            callback(PipelineProgress {
                phase: ProgressPhase::Reporting,
                current: total,
                total,
            });
        }

        let total_api_calls: u64 = self.ledger.api_calls();
        let report = CorpusReport::new(run_id, summaries, all_skipped, total_api_calls);
        self.store.write_report(&report)?;

        if let Some(callback) = progress {
            callback(PipelineProgress {
                phase: ProgressPhase::Completed,
                current: total,
                total,
            });
        }
        info!(
            %run_id,
            accepted = report.aggregates.interviews_accepted,
            flagged = report.aggregates.interviews_flagged,
            spent_usd = self.ledger.spent_usd(),
            "Corpus annotation run finished"
        );
        Ok(report)
    }

    async fn annotate_and_persist(
        &self,
        interview: Interview,
        cancel: CancellationToken,
    ) -> TaskOutcome {
        let annotation = self.annotate_interview(&interview, &cancel).await;
        if let Err(e) = self.store.write_annotation(&annotation) {
            warn!(
                id = %annotation.interview_id,
                "Failed to persist final annotation: {e}"
            );
        }
        TaskOutcome::Processed(InterviewSummary::from_annotation(&annotation))
    }

    /// Run the multi-pass annotation of a single interview.
    ///
    /// Batch failures and budget refusals reduce coverage but never abort
    /// the interview; the result is always a finalized annotation in a
    /// terminal state.
    #[instrument(skip(self, interview, cancel), fields(id = %interview.id))]
    pub async fn annotate_interview(
        &self,
        interview: &Interview,
        cancel: &CancellationToken,
    ) -> InterviewAnnotation {
        let start = std::time::Instant::now();
        let mut state = InterviewState::Pending;
        advance(&mut state, InterviewState::InProgress);

        let batches = plan_batches(interview.total_turns(), self.config.batch_size);
        let mut stats = ProcessingStats::default();
        let mut outcomes = Vec::with_capacity(batches.len());

        for batch in &batches {
            if let Some(failure) = self.refusal_for(batch, cancel) {
                outcomes.push(BatchOutcome::Failed(failure));
                continue;
            }

            let outcome = with_retries(self.config.max_retries, || {
                self.annotator.annotate_batch(interview, batch)
            })
            .await;
            stats.retries += outcome.retries;
            stats.api_calls += 1 + outcome.retries;

            match outcome.result {
                Ok((annotations, usage)) => {
                    self.ledger.record(usage.cost_usd, usage.total_tokens());
                    self.ledger.record_failed_calls(u64::from(outcome.retries));
                    stats.cost_usd += usage.cost_usd;
                    stats.total_tokens += usage.total_tokens();
                    outcomes.push(BatchOutcome::Annotated(annotations));
                }
                Err(e) => {
                    warn!(batch = batch.index, "Batch unanalyzed after retries: {e}");
                    self.ledger
                        .record_failed_calls(u64::from(1 + outcome.retries));
                    outcomes.push(BatchOutcome::Failed(BatchFailure {
                        batch_index: batch.index,
                        turn_indexes: batch.turn_range().collect(),
                        error: e.to_string(),
                    }));
                }
            }
        }

        // Interview-level pass; failure leaves the synthesis empty and is
        // surfaced as a quality issue, coverage is unaffected.
        let mut synthesis_issue = None;
        let synthesis = if cancel.is_cancelled() || self.ledger.check_admission().is_err() {
            synthesis_issue = Some("Interview synthesis unavailable".to_string());
            InterviewSynthesis::default()
        } else {
            let outcome = with_retries(self.config.max_retries, || {
                self.annotator.synthesize(interview)
            })
            .await;
            stats.retries += outcome.retries;
            stats.api_calls += 1 + outcome.retries;
            match outcome.result {
                Ok((synthesis, usage)) => {
                    self.ledger.record(usage.cost_usd, usage.total_tokens());
                    self.ledger.record_failed_calls(u64::from(outcome.retries));
                    stats.cost_usd += usage.cost_usd;
                    stats.total_tokens += usage.total_tokens();
                    synthesis
                }
                Err(e) => {
                    warn!("Interview synthesis failed after retries: {e}");
                    self.ledger
                        .record_failed_calls(u64::from(1 + outcome.retries));
                    synthesis_issue = Some("Interview synthesis unavailable".to_string());
                    InterviewSynthesis::default()
                }
            }
        };

        let merged = merge_batch_outcomes(interview.total_turns(), outcomes);
        advance(&mut state, InterviewState::Merged);

        stats.analyzed_turns = merged.coverage.analyzed_turns;
        stats.total_turns = merged.coverage.total_turns;
        stats.coverage_percentage = merged.coverage.percentage();
        stats.processing_time_ms = start.elapsed().as_millis() as u64;

        let overall_confidence = if merged.turns.is_empty() {
            0.0
        } else {
            merged
                .turns
                .iter()
                .map(|t| f64::from(t.confidence))
                .sum::<f64>()
                / merged.turns.len() as f64
        };
        let mut quality = validate_quality(merged.coverage, overall_confidence, &self.config.thresholds);
        if let Some(issue) = synthesis_issue {
            quality.issues.push(issue);
        }
        advance(&mut state, InterviewState::Validated);

        let terminal = if quality.is_accepted() {
            InterviewState::Accepted
        } else {
            InterviewState::FlaggedForReview
        };
        advance(&mut state, terminal);

        InterviewAnnotation {
            interview_id: interview.id.clone(),
            recorded_at: interview.metadata.recorded_at,
            annotated_at: Utc::now(),
            turns: merged.turns,
            synthesis,
            failed_batches: merged.failed_batches,
            stats,
            quality,
            state,
        }
    }

    /// A batch is refused without a call when the run deadline has passed
    /// or the cost ceiling is reached.
    fn refusal_for(&self, batch: &TurnBatch, cancel: &CancellationToken) -> Option<BatchFailure> {
        if cancel.is_cancelled() {
            return Some(BatchFailure {
                batch_index: batch.index,
                turn_indexes: batch.turn_range().collect(),
                error: "run deadline exceeded".to_string(),
            });
        }
        if let Err(e) = self.ledger.check_admission() {
            return Some(BatchFailure {
                batch_index: batch.index,
                turn_indexes: batch.turn_range().collect(),
                error: e.to_string(),
            });
        }
        None
    }
}

fn advance(state: &mut InterviewState, next: InterviewState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal state transition {state:?} -> {next:?}"
    );
    *state = next;
}
