use anyhow::Context as _;
use anyhow::Result;
use civitas_core::config::CivitasConfig;
use civitas_core::config::ConfigLoader;
use civitas_core::loader::DocumentLoader;
use civitas_core::persist::AnnotationStore;
use civitas_core::persist::Stage;
use civitas_core::pipeline::AnnotationPipeline;
use civitas_core::pipeline::PipelineProgress;
use civitas_core::pipeline::ProgressPhase;
use civitas_core::report::CorpusReport;
use civitas_core::report::InterviewSummary;
use civitas_llm::create_llm_client;
use civitas_llm::LLMConfig;
use civitas_prompts::LlmAnnotator;
use clap::Parser;
use clap::Subcommand;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "civitas",
    version,
    about = "Citizen interview annotation pipeline",
    author
)]
struct Cli {
    /// Configuration file (json/yaml/toml), searched in . and ./config
    #[arg(long, default_value = "civitas.toml")]
    config: String,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Annotate the input corpus and write per-interview artifacts
    Annotate {
        /// Override the input directory
        #[arg(long)]
        input: Option<PathBuf>,
        /// Override the output directory
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override turns per batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Override the worker pool size
        #[arg(long)]
        workers: Option<usize>,
        /// Cost ceiling for the whole run in USD
        #[arg(long)]
        budget_usd: Option<f64>,
        /// Re-run even if the stage is already marked complete
        #[arg(long)]
        force: bool,
    },
    /// Rebuild the validation summary from persisted annotations
    Validate {
        /// Override the output directory
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show stage completion, provider health, and the last report
    Status {
        /// Override the output directory
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = ConfigLoader::new().load_with_defaults(&cli.config, CivitasConfig::default());
    config.apply_env_overrides();
    init_tracing(&config.log_level);

    match cli.cmd {
        Commands::Annotate {
            input,
            output,
            batch_size,
            workers,
            budget_usd,
            force,
        } => {
            if let Some(input) = input {
                config.input_dir = input;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(batch_size) = batch_size {
                config.pipeline.batch_size = batch_size;
            }
            if let Some(workers) = workers {
                config.pipeline.worker_count = workers;
            }
            if let Some(budget) = budget_usd {
                config.pipeline.budget_limit_usd = Some(budget);
            }
            cmd_annotate(config, force).await
        }
        Commands::Validate { output } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            cmd_validate(config)
        }
        Commands::Status { output } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            cmd_status(config).await
        }
    }
}

fn init_tracing(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_annotate(config: CivitasConfig, force: bool) -> Result<()> {
    use civitas_core::config::ConfigValidation as _;
    config.validate().context("invalid configuration")?;

    let store = AnnotationStore::new(&config.output_dir)?;
    if store.stage_complete(Stage::Annotate) && !force {
        println!(
            "Annotation already complete in {} (use --force to re-run)",
            config.output_dir.display()
        );
        return Ok(());
    }

    let corpus = DocumentLoader::new(&config.input_dir)
        .load_all()
        .with_context(|| format!("failed to scan {}", config.input_dir.display()))?;
    if corpus.interviews.is_empty() && corpus.skipped.is_empty() {
        println!(
            "No interview documents found under {}",
            config.input_dir.display()
        );
        return Ok(());
    }
    println!(
        "Loaded {} interviews ({} skipped)",
        corpus.interviews.len(),
        corpus.skipped.len()
    );

    let mut llm_config = LLMConfig::default();
    llm_config.from_env();
    let client = create_llm_client(&llm_config)?;
    let annotator = LlmAnnotator::new(client)?;

    let pb = ProgressBar::new(corpus.interviews.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?
        .progress_chars("##-"),
    );

    let pipeline = AnnotationPipeline::new(annotator, store.clone(), config.pipeline.clone());
    let progress = |p: PipelineProgress| {
        match p.phase {
            ProgressPhase::Annotating => {
                pb.set_position(p.current as u64);
                pb.set_message("annotating...");
            }
            ProgressPhase::Reporting => pb.set_message("writing report..."),
            ProgressPhase::Completed => pb.set_message("done"),
        };
    };
    let report = pipeline
        .run_corpus(corpus.interviews, corpus.skipped, Some(&progress))
        .await?;
    pb.finish_with_message("Done");

    store.write_marker(Stage::Annotate)?;
    print_report(&report);
    Ok(())
}

fn cmd_validate(config: CivitasConfig) -> Result<()> {
    let store = AnnotationStore::new(&config.output_dir)?;
    if !store.stage_complete(Stage::Annotate) {
        anyhow::bail!(
            "annotation stage has not completed in {} (run `civitas annotate` first)",
            config.output_dir.display()
        );
    }

    let annotations = store.load_all_annotations()?;
    let total_api_calls: u64 = annotations.iter().map(|a| u64::from(a.stats.api_calls)).sum();
    let summaries: Vec<InterviewSummary> = annotations
        .iter()
        .map(InterviewSummary::from_annotation)
        .collect();

    let report = CorpusReport::new(uuid::Uuid::new_v4(), summaries, vec![], total_api_calls);
    store.write_report(&report)?;
    store.write_marker(Stage::Validate)?;
    print_report(&report);
    Ok(())
}

async fn cmd_status(config: CivitasConfig) -> Result<()> {
    let store = AnnotationStore::new(&config.output_dir)?;
    println!("Output: {}", config.output_dir.display());
    println!(
        "Annotate stage: {}",
        if store.stage_complete(Stage::Annotate) {
            "complete"
        } else {
            "pending"
        }
    );
    println!(
        "Validate stage: {}",
        if store.stage_complete(Stage::Validate) {
            "complete"
        } else {
            "pending"
        }
    );

    let mut llm_config = LLMConfig::default();
    llm_config.from_env();
    println!(
        "Provider: {} ({})",
        llm_config.provider_name(),
        llm_config.active_model()
    );
    match create_llm_client(&llm_config) {
        Ok(client) => {
            let healthy = client.health_check().await.unwrap_or(false);
            println!("Provider health: {}", if healthy { "ok" } else { "unreachable" });
        }
        Err(e) => println!("Provider health: not configured ({e})"),
    }

    if let Some(report) = store.load_report()? {
        println!(
            "Last report: {} interviews, {:.0}% success, ${:.4} total",
            report.aggregates.interviews_processed,
            report.aggregates.success_rate * 100.0,
            report.aggregates.total_cost_usd
        );
    } else {
        println!("Last report: none");
    }
    Ok(())
}

fn print_report(report: &CorpusReport) {
    println!(
        "Processed {} interviews: {} accepted, {} flagged, {} skipped",
        report.aggregates.interviews_processed,
        report.aggregates.interviews_accepted,
        report.aggregates.interviews_flagged,
        report.aggregates.documents_skipped
    );
    for summary in &report.interviews {
        let flag = if summary.issues.is_empty() {
            String::new()
        } else {
            format!("  [{}]", summary.issues.join("; "))
        };
        println!(
            "  {}  score={:.2}  coverage={:.1}% ({}/{})  ${:.4}{}",
            summary.interview_id,
            summary.quality_score,
            summary.metrics.coverage_percentage,
            summary.metrics.analyzed_turns,
            summary.metrics.total_turns,
            summary.metrics.cost_usd,
            flag
        );
    }
    println!(
        "Totals: {} API calls, ${:.4} (avg ${:.4}/interview)",
        report.aggregates.total_api_calls,
        report.aggregates.total_cost_usd,
        report.aggregates.average_cost_usd
    );
}
