//! Redirect-Resolver main entry point
//!
//! This is the command-line interface for the bulk redirect chain resolver.

use anyhow::{bail, Context};
use clap::Parser;
use redirect_resolver::config::{load_config_with_hash, Config};
use redirect_resolver::input::read_urls;
use redirect_resolver::output::{print_summary, write_results, ResultSummary};
use redirect_resolver::scheduler::{
    Invocation, JsonLinesSink, MemoryProgressStore, ProgressSink,
};
use redirect_resolver::{ContinuationToken, HttpResolver, Scheduler};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Redirect-Resolver: resolve URL lists to their full redirect chains
///
/// Results stream to stdout as JSON lines, one event per line. Lists larger
/// than one invocation produce a continuation token that can be passed back
/// with --resume.
#[derive(Parser, Debug)]
#[command(name = "redirect-resolver")]
#[command(version)]
#[command(about = "Bulk HTTP redirect chain resolver", long_about = None)]
struct Cli {
    /// File with one URL per line, or a CSV file with a `url` column
    #[arg(value_name = "INPUT", required_unless_present = "resume")]
    input: Option<PathBuf>,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Resume from a continuation token written by an earlier run
    #[arg(long, value_name = "TOKEN", conflicts_with = "input")]
    resume: Option<PathBuf>,

    /// Write results as CSV to this file (appended to when resuming)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Where to write the continuation token when work remains
    #[arg(long, value_name = "FILE", default_value = "continuation.json")]
    continuation_out: PathBuf,

    /// Keep resubmitting continuation tokens until the whole list is resolved
    #[arg(long)]
    until_complete: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let invocation = match (&cli.resume, &cli.input) {
        (Some(token_path), _) => {
            let json = std::fs::read_to_string(token_path).with_context(|| {
                format!("Failed to read continuation token {}", token_path.display())
            })?;
            let token = ContinuationToken::from_json(&json)?;
            tracing::info!(
                "Resuming at URL {} of {}",
                token.start_index,
                token.total_urls
            );
            Invocation::Resume(token)
        }
        (None, Some(input)) => Invocation::Fresh(read_urls(input)?),
        (None, None) => bail!("either INPUT or --resume is required"),
    };

    run(config, invocation, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout is reserved for the event stream.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("redirect_resolver=info,warn"),
            1 => EnvFilter::new("redirect_resolver=debug,info"),
            2 => EnvFilter::new("redirect_resolver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Drives one or more invocations and writes their results
async fn run(config: Config, mut invocation: Invocation, cli: &Cli) -> anyhow::Result<()> {
    let resuming = matches!(invocation, Invocation::Resume(_));

    let resolver = HttpResolver::new(config.resolver.clone(), &config.user_agent)
        .context("Failed to build HTTP client")?;
    let scheduler = Scheduler::new(resolver, config.scheduler.clone())
        .with_progress_store(Arc::new(MemoryProgressStore::default()));

    let sink: Arc<dyn ProgressSink> = Arc::new(JsonLinesSink::new(std::io::stdout()));
    let job_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("Job {}", job_id);

    let mut csv_file = match &cli.output {
        Some(path) => Some(open_output(path, resuming)?),
        None => None,
    };
    let mut write_header = !resuming;
    let mut summary = ResultSummary::default();

    loop {
        let outcome = scheduler
            .invoke(invocation, Some(&job_id), sink.clone())
            .await?;

        if let Some(file) = csv_file.as_mut() {
            write_results(&outcome.results, file, write_header)?;
            write_header = false;
        }
        summary.merge(&ResultSummary::from_results(&outcome.results));

        match outcome.continuation {
            Some(token) if cli.until_complete => {
                tracing::info!(
                    "Continuing with {} remaining URLs",
                    token.remaining_urls.len()
                );
                invocation = Invocation::Resume(token);
            }
            Some(token) => {
                save_continuation(&cli.continuation_out, &token)?;
                tracing::info!(
                    "{} URLs remain; resume with --resume {}",
                    token.remaining_urls.len(),
                    cli.continuation_out.display()
                );
                break;
            }
            None => break,
        }
    }

    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

fn open_output(path: &Path, append: bool) -> anyhow::Result<File> {
    let file = if append {
        OpenOptions::new().create(true).append(true).open(path)
    } else {
        File::create(path)
    }
    .with_context(|| format!("Failed to open output file {}", path.display()))?;
    Ok(file)
}

fn save_continuation(path: &Path, token: &ContinuationToken) -> anyhow::Result<()> {
    let json = token.to_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write continuation token to {}", path.display()))?;
    Ok(())
}
