use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blogscout::analyzer::cutoff::cutoff_from_millis;
use blogscout::analyzer::{
    system_clock, AnalyzeOptions, Cancellation, FalsePositiveGuard, FeedAnalyzer, ProgressUpdate,
    VerboseEvent,
};
use blogscout::blogs::BlogDirectory;
use blogscout::config::{Config, FilterConfig};
use blogscout::feed::HttpFeedFetcher;
use blogscout::llm::OllamaClassifier;
use blogscout::models::FeedStatus;
use blogscout::report::{Report, ReportFormat, ReportMetadata};

#[derive(Parser)]
#[command(
    name = "blogscout",
    version,
    about = "Scan blog feeds for recent posts relevant to a topic using a local LLM",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging and per-post progress
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch feeds, classify recent posts and write a report
    Scan(ScanArgs),

    /// Check that the Ollama endpoint is reachable
    Check,

    /// Validate the blog directory and configuration without fetching
    Validate {
        /// Blog directory file (JSON)
        #[arg(short, long)]
        blogs: PathBuf,

        /// Topic filter file (TOML)
        #[arg(long)]
        filter: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Blog directory file (JSON)
    #[arg(short, long)]
    blogs: PathBuf,

    /// Topic filter file (TOML)
    #[arg(long)]
    filter: Option<PathBuf>,

    /// Recency window in months
    #[arg(short, long)]
    months: Option<u32>,

    /// Maximum number of feeds processed at once
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Ollama model name
    #[arg(long)]
    model: Option<String>,

    /// Ollama endpoint URL
    #[arg(long)]
    ollama_url: Option<String>,

    /// Output file path (prints to stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (json, csv, markdown); inferred from --output when omitted
    #[arg(short, long)]
    format: Option<ReportFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Scan(args) => {
            tracing::info!(
                blogs = %args.blogs.display(),
                months = ?args.months,
                concurrency = ?args.concurrency,
                output = ?args.output,
                "Starting scan command"
            );
            scan(config, args, cli.verbose).await?;
        }

        Commands::Check => {
            check(&config).await?;
        }

        Commands::Validate { blogs, filter } => {
            validate(config, &blogs, filter.as_deref())?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("blogscout=debug,warn")
        } else {
            EnvFilter::new(format!("blogscout={level},warn"))
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        "text" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        other => anyhow::bail!("unknown log format '{other}' (expected text or json)"),
    }

    Ok(())
}

/// Apply `scan` flags on top of file and environment configuration
fn apply_overrides(config: &mut Config, args: &ScanArgs) -> Result<()> {
    if let Some(path) = &args.filter {
        config.filter = FilterConfig::from_file(path)?;
    }
    if let Some(months) = args.months {
        config.analyzer.months = months;
    }
    if let Some(concurrency) = args.concurrency {
        config.analyzer.concurrency = concurrency;
    }
    if let Some(model) = &args.model {
        config.llm.model.clone_from(model);
    }
    if let Some(url) = &args.ollama_url {
        config.llm.endpoint.clone_from(url);
    }
    config.validate()
}

async fn scan(mut config: Config, args: ScanArgs, verbose: bool) -> Result<()> {
    apply_overrides(&mut config, &args)?;

    let directory = BlogDirectory::load(&args.blogs)?;
    let urls = directory.feed_urls();

    let fetcher = HttpFeedFetcher::new(&config.fetcher).context("Failed to create feed fetcher")?;
    let classifier = OllamaClassifier::new(&config.llm, &config.filter.topic)
        .context("Failed to create Ollama client")?;

    if !classifier.is_available().await {
        tracing::warn!(
            endpoint = %config.llm.endpoint,
            "Ollama is not reachable; posts will be reported as not relevant"
        );
    }

    let analyzer = FeedAnalyzer::new(Arc::new(fetcher))
        .with_classifier(Arc::new(classifier))
        .with_guard(FalsePositiveGuard::new(&config.filter));

    let cancel = Cancellation::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted, waiting for running feeds to stop...");
                cancel.cancel("interrupted by user");
            }
        }
    });

    let clock = system_clock();
    let started_at = clock();

    let mut options = AnalyzeOptions::from(&config.analyzer)
        .with_cancellation(cancel)
        .with_clock(clock)
        .on_progress(print_progress);
    if verbose {
        options = options.on_verbose(print_verbose);
    }

    let results = analyzer.analyze(&urls, &options).await?;

    let metadata = ReportMetadata {
        topic: config.filter.topic.clone(),
        months: config.analyzer.months,
        cutoff: cutoff_from_millis(started_at, config.analyzer.months),
        generated_at: Utc::now(),
        model: Some(config.llm.model.clone()),
    };
    let report = Report::new(metadata, &results, Some(&directory));

    let format = args
        .format
        .or_else(|| args.output.as_deref().and_then(ReportFormat::from_path))
        .unwrap_or(ReportFormat::Markdown);

    match &args.output {
        Some(path) => {
            report
                .write_to(path, format)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{}", report.render(format)?),
    }

    let totals = &report.totals;
    eprintln!(
        "{} feeds: {} fulfilled, {} rejected; {} posts analyzed, {} relevant",
        totals.feeds, totals.fulfilled, totals.rejected, totals.analyzed_items, totals.relevant_posts
    );

    Ok(())
}

fn print_progress(update: &ProgressUpdate) {
    let mark = match update.status {
        FeedStatus::Fulfilled => "✓",
        FeedStatus::Rejected => "✗",
    };
    let duration = update
        .duration_ms
        .map(|ms| format!(" ({ms} ms)"))
        .unwrap_or_default();
    let error = update
        .error
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default();

    eprintln!(
        "[{}/{}] {} {}{}{}",
        update.completed, update.total, mark, update.feed_url, duration, error
    );
}

fn print_verbose(event: &VerboseEvent) {
    let name = event.feed_title.as_deref().unwrap_or(&event.feed_url);
    eprintln!("    {name}: {}", event.message);
}

async fn check(config: &Config) -> Result<()> {
    let classifier = OllamaClassifier::new(&config.llm, &config.filter.topic)
        .context("Failed to create Ollama client")?;

    if classifier.is_available().await {
        println!(
            "Ollama is available at {} (model: {})",
            config.llm.endpoint,
            classifier.model()
        );
        Ok(())
    } else {
        anyhow::bail!("Ollama is not reachable at {}", config.llm.endpoint)
    }
}

fn validate(mut config: Config, blogs: &Path, filter: Option<&Path>) -> Result<()> {
    if let Some(path) = filter {
        config.filter = FilterConfig::from_file(path)?;
    }
    config.validate()?;

    let directory = BlogDirectory::load(blogs)?;

    println!("Configuration OK");
    println!("  Topic: {}", config.filter.topic);
    println!("  Keywords: {}", config.filter.keywords.join(", "));
    println!("  Window: {} months, concurrency {}", config.analyzer.months, config.analyzer.concurrency);
    println!("Blog directory OK: {} feeds", directory.len());
    for skipped in directory.skipped() {
        println!("  skipped entry #{}: {}", skipped.index, skipped.reason);
    }

    Ok(())
}
