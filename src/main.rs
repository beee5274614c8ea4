//! user-aggregator - aggregate a user's details, comments and friends
//!
//! A CLI front end over the aggregation library. Loads the user from an
//! HTTP service (or a fixture), then their comments and friends
//! concurrently, and renders the combined result as a report.
//!
//! Exit codes:
//!   0   - Success (comments/friends may have degraded to empty)
//!   1   - Runtime error (user could not be loaded, bad config, etc.)
//!   130 - Aggregation cancelled (Ctrl-C or --deadline-ms)

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use user_aggregator::cli::{Args, OutputFormat};
use user_aggregator::config::{Config, CONFIG_FILE_NAME};
use user_aggregator::fetch::{
    CommentsFetcher, FriendsFetcher, HttpFetcher, HttpFetcherConfig, Script, ScriptedFetcher,
    UserFetcher,
};
use user_aggregator::report::{self, Report, ReportMetadata};
use user_aggregator::{AggregateError, Aggregator};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("user-aggregator v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default config file.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the service URL, timeouts and output.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` takes precedence.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run one aggregation and emit the report. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let (source, aggregator) = build_aggregator(&args, &config)?;
    let aggregator = Arc::new(
        aggregator.with_dependent_timeout(config.aggregator.dependent_timeout()),
    );

    eprintln!("🔎 Aggregating user from {}", source);
    eprintln!(
        "   Dependent timeout: {}ms",
        config.aggregator.dependent_timeout_ms
    );

    // Ctrl-C closes the aggregator for good.
    let closer = aggregator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling aggregation");
            closer.close();
        }
    });

    // An overall deadline only cancels this call.
    let ctx = CancellationToken::new();
    if let Some(deadline) = config.aggregator.deadline() {
        eprintln!("   Deadline: {}ms", deadline.as_millis());
        let expired = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!("Deadline of {}ms reached", deadline.as_millis());
            expired.cancel();
        });
    }

    let aggregation = match aggregator.aggregate_with_outcome(&ctx).await {
        Ok(aggregation) => aggregation,
        Err(AggregateError::Cancelled) => {
            eprintln!("\n⛔ Aggregation cancelled.");
            return Ok(130);
        }
        Err(e) => return Err(e).context("Could not aggregate user"),
    };

    if aggregation.comments.is_degraded() {
        eprintln!("   ⚠️  Comments: {}", aggregation.comments);
    }
    if aggregation.friends.is_degraded() {
        eprintln!("   ⚠️  Friends: {}", aggregation.friends);
    }

    let metadata = ReportMetadata {
        source,
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
        dependent_timeout_ms: config.aggregator.dependent_timeout_ms,
    };
    let report = Report::new(metadata, aggregation);

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match config.general.output {
        Some(ref path) => {
            report::write_report(&output, std::path::Path::new(path))?;
            eprintln!("\n✅ Report saved to: {}", path);
        }
        None => println!("{}", output),
    }

    eprintln!(
        "\n📊 {} comments, {} friends in {:.2}s",
        report.result.comments.len(),
        report.result.friends.len(),
        report.metadata.duration_seconds
    );

    Ok(0)
}

/// Build the aggregator over the configured source. Returns a description of the source too.
fn build_aggregator(args: &Args, config: &Config) -> Result<(String, Aggregator)> {
    if let Some(ref fixture) = args.fixture {
        info!("Playing back fixture: {}", fixture.display());
        let script = Script::load(fixture)?;
        let fetcher = Arc::new(ScriptedFetcher::new(script));
        return Ok((fixture.display().to_string(), aggregator_over(fetcher)));
    }

    let fetcher = HttpFetcher::new(HttpFetcherConfig::from(&config.http))
        .context("Failed to create HTTP fetcher")?;
    Ok((config.http.base_url.clone(), aggregator_over(Arc::new(fetcher))))
}

/// Use one fetcher for all three capabilities.
fn aggregator_over<F>(fetcher: Arc<F>) -> Aggregator
where
    F: UserFetcher + CommentsFetcher + FriendsFetcher + 'static,
{
    Aggregator::new(fetcher.clone(), fetcher.clone(), fetcher)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
