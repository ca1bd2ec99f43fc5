//! ndi-prechange - Pre-change analysis runner for Nexus Dashboard Insights
//!
//! Submits a configuration change for offline analysis against the latest
//! baseline epoch of a site and reports how many new anomalies it would cause.
//!
//! Exit codes:
//!   0        - No new relevant anomalies (informational excluded)
//!   1..=247  - Number of new relevant anomalies (clamped at 247)
//!   248      - Setup failure (usage, config, unreadable change file)
//!   249..=255 - Workflow failure: malformed delta, delta fetch, poll timeout,
//!               status fetch, job creation, baseline lookup, authentication

mod analysis;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod report;
mod workflow;

use anyhow::{bail, Context, Result};
use cli::Args;
use client::NexusClient;
use config::{Config, DEFAULT_CONFIG_FILE, PASSWORD_ENV};
use error::{WorkflowError, EXIT_SETUP_FAILURE};
use models::{ChangeFile, RunParameters};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use workflow::{JobPoller, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments; usage errors must not look like an anomaly count
    let args = match Args::try_parse_args() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(EXIT_SETUP_FAILURE);
        }
        Err(e) => e.exit(),
    };

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_SETUP_FAILURE);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("ndi-prechange v{}", env!("CARGO_PKG_VERSION"));

    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Pre-change analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// Handle --init-config: generate a default .ndi-prechange.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(EXIT_SETUP_FAILURE);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Credentials are still read from ND_USERNAME / ND_PASSWORD.");
    Ok(())
}

/// Initialize logging from --loglevel, unless RUST_LOG overrides it.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(args.log_level()).into())
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Sentinel for a failed run: the workflow phase's code, or setup failure.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<WorkflowError>()
        .map(WorkflowError::exit_code)
        .unwrap_or(EXIT_SETUP_FAILURE)
}

/// Run the complete pre-change workflow. Returns the anomaly exit code.
async fn run_analysis(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.merge_password(std::env::var(PASSWORD_ENV).ok());

    if config.analysis.timeout_minutes == 0 {
        bail!("Analysis timeout must be at least 1 minute");
    }
    let settings = config.controller_settings()?;

    let change_path = args
        .file
        .clone()
        .context("A change definition file is required (--file)")?;
    let content = tokio::fs::read(&change_path)
        .await
        .with_context(|| format!("Failed to read change file: {}", change_path.display()))?;
    let change_file = ChangeFile::new(&change_path, content);
    debug!("Change file: {:?}", change_file);

    let params = RunParameters {
        name: args.name().to_string(),
        description: args.descr.clone(),
        insights_group: args.insights_group().to_string(),
        site: args.site().to_string(),
        allow_unsupported_object_modification: config
            .analysis
            .allow_unsupported_object_modification,
    };

    let client = NexusClient::new(&settings).context("Failed to create HTTP client")?;
    let poller = JobPoller::with_timeout_minutes(config.analysis.timeout_minutes)
        .with_progress(!args.quiet);

    if !args.quiet {
        println!(
            "🔬 Pre-change analysis '{}' on site {} (insights group {})",
            params.name, params.site, params.insights_group
        );
        println!("   Controller: {}", settings.base_url);
        println!("   Change file: {}", change_file.file_name);
        println!("   Timeout: {} min", config.analysis.timeout_minutes);
    }

    let summary = Orchestrator::new(&client, poller)
        .run(&settings.credentials, &params, &change_file)
        .await?;

    if let Some(ref path) = args.output {
        match report::write_report(&summary, args.format, path) {
            Ok(()) => info!("Run summary written to {}", path.display()),
            Err(e) => warn!("{:#}", e),
        }
    }

    if !args.quiet {
        println!("\n📊 New anomalies by severity:");
        for bucket in &summary.delta.buckets {
            let note = if bucket.counted { "" } else { " (ignored)" };
            println!("   - {}: {}{}", bucket.severity, bucket.new_count, note);
        }
        if summary.anomaly_count() == 0 {
            println!("\n✅ No new relevant anomalies.");
        } else {
            println!(
                "\n⛔ {} new relevant anomalies (exit code {}).",
                summary.anomaly_count(),
                summary.exit_code()
            );
        }
    }

    Ok(summary.exit_code())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a file that is present but broken is a setup failure
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error::ApiError;

    #[test]
    fn test_exit_code_for_workflow_errors() {
        let err: anyhow::Error = WorkflowError::DeltaFetch(ApiError::Empty("x".to_string())).into();
        assert_eq!(exit_code_for(&err), -6);

        let err = anyhow::anyhow!("config broken");
        assert_eq!(exit_code_for(&err), EXIT_SETUP_FAILURE);
    }

    #[test]
    fn test_broken_config_is_setup_failure() {
        let mut broken = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut broken, b"[analysis\n").unwrap();

        let mut args = cli::tests::make_args();
        args.config = Some(broken.path().to_path_buf());
        let err = load_config(&args).unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_SETUP_FAILURE);
    }
}
