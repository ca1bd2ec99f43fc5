//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// ndi-prechange - Pre-change analysis runner for Nexus Dashboard Insights
///
/// Submits a configuration change file for pre-change analysis against the
/// latest finished epoch of a site, waits for the job, and exits with the
/// number of new non-informational anomalies (0 means the change is clean).
///
/// Controller address and credentials are read from ND_HOST, ND_USERNAME,
/// ND_PASSWORD and ND_DOMAIN.
///
/// Examples:
///   ndi-prechange --name add-vlan-10 --igname default --site fab1 --file change.json
///   ndi-prechange --name epg-move --igname ig1 --site fab1 --file epg.xml --timeout 30
///   ndi-prechange --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Pre-change analysis name
    #[arg(long, value_name = "NAME", required_unless_present = "init_config")]
    pub name: Option<String>,

    /// Pre-change analysis description
    #[arg(long, default_value = "", value_name = "TEXT")]
    pub descr: String,

    /// Insights group name
    #[arg(long, value_name = "GROUP", required_unless_present = "init_config")]
    pub igname: Option<String>,

    /// Site or fabric name
    #[arg(long, value_name = "SITE", required_unless_present = "init_config")]
    pub site: Option<String>,

    /// Change definition file path
    #[arg(long, value_name = "FILE", required_unless_present = "init_config")]
    pub file: Option<PathBuf>,

    /// Ignore unsupported object modifications and continue
    #[arg(
        long = "allowUnsupportedObjectModification",
        visible_alias = "allow-unsupported-object-modification"
    )]
    pub allow_unsupported_object_modification: bool,

    /// Pre-change analysis timeout, in minutes (default: from config or 15)
    ///
    /// The job status is checked once per minute, so this is also the
    /// number of status checks performed before giving up.
    #[arg(long, value_name = "MINUTES")]
    pub timeout: Option<u64>,

    /// Logging level
    #[arg(long, default_value = "WARNING", ignore_case = true, value_name = "LEVEL")]
    pub loglevel: LogLevel,

    /// Nexus Dashboard host name or base URL
    #[arg(long, env = "ND_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Login user
    #[arg(long, env = "ND_USERNAME", value_name = "USER")]
    pub username: Option<String>,

    /// Login domain
    #[arg(long, env = "ND_DOMAIN", value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ndi-prechange.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a run summary to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Format of the run summary (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Run in quiet mode (no progress output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .ndi-prechange.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

/// Logging level names accepted by --loglevel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    #[value(name = "CRITICAL")]
    Critical,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "INFO")]
    Info,
    #[value(name = "DEBUG")]
    Debug,
}

impl Args {
    /// Parse command-line arguments, returning clap's error for the caller to report.
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn insights_group(&self) -> &str {
        self.igname.as_deref().unwrap_or("")
    }

    pub fn site(&self) -> &str {
        self.site.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.name().trim().is_empty() {
            return Err("Analysis name must not be empty".to_string());
        }
        if self.insights_group().trim().is_empty() {
            return Err("Insights group name must not be empty".to_string());
        }
        if self.site().trim().is_empty() {
            return Err("Site name must not be empty".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 minute".to_string());
            }
        }

        if let Some(ref file) = self.file {
            if !file.exists() {
                return Err(format!("Change file does not exist: {}", file.display()));
            }
            if !file.is_file() {
                return Err(format!("Change file is not a regular file: {}", file.display()));
            }
        }

        Ok(())
    }

    /// Returns the tracing level for --loglevel.
    pub fn log_level(&self) -> tracing::Level {
        match self.loglevel {
            LogLevel::Critical | LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            name: Some("add-vlan".to_string()),
            descr: String::new(),
            igname: Some("ig1".to_string()),
            site: Some("fab1".to_string()),
            file: None,
            allow_unsupported_object_modification: false,
            timeout: None,
            loglevel: LogLevel::Warning,
            host: None,
            username: None,
            domain: None,
            config: None,
            output: None,
            format: OutputFormat::Json,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_camel_case_flag_names() {
        let args = Args::try_parse_from([
            "ndi-prechange",
            "--name",
            "n1",
            "--igname",
            "ig1",
            "--site",
            "fab1",
            "--file",
            "change.json",
            "--allowUnsupportedObjectModification",
            "--timeout",
            "30",
            "--loglevel",
            "DEBUG",
        ])
        .unwrap();

        assert_eq!(args.name(), "n1");
        assert_eq!(args.descr, "");
        assert!(args.allow_unsupported_object_modification);
        assert_eq!(args.timeout, Some(30));
        assert_eq!(args.loglevel, LogLevel::Debug);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_kebab_case_alias() {
        let args = Args::try_parse_from([
            "ndi-prechange",
            "--name",
            "n1",
            "--igname",
            "ig1",
            "--site",
            "fab1",
            "--file",
            "c.json",
            "--allow-unsupported-object-modification",
            "--loglevel",
            "info",
        ])
        .unwrap();
        assert!(args.allow_unsupported_object_modification);
        assert_eq!(args.loglevel, LogLevel::Info);
    }

    #[test]
    fn test_required_flags() {
        assert!(Args::try_parse_from(["ndi-prechange", "--name", "n1"]).is_err());
        assert!(Args::try_parse_from(["ndi-prechange", "--init-config"]).is_ok());
    }

    #[test]
    fn test_no_password_flag() {
        let result = Args::try_parse_from([
            "ndi-prechange",
            "--name",
            "n1",
            "--igname",
            "ig1",
            "--site",
            "fab1",
            "--file",
            "c.json",
            "--password",
            "hunter2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_file() {
        let mut args = make_args();
        args.file = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(args.validate().is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        args.file = Some(file.path().to_path_buf());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_blank_name() {
        let mut args = make_args();
        args.name = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::WARN);

        args.loglevel = LogLevel::Critical;
        assert_eq!(args.log_level(), tracing::Level::ERROR);

        args.loglevel = LogLevel::Debug;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);
    }
}
