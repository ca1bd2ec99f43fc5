//! Configuration file handling.
//!
//! Settings come from an optional `.ndi-prechange.toml`, then CLI flags and
//! their `ND_*` environment variables. The merged result is resolved once into
//! `ControllerSettings` and handed to the client.

use crate::client::Credentials;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".ndi-prechange.toml";

/// The only source of the login password.
pub const PASSWORD_ENV: &str = "ND_PASSWORD";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Controller connection settings.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Pre-change analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Nexus Dashboard connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Host name or base URL of the dashboard.
    #[serde(default)]
    pub host: Option<String>,

    /// Login user.
    #[serde(default)]
    pub username: Option<String>,

    /// Login domain.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Accept self-signed controller certificates.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Only ever taken from `ND_PASSWORD`.
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            domain: default_domain(),
            accept_invalid_certs: true,
            request_timeout_seconds: default_request_timeout(),
            password: None,
        }
    }
}

fn default_domain() -> String {
    "DefaultAuth".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    60
}

/// Pre-change analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How long to wait for the analysis job, in minutes.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,

    /// Submit even when the change touches unsupported objects.
    #[serde(default)]
    pub allow_unsupported_object_modification: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            allow_unsupported_object_modification: false,
        }
    }
}

fn default_timeout_minutes() -> u64 {
    15
}

/// Fully resolved connection settings.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub base_url: String,
    pub credentials: Credentials,
    pub accept_invalid_certs: bool,
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_optional(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load `path` if it exists. A file that exists but can't be parsed is an error.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge CLI arguments (and the env vars clap read for them) into this config.
    ///
    /// Only values actually provided override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.controller.host = Some(host.clone());
        }
        if let Some(ref username) = args.username {
            self.controller.username = Some(username.clone());
        }
        if let Some(ref domain) = args.domain {
            self.controller.domain = domain.clone();
        }

        if let Some(timeout) = args.timeout {
            self.analysis.timeout_minutes = timeout;
        }
        if args.allow_unsupported_object_modification {
            self.analysis.allow_unsupported_object_modification = true;
        }
    }

    /// Set the password read from `ND_PASSWORD`. Empty values are ignored.
    pub fn merge_password(&mut self, password: Option<String>) {
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.controller.password = Some(password);
        }
    }

    /// Resolve the connection settings, failing on anything missing.
    pub fn controller_settings(&self) -> Result<ControllerSettings> {
        let host = match self.controller.host.as_deref().map(str::trim) {
            Some(h) if !h.is_empty() => h,
            _ => bail!("Controller host is not set (use --host or ND_HOST)"),
        };
        let username = match self.controller.username.as_deref() {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => bail!("Controller user is not set (use --username or ND_USERNAME)"),
        };
        let password = match self.controller.password.as_deref() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => bail!("Controller password is not set (use ND_PASSWORD)"),
        };

        if self.controller.request_timeout_seconds == 0 {
            bail!("request_timeout_seconds must be at least 1");
        }

        Ok(ControllerSettings {
            base_url: base_url_for(host),
            credentials: Credentials {
                username,
                password,
                domain: self.controller.domain.clone(),
            },
            accept_invalid_certs: self.controller.accept_invalid_certs,
            request_timeout: Duration::from_secs(self.controller.request_timeout_seconds),
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// `nd.example.com` becomes `https://nd.example.com`; explicit schemes are kept.
fn base_url_for(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
