//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.user-aggregator.toml` files.

use crate::cli::OutputFormat;
use crate::fetch::HttpFetcherConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".user-aggregator.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// HTTP source settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report file path. The report goes to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Time budget of each dependent fetch, in milliseconds.
    #[serde(default = "default_dependent_timeout_ms")]
    pub dependent_timeout_ms: u64,

    /// Overall deadline after which the aggregation is cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            dependent_timeout_ms: default_dependent_timeout_ms(),
            deadline_ms: None,
        }
    }
}

impl AggregatorConfig {
    pub fn dependent_timeout(&self) -> Duration {
        Duration::from_millis(self.dependent_timeout_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

fn default_dependent_timeout_ms() -> u64 {
    2000
}

/// HTTP source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the user service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Path of the current user's details.
    #[serde(default = "default_user_path")]
    pub user_path: String,

    /// Path template of a user's comments (`{id}` is substituted).
    #[serde(default = "default_comments_path")]
    pub comments_path: String,

    /// Path template of a user's friends (`{id}` is substituted).
    #[serde(default = "default_friends_path")]
    pub friends_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            user_path: default_user_path(),
            comments_path: default_comments_path(),
            friends_path: default_friends_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_path() -> String {
    "/user".to_string()
}

fn default_comments_path() -> String {
    "/users/{id}/comments".to_string()
}

fn default_friends_path() -> String {
    "/users/{id}/friends".to_string()
}

impl From<&HttpConfig> for HttpFetcherConfig {
    fn from(config: &HttpConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            request_timeout_seconds: config.request_timeout_seconds,
            user_path: config.user_path.clone(),
            comments_path: config.comments_path.clone(),
            friends_path: config.friends_path.clone(),
        }
    }
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.http.base_url = base_url.clone();
        }
        if let Some(timeout_ms) = args.timeout_ms {
            self.aggregator.dependent_timeout_ms = timeout_ms;
        }
        if let Some(deadline_ms) = args.deadline_ms {
            self.aggregator.deadline_ms = Some(deadline_ms);
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that are only meaningful once file and flags are merged.
    pub fn validate(&self) -> Result<()> {
        if self.aggregator.dependent_timeout_ms == 0 {
            bail!("dependent_timeout_ms must be at least 1 millisecond");
        }
        if self.aggregator.deadline_ms == Some(0) {
            bail!("deadline_ms must be at least 1 millisecond");
        }
        if self.http.request_timeout_seconds == 0 {
            bail!("request_timeout_seconds must be at least 1 second");
        }
        if !self.http.base_url.starts_with("http://") && !self.http.base_url.starts_with("https://")
        {
            bail!("base_url must start with 'http://' or 'https://'");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.aggregator.dependent_timeout(), Duration::from_millis(2000));
        assert_eq!(config.aggregator.deadline(), None);
        assert_eq!(config.http.base_url, "http://localhost:8080");
        assert_eq!(config.general.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "user.json"
format = "json"
verbose = true

[aggregator]
dependent_timeout_ms = 500
deadline_ms = 5000

[http]
base_url = "https://api.example.com"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("user.json"));
        assert_eq!(config.general.format, OutputFormat::Json);
        assert!(config.general.verbose);
        assert_eq!(config.aggregator.dependent_timeout_ms, 500);
        assert_eq!(config.aggregator.deadline(), Some(Duration::from_millis(5000)));
        assert_eq!(config.http.base_url, "https://api.example.com");
        assert_eq!(config.http.comments_path, "/users/{id}/comments");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[aggregator]"));
        assert!(toml_str.contains("[http]"));
        assert!(toml_str.contains("dependent_timeout_ms = 2000"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[aggregator]\ndependent_timeout_ms = 750\n",
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.aggregator.dependent_timeout_ms, 750);
    }

    #[test]
    fn test_merge_with_args_only_overrides_explicit_values() {
        let mut config: Config = toml::from_str(
            "[aggregator]\ndependent_timeout_ms = 750\n[http]\nbase_url = \"http://a\"\n",
        )
        .unwrap();

        let args = Args::parse_from(["user-aggregator", "--deadline-ms", "3000"]);
        config.merge_with_args(&args);

        assert_eq!(config.aggregator.dependent_timeout_ms, 750);
        assert_eq!(config.aggregator.deadline_ms, Some(3000));
        assert_eq!(config.http.base_url, "http://a");

        let args = Args::parse_from(["user-aggregator", "--timeout-ms", "100", "--format", "json"]);
        config.merge_with_args(&args);
        assert_eq!(config.aggregator.dependent_timeout_ms, 100);
        assert_eq!(config.general.format, OutputFormat::Json);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_durations_from_file() {
        let config: Config = toml::from_str("[aggregator]\ndependent_timeout_ms = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dependent_timeout_ms"));

        let config: Config = toml::from_str("[aggregator]\ndeadline_ms = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("deadline_ms"));
    }

    #[test]
    fn test_flag_overrides_invalid_file_timeout() {
        let mut config: Config =
            toml::from_str("[aggregator]\ndependent_timeout_ms = 0\n").unwrap();
        let args = Args::parse_from(["user-aggregator", "--timeout-ms", "250"]);
        config.merge_with_args(&args);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url_from_file() {
        let config: Config = toml::from_str("[http]\nbase_url = \"ftp://svc\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_fetcher_config_from_http_config() {
        let http = HttpConfig {
            base_url: "http://svc".to_string(),
            ..HttpConfig::default()
        };
        let fetcher_config = HttpFetcherConfig::from(&http);
        assert_eq!(fetcher_config.base_url, "http://svc");
        assert_eq!(fetcher_config.friends_path, "/users/{id}/friends");
    }
}
