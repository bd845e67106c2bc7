//! Configuration for stackpair

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default user agent for archive.org requests
pub const DEFAULT_USER_AGENT: &str = "stackpair/0.1 (+https://github.com/stackpair)";

/// Main configuration for a corpus build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output destination configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Question-answer pairing configuration
    #[serde(default)]
    pub pairing: PairingConfig,
    /// Dump download configuration
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Corpus container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One text file per pair in a per-site directory
    Dir,
    /// One zip archive per site
    Zip,
    /// One zstd-compressed JSON lines file per site
    JsonlZst,
}

/// Output destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Container format for built corpora
    pub format: OutputFormat,
    /// Directory the corpora are written under
    pub out_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Dir,
            out_dir: PathBuf::from("corpus"),
        }
    }
}

/// Question-answer pairing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Minimum score for a non-accepted answer to count as an answer
    pub min_score: i64,
    /// Maximum answers emitted per question
    pub max_responses: usize,
    /// Keep below-threshold answers in the record instead of dropping them
    pub retain_below_threshold: bool,
    /// Emit questions still waiting on answers when the dump ends
    pub flush_incomplete_at_eof: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            min_score: 3,
            max_responses: 3,
            retain_below_threshold: true,
            flush_incomplete_at_eof: false,
        }
    }
}

/// Dump download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Directory downloaded dumps are unpacked under
    pub sources_dir: PathBuf,
    /// Keep the 7z archives after extraction
    pub keep_sources: bool,
    /// User agent string
    pub user_agent: String,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            sources_dir: PathBuf::from("sources"),
            keep_sources: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    ///
    /// A config file is optional for every command, so a missing file is not
    /// an error. A file that exists but fails to parse or validate still is.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("no config file at '{}', using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects every problem and reports them in one error, so a broken
    /// file gets fixed in a single pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Pairing validation
        if self.pairing.max_responses == 0 {
            errors.push("max_responses must be positive".to_string());
        }

        // Output validation
        if self.output.out_dir.as_os_str().is_empty() {
            errors.push("out_dir must not be empty".to_string());
        }

        // Fetch validation
        if self.fetch.sources_dir.as_os_str().is_empty() {
            errors.push("sources_dir must not be empty".to_string());
        }
        if self.fetch.user_agent.is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if self.fetch.connect_timeout_secs == 0 {
            errors.push("connect_timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Config::validate
    // ========================================================================

    #[test]
    fn default_config_passes_validation() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn validate_rejects_zero_max_responses() {
        let mut cfg = Config::default();
        cfg.pairing.max_responses = 0;
        let err = cfg.validate().unwrap_err();
        assert!(
            err.to_string().contains("max_responses must be positive"),
            "unexpected error message: {}",
            err
        );
    }

    #[test]
    fn validate_accepts_negative_min_score() {
        let mut cfg = Config::default();
        cfg.pairing.min_score = -4;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_out_dir() {
        let mut cfg = Config::default();
        cfg.output.out_dir = PathBuf::from("");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("out_dir must not be empty"));
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut cfg = Config::default();
        cfg.fetch.user_agent = String::new();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("user_agent must not be empty"));
    }

    #[test]
    fn validate_rejects_zero_connect_timeout() {
        let mut cfg = Config::default();
        cfg.fetch.connect_timeout_secs = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("connect_timeout_secs must be positive"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = Config::default();
        cfg.pairing.max_responses = 0;
        cfg.fetch.user_agent = String::new();
        cfg.fetch.connect_timeout_secs = 0;
        let err = cfg.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("max_responses must be positive"));
        assert!(msg.contains("user_agent must not be empty"));
        assert!(msg.contains("connect_timeout_secs must be positive"));
    }

    // ========================================================================
    // Config::load
    // ========================================================================

    #[test]
    fn load_parses_full_config() {
        let toml = r#"
            [output]
            format = "zip"
            out_dir = "/tmp/corpora"

            [pairing]
            min_score = 5
            max_responses = 2
            retain_below_threshold = false
            flush_incomplete_at_eof = true

            [fetch]
            sources_dir = "/tmp/dumps"
            keep_sources = true
            user_agent = "test-agent/1.0"
            connect_timeout_secs = 10
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stackpair.toml");
        std::fs::write(&path, toml).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.output.format, OutputFormat::Zip);
        assert_eq!(cfg.output.out_dir, PathBuf::from("/tmp/corpora"));
        assert_eq!(cfg.pairing.min_score, 5);
        assert_eq!(cfg.pairing.max_responses, 2);
        assert!(!cfg.pairing.retain_below_threshold);
        assert!(cfg.pairing.flush_incomplete_at_eof);
        assert_eq!(cfg.fetch.sources_dir, PathBuf::from("/tmp/dumps"));
        assert!(cfg.fetch.keep_sources);
        assert_eq!(cfg.fetch.user_agent, "test-agent/1.0");
        assert_eq!(cfg.fetch.connect_timeout_secs, 10);
    }

    #[test]
    fn load_fills_missing_sections_with_defaults() {
        let toml = r#"
            [pairing]
            min_score = 1
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stackpair.toml");
        std::fs::write(&path, toml).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.pairing.min_score, 1);
        assert_eq!(cfg.output.format, OutputFormat::Dir);
        assert_eq!(cfg.fetch.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let err = Config::load(Path::new("/nonexistent/stackpair.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
        assert!(err.to_string().contains("/nonexistent/stackpair.toml"));
    }

    #[test]
    fn load_reports_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stackpair.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let toml = r#"
            [pairing]
            max_responses = 0
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stackpair.toml");
        std::fs::write(&path, toml).unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Configuration validation failed"));
    }

    #[test]
    fn load_or_default_uses_defaults_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg.pairing.min_score, 3);
        assert_eq!(cfg.pairing.max_responses, 3);
    }

    // ========================================================================
    // Serde names
    // ========================================================================

    #[test]
    fn output_format_uses_snake_case_names() {
        let toml = r#"
            [output]
            format = "jsonl_zst"
            out_dir = "corpus"
        "#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert_eq!(cfg.output.format, OutputFormat::JsonlZst);
    }

    #[test]
    fn default_sections_spot_check() {
        let cfg = Config::default();
        assert_eq!(cfg.output.out_dir, PathBuf::from("corpus"));
        assert_eq!(cfg.fetch.sources_dir, PathBuf::from("sources"));
        assert!(!cfg.fetch.keep_sources);
        assert!(cfg.pairing.retain_below_threshold);
        assert!(!cfg.pairing.flush_incomplete_at_eof);
    }
}
