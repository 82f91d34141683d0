use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub storage_dir: Option<String>,

    // Feature configs
    pub session: Option<SessionConfig>,
    pub retry: Option<RetryConfig>,
    pub resume: Option<ResumeConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_days: Option<u64>,
    pub sweep_interval_minutes: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub initial_backoff_secs: Option<f64>,
    pub backoff_multiplier: Option<f64>,
    pub max_backoff_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ResumeConfig {
    pub max_file_size_bytes: Option<u64>,
    pub max_page_limit: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let config = FileConfig::parse(
            r#"
            db_path = "/var/lib/mentorhub/core.db"

            [session]
            ttl_days = 3

            [retry]
            backoff_multiplier = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path.as_deref(), Some("/var/lib/mentorhub/core.db"));
        assert!(config.storage_dir.is_none());
        let session = config.session.unwrap();
        assert_eq!(session.ttl_days, Some(3));
        assert_eq!(session.sweep_interval_minutes, None);
        assert_eq!(config.retry.unwrap().backoff_multiplier, Some(1.5));
        assert!(config.resume.is_none());
    }

    #[test]
    fn empty_file_is_valid() {
        let config = FileConfig::parse("").unwrap();
        assert!(config.db_path.is_none());
        assert!(config.session.is_none());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(FileConfig::parse("[session]\nttl_days = \"seven\"").is_err());
    }
}
