mod file_config;

pub use file_config::{FileConfig, ResumeConfig, RetryConfig, SessionConfig};

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

pub const DEFAULT_SESSION_TTL_DAYS: u64 = 7;
pub const DEFAULT_SWEEP_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_MAX_RESUME_SIZE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_PAGE_LIMIT: usize = 100;
pub const MAX_SESSION_TTL_DAYS: u64 = 3650;
pub const MAX_SWEEP_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
/// Upper bound for any single wait between two storage attempts.
pub const MAX_BACKOFF_SECS: f64 = 3600.0;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub session_ttl_days: Option<u64>,
    pub sweep_interval_minutes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,

    pub session: SessionSettings,
    pub retry: RetrySettings,
    pub resume: ResumeSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub ttl_days: u64,
    pub sweep_interval_minutes: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_days: DEFAULT_SESSION_TTL_DAYS,
            sweep_interval_minutes: DEFAULT_SWEEP_INTERVAL_MINUTES,
        }
    }
}

impl SessionSettings {
    pub fn ttl(&self) -> chrono::Duration {
        i64::try_from(self.ttl_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// `None` when the interval does not fit in seconds.
    pub fn sweep_interval(&self) -> Option<std::time::Duration> {
        self.sweep_interval_minutes
            .checked_mul(60)
            .map(std::time::Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_secs: f64,
    pub backoff_multiplier: f64,
    pub max_backoff_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_secs: 2.0,
            backoff_multiplier: 2.0,
            max_backoff_secs: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeSettings {
    pub max_file_size_bytes: u64,
    pub max_page_limit: usize,
}

impl Default for ResumeSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_RESUME_SIZE_BYTES,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| anyhow!("db_path must be specified via --db-path or in config file"))?;

        if db_path.is_dir() {
            bail!("db_path points to a directory: {:?}", db_path);
        }

        // Default storage dir sits next to the database file
        let storage_dir = file
            .storage_dir
            .map(PathBuf::from)
            .or_else(|| cli.storage_dir.clone())
            .unwrap_or_else(|| {
                db_path
                    .parent()
                    .map(|p| p.join("objects"))
                    .unwrap_or_else(|| PathBuf::from("objects"))
            });

        let session_file = file.session.unwrap_or_default();
        let session_defaults = SessionSettings::default();
        let session = SessionSettings {
            ttl_days: session_file
                .ttl_days
                .or(cli.session_ttl_days)
                .unwrap_or(session_defaults.ttl_days),
            sweep_interval_minutes: session_file
                .sweep_interval_minutes
                .or(cli.sweep_interval_minutes)
                .unwrap_or(session_defaults.sweep_interval_minutes),
        };
        if session.ttl_days == 0 || session.ttl_days > MAX_SESSION_TTL_DAYS {
            bail!(
                "session.ttl_days must be between 1 and {}, got {}",
                MAX_SESSION_TTL_DAYS,
                session.ttl_days
            );
        }
        if session.sweep_interval_minutes == 0
            || session.sweep_interval_minutes > MAX_SWEEP_INTERVAL_MINUTES
        {
            bail!(
                "session.sweep_interval_minutes must be between 1 and {}, got {}",
                MAX_SWEEP_INTERVAL_MINUTES,
                session.sweep_interval_minutes
            );
        }

        let retry_file = file.retry.unwrap_or_default();
        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_attempts: retry_file
                .max_attempts
                .unwrap_or(retry_defaults.max_attempts),
            initial_backoff_secs: retry_file
                .initial_backoff_secs
                .unwrap_or(retry_defaults.initial_backoff_secs),
            backoff_multiplier: retry_file
                .backoff_multiplier
                .unwrap_or(retry_defaults.backoff_multiplier),
            max_backoff_secs: retry_file
                .max_backoff_secs
                .unwrap_or(retry_defaults.max_backoff_secs),
        };
        if retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            bail!(
                "retry.backoff_multiplier must be a finite value >= 1.0, got {}",
                retry.backoff_multiplier
            );
        }
        if !retry.initial_backoff_secs.is_finite()
            || !retry.max_backoff_secs.is_finite()
            || retry.initial_backoff_secs < 0.0
            || retry.max_backoff_secs < retry.initial_backoff_secs
            || retry.max_backoff_secs > MAX_BACKOFF_SECS
        {
            bail!(
                "retry backoff must satisfy 0 <= initial ({}) <= max ({}) <= {}",
                retry.initial_backoff_secs,
                retry.max_backoff_secs,
                MAX_BACKOFF_SECS
            );
        }

        let resume_file = file.resume.unwrap_or_default();
        let resume_defaults = ResumeSettings::default();
        let resume = ResumeSettings {
            max_file_size_bytes: resume_file
                .max_file_size_bytes
                .unwrap_or(resume_defaults.max_file_size_bytes),
            max_page_limit: resume_file
                .max_page_limit
                .unwrap_or(resume_defaults.max_page_limit),
        };
        if resume.max_file_size_bytes == 0 {
            bail!("resume.max_file_size_bytes must be greater than 0");
        }
        if resume.max_page_limit == 0 {
            bail!("resume.max_page_limit must be greater than 0");
        }

        Ok(Self {
            db_path,
            storage_dir,
            session,
            retry,
            resume,
        })
    }
}
