use anyhow::{Context, Result};
use clap::Parser;
use mentorhub_core::config::{AppConfig, CliConfig, FileConfig};
use mentorhub_core::{RetryPolicy, SessionManager, SqliteStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Periodically sweeps expired sessions out of the store.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Session lifetime in days, used when the config file doesn't set one.
    #[clap(long)]
    pub session_ttl_days: Option<u64>,

    /// Minutes between two sweeps.
    #[clap(long)]
    pub sweep_interval_minutes: Option<u64>,

    /// Run a single sweep and exit.
    #[clap(long)]
    pub once: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            storage_dir: None,
            session_ttl_days: self.session_ttl_days,
            sweep_interval_minutes: self.sweep_interval_minutes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Could not install the tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite database at {:?}...", config.db_path);
    let store = Arc::new(SqliteStore::new(&config.db_path)?);
    let session_manager = Arc::new(SessionManager::new(
        store,
        RetryPolicy::new(&config.retry),
        Arc::new(SystemClock),
        config.session.ttl(),
    ));

    if cli_args.once {
        let removed = session_manager.cleanup_expired()?;
        info!("Single sweep done, removed {} session(s)", removed);
        return Ok(());
    }

    let interval = config
        .session
        .sweep_interval()
        .context("Sweep interval is too large")?;
    info!(
        "Sweeping expired sessions every {} minute(s)",
        config.session.sweep_interval_minutes
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let manager = session_manager.clone();
                // The store is synchronous and may sleep between retries
                let result = tokio::task::spawn_blocking(move || manager.cleanup_expired()).await;
                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!("Failed to sweep expired sessions: {}", e),
                    Err(e) => error!("Session sweep task panicked: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received ctrl-c, shutting down");
                break;
            }
        }
    }

    Ok(())
}
