use clap::Parser;
use exn::ResultExt;
use hoard::error::{ErrorKind, Result};
use hoard_config::{Config, RemoteConfig};
use hoard_stats::LoggingStatsReporter;
use hoard_storage::StoreHandle;
use hoard_storage::backend::{LocalBackend, RetryingBackend};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML, YAML or JSON), layered over the defaults
    /// and the platform configuration directory.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(error) = hoard::logging::init(&args.log_level) {
        eprintln!("{error:?}");
        return ExitCode::FAILURE;
    }
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let store = open_store(&config)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Interrupted; finishing in-flight uploads"),
                Err(error) => tracing::error!(%error, "Failed to listen for Ctrl-C; stopping"),
            }
            cancel.cancel();
        }
    });

    hoard::secure_directory(&config, store, Arc::new(LoggingStatsReporter::default()), cancel).await
}

fn open_store(config: &Config) -> Result<StoreHandle> {
    let inner: StoreHandle = match &config.remote {
        RemoteConfig::Local { path } => Arc::new(LocalBackend::new("local", path).or_raise(|| ErrorKind::Storage)?),
    };
    Ok(Arc::new(RetryingBackend::new(inner, config.retry_timeout())))
}
