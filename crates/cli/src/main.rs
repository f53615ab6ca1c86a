mod bot_commands;
mod config_commands;
mod storage_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "teledrive", about = "Teledrive: your files in a bucket, over Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./teledrive.toml and
    /// ~/.config/teledrive/).
    #[arg(long, global = true, env = "TELEDRIVE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (default when no subcommand is provided).
    Run {
        /// Keep files in memory instead of the bucket (development only).
        #[arg(long)]
        memory: bool,
    },
    /// Validate the configuration and check that the bucket is reachable.
    Check,
    /// List object names in the bucket.
    Ls,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "teledrive starting");

    let config = teledrive_config::discover_and_load(cli.config.as_deref())?;

    match cli.command {
        None => bot_commands::run(config, false).await,
        Some(Commands::Run { memory }) => bot_commands::run(config, memory).await,
        Some(Commands::Check) => storage_commands::check(config).await,
        Some(Commands::Ls) => storage_commands::ls(config).await,
    }
}
