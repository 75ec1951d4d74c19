mod config_commands;
mod doctor_commands;
mod fetch_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "reel",
    version,
    about = "reel: fetch audio or video with yt-dlp and grab frames with ffmpeg"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/reel/).
    #[arg(long, global = true, env = "REEL_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download audio or video from a URL, or inspect a local file.
    Fetch(fetch_commands::FetchArgs),
    /// List the registered tools.
    Tools {
        /// Print full JSON schemas.
        #[arg(long)]
        json: bool,
    },
    /// Check external binaries, config and output directory.
    Doctor,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Logs go to stderr so `fetch` output on stdout stays machine-readable.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "reel starting");

    if let Some(ref dir) = cli.config_dir {
        reel_config::set_config_dir(dir.clone());
    }
    let config = reel_config::discover_and_load();

    match cli.command {
        Commands::Fetch(args) => fetch_commands::handle_fetch(args, config).await,
        Commands::Tools { json } => fetch_commands::handle_tools(&config, json),
        Commands::Doctor => doctor_commands::handle_doctor(&config).await,
        Commands::Config { action } => config_commands::handle_config(action, &config),
    }
}
