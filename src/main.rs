use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;

use tubedrop::cli::{Cli, Commands};
use tubedrop::core::readiness::{probe_version, spawn_setup, ReadinessHandle};
use tubedrop::core::web_server::{start_web_server, AppState};
use tubedrop::core::{config, init_logger, log_tool_configuration, Settings};

/// Main entry point for the download service
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bind address, listener).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env before any config static is read
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH, &config::LOG_LEVEL)?;

    match cli.command {
        Some(Commands::Serve { port }) => run_server(port).await,
        Some(Commands::CheckTools) => run_check_tools().await,
        None => run_server(None).await,
    }
}

async fn run_server(port: Option<u16>) -> Result<()> {
    let settings = Settings::from_env();
    log_tool_configuration(&settings);

    let port = port.unwrap_or(*config::server::PORT);
    let addr: SocketAddr = format!("{}:{}", *config::server::BIND_ADDR, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid BIND_ADDR/PORT: {}", e))?;

    let (tx, readiness) = ReadinessHandle::channel();
    spawn_setup(tx, settings.tools.clone(), settings.auto_update);

    let state = AppState::new(settings, readiness)?;
    start_web_server(addr, state).await
}

async fn run_check_tools() -> Result<()> {
    let settings = Settings::from_env();
    let mut ok = true;

    for (name, bin, flag) in [
        ("yt-dlp", &settings.tools.ytdlp_bin, "--version"),
        ("ffmpeg", &settings.tools.ffmpeg_bin, "-version"),
    ] {
        match probe_version(bin, flag).await {
            Ok(version) => println!("{:<8} {}  ({})", name, version, bin),
            Err(e) => {
                println!("{:<8} MISSING  {}", name, e);
                ok = false;
            }
        }
    }

    if ok {
        Ok(())
    } else {
        anyhow::bail!("required tools are missing")
    }
}
