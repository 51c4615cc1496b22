use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use slog::{error, info};

use rt_server::config::GameConfig;
use rt_server::{logging, server};

/// Starts the R-Type game server.
#[derive(Parser, Debug)]
#[command(name = "rt-server", author, version, about)]
struct Args {
    /// Path to the network plugin shared library. Accepted for command-line compatibility; this
    /// build links its transport statically and does not load it.
    #[arg(default_value = "plugins/network.so")]
    plugin: PathBuf,

    /// TOML config file (defaults apply where absent).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Credential file path, overriding the config file's value.
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Listen address override, applied to both the TCP and UDP sockets' port.
    #[arg(long)]
    bind: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log = logging::init(&args.log_level);

    let mut cfg = match &args.config {
        Some(path) => GameConfig::load(path),
        None => GameConfig::default(),
    };
    if let Some(credentials) = &args.credentials {
        cfg.game.credentials_path = credentials.display().to_string();
    }
    if let Some(bind) = &args.bind {
        cfg.server.tcp_address = bind.clone();
        cfg.server.udp_address = bind.clone();
    }

    info!(log, "starting rt-server";
        "tcp" => &cfg.server.tcp_address,
        "udp" => &cfg.server.udp_address,
        "tick_rate" => cfg.game.tick_rate,
        "plugin" => args.plugin.display().to_string(),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_shutdown.store(true, Ordering::Relaxed)) {
        error!(log, "failed to install signal handler"; "error" => %e);
        return ExitCode::FAILURE;
    }

    match server::run(cfg, log.clone(), shutdown, None) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(log, "server exited with an error"; "error" => %e);
            ExitCode::FAILURE
        }
    }
}
