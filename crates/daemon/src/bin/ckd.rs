// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container Kit daemon (ckd): background process that hosts the tool
//! catalog over the stdio wire protocol.
//!
//! Typically launched by a client that speaks newline-delimited JSON over
//! the daemon's stdin/stdout; it should not be run interactively.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ck_daemon::{Config, Server, TransportType};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Default budget for the ordered shutdown sequence once a stop signal
/// arrives, overridable via `CK_SHUTDOWN_TIMEOUT_SECS`.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ckd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ckd {}", env!("CARGO_PKG_VERSION"));
                println!("Container Kit daemon — hosts repository/image/manifest tools");
                println!("over a newline-delimited JSON wire protocol on stdin/stdout.");
                println!();
                println!("USAGE:");
                println!("    ckd");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ckd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    if config.transport_type != TransportType::Stdio {
        eprintln!("error: only the stdio transport is implemented; http is a configured but unwired extension point");
        std::process::exit(1);
    }

    let _log_guard = setup_logging(&config)?;

    info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        "starting container-kit daemon",
    );

    let server = match Server::bootstrap_stdio(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to start daemon: {e}");
            return Err(e.into());
        }
    };
    let server = std::sync::Arc::new(server);

    let run_handle = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = run_handle => {
            match result {
                Ok(Ok(())) => info!("transport closed, shutting down"),
                Ok(Err(e)) => error!("transport error: {e}"),
                Err(e) => error!("server task panicked: {e}"),
            }
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    let deadline = shutdown_timeout();
    let report = server.shutdown(deadline).await;
    if report.is_ok() {
        info!("daemon stopped");
    } else {
        for err in &report.errors {
            error!("shutdown step failed: {err}");
        }
    }

    Ok(())
}

fn shutdown_timeout() -> Duration {
    std::env::var("CK_SHUTDOWN_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
}

/// Sets up a non-blocking file-backed subscriber. Logging never touches
/// stdout: the stdio transport owns stdout exclusively for wire-protocol
/// frames, so even a misconfigured `EnvFilter` can't corrupt a client's
/// framing.
fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = log_directory(&config.workspace_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "ckd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

/// Derives a `logs/` directory alongside (not inside) the session
/// workspace tree, so log files never show up in a tool's view of a
/// session's disk usage.
fn log_directory(workspace_dir: &Path) -> PathBuf {
    workspace_dir.parent().unwrap_or(workspace_dir).join("logs")
}
