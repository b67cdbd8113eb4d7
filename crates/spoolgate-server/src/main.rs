// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolgate — local print agent.
//
// Entry point. Loads configuration, initialises logging, builds the print
// agent, and serves the HTTP API until Ctrl-C.

mod form;
mod logging;
mod routes;
mod state;

use std::future::IntoFuture;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use spoolgate_core::AgentConfig;
use spoolgate_core::error::{Result, SpoolgateError};
use spoolgate_print::PrintAgent;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "spoolgate", version, about = "Expose local printers over HTTP for raw printing")]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long)]
    listen: Option<String>,

    /// Log file, overriding the config file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn resolve_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::load(path)?,
            None => AgentConfig::default(),
        };
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = log_file.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("spoolgate: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log_file) {
        eprintln!("spoolgate: failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match serve(config).await {
        Ok(()) => {
            info!("server stopped gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "server error");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: AgentConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = AppState::new(PrintAgent::from_config(&config), &config);
    let app = routes::router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SpoolgateError::Config(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "Spoolgate listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .into_future(),
    );

    tokio::select! {
        finished = &mut server => {
            return finished
                .map_err(|e| SpoolgateError::Io(std::io::Error::other(e)))?
                .map_err(SpoolgateError::Io);
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "cannot listen for Ctrl-C, shutting down");
            }
        }
    }

    info!("shutting down server");
    let _ = stop_tx.send(());
    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(joined) => joined
            .map_err(|e| SpoolgateError::Io(std::io::Error::other(e)))?
            .map_err(SpoolgateError::Io),
        Err(_) => {
            warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "in-flight requests did not finish in time"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"listen_addr":"127.0.0.1:9000","log_file":"from-file.log"}}"#)
            .expect("write");
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::parse_from(["spoolgate", "--config", path.as_str(), "--listen", "0.0.0.0:8081"]);
        let config = cli.resolve_config().expect("config");
        assert_eq!(config.listen_addr, "0.0.0.0:8081");
        assert_eq!(config.log_file, PathBuf::from("from-file.log"));
    }

    #[test]
    fn defaults_without_config_file() {
        let cli = Cli::parse_from(["spoolgate"]);
        assert_eq!(cli.resolve_config().expect("config"), AgentConfig::default());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = Cli::parse_from(["spoolgate", "--listen", "not-an-address"]);
        assert!(cli.resolve_config().is_err());
    }
}
