//! Startup helpers for the Bot AI server.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::chat::core::config::ChatConfig;
use crate::server::{self, AppState};

/// Run the server until Ctrl-C (used by the `bot-ai-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Bot AI v{}", env!("CARGO_PKG_VERSION"));

    let state = match initialize() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to initialize: {e:#}");
            return ExitCode::from(1);
        }
    };
    let port = state.config.server.port;

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, port, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Load configuration and build application state without serving.
///
/// # Errors
/// Returns an error if the configuration is invalid or the store cannot be opened.
pub fn initialize() -> anyhow::Result<Arc<AppState>> {
    let config = ChatConfig::from_env().context("loading configuration")?;
    tracing::info!(
        backend = ?config.storage.backend,
        data_dir = %config.storage.data_dir.display(),
        typing_delay_ms = config.session.typing_delay_ms,
        "Configuration loaded"
    );
    AppState::new(config).context("creating application state")
}

async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await;
}

/// Resolve when `signal` fires. Never resolves if the listener itself fails.
async fn wait_for_signal<F, E>(signal: F)
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    if let Err(e) = signal.await {
        tracing::error!("Failed to listen for Ctrl-C: {e}; graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_resolves_when_fired() {
        let fired = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_signal(async { Ok::<(), std::io::Error>(()) }),
        )
        .await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn test_failed_listener_never_resolves() {
        let failed = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_signal(async { Err::<(), _>(std::io::Error::other("no signal handler")) }),
        )
        .await;
        assert!(failed.is_err());
    }
}
