mod config;

use std::time::Duration;

use engine_core::TickLoop;
use net::status_page::run_status_page;
use net::ConnectionSet;
use project_tictactoe::{GameServer, MessageRouter};
use tokio::sync::watch;

use crate::config::{parse_cli_args, ServerConfig};

#[tokio::main]
async fn main() {
    observability::init_logging();

    let config = parse_cli_args();
    tracing::info!("Tic-tac-toe server starting...");

    let connections = match ConnectionSet::open(&config.game_addr(), config.to_net_settings()).await {
        Ok(connections) => connections,
        Err(e) => {
            tracing::error!("The game server is unable to start: {}", e);
            std::process::exit(1);
        }
    };

    let router = MessageRouter::new(config.lobby.count);
    tracing::info!(count = router.lobbies().lobbies().len(), "Lobbies created");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let status_handle = spawn_status_page(&config, shutdown_rx.clone());

    let signal_tx = shutdown_tx.clone();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received, stopping server...");
        let _ = signal_tx.send(true);
    });

    let mut tick_loop = TickLoop::new(config.to_tick_config(), connections, GameServer::new(router));
    let ticks = tick_loop.run(shutdown_rx).await;
    tracing::info!(ticks, "Tick loop stopped");

    // max_ticks or an internal stop ends the loop without a signal.
    let _ = shutdown_tx.send(true);
    signal_task.abort();
    if let Some(handle) = status_handle {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    tracing::info!("Server stopped.");
}

/// Start the status page next to the game port. A failure to bind only
/// disables the page.
fn spawn_status_page(
    config: &ServerConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> Option<tokio::task::JoinHandle<()>> {
    if !config.net.status_page {
        return None;
    }
    let Some(addr) = config.status_addr() else {
        tracing::warn!(port = config.net.port, "No port left for the status page, web interface disabled");
        return None;
    };

    Some(tokio::spawn(async move {
        if let Err(e) = run_status_page(&addr, shutdown_rx).await {
            tracing::warn!("Status page is unable to start, web interface disabled: {}", e);
        }
    }))
}

/// Wait for SIGINT or SIGTERM, or Ctrl+C off Unix. Never returns when the
/// handlers cannot be installed.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigint, mut sigterm) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "failed to register signal handlers");
                return std::future::pending().await;
            }
        };
        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return std::future::pending().await;
        }
        tracing::info!("Received Ctrl+C");
    }
}
