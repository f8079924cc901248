//! `syncforge-server`: boots the fan-out websocket, the `/metrics`,
//! `/health`, `/ready` HTTP surface, the queue drain loop, and the
//! orchestrator's periodic sweep, then waits for Ctrl-C.

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use syncforge_server::app;
use syncforge_server::error::ServerError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = syncforge_config::SyncforgeConfig::load()?;
    let runtime = app::build(&config);

    let addr: std::net::SocketAddr = config
        .server
        .bind_address
        .parse()
        .map_err(|_| ServerError::InvalidAddress(config.server.bind_address.clone()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let queue_handle = runtime.queue.clone().start(runtime.orchestrator.clone());
    let sweep_handle = runtime.orchestrator.clone().start_sweep_loop(shutdown_rx.clone());
    let health_handle = {
        let health_monitor = runtime.health_monitor.clone();
        let interval = Duration::from_millis(config.monitor.health_check_interval_ms);
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { health_monitor.run(interval, shutdown_rx).await })
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "syncforge-server listening");

    axum::serve(listener, runtime.router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    runtime.queue.stop(Duration::from_millis(config.server.shutdown_grace_period_ms)).await;
    let _ = queue_handle.await;
    let _ = sweep_handle.await;
    let _ = health_handle.await;

    info!("syncforge-server stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
