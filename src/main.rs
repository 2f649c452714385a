use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::info;

use unimedia::logging::init_tracing;
use unimedia::router::init_router;
use unimedia::state::init_app_state;
use unimedia_config::ServerConfig;
use unimedia_db::run_migrations;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _log_guard = init_tracing();

    let server_config = ServerConfig::from_env();
    let state = init_app_state().await?;

    run_migrations(&state.db).await?;
    info!("Migrations applied");

    let app = init_router(state);

    let listener = TcpListener::bind(server_config.address()).await?;
    info!(address = %server_config.address(), "Server listening");
    info!("OpenAPI document at /api-docs/openapi.json");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
