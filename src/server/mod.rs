//! Axum server exposing the odds stream and the host endpoints

pub mod handlers;
mod state;

pub use state::AppState;

use std::future::Future;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::common::errors::Result;
use handlers::{health_check, latest_odds, quote_trade, stream_odds, update_pools};

/// Build the router with all routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/markets/:market_id/odds/stream", get(stream_odds))
        .route("/markets/:market_id/odds", get(latest_odds))
        .route("/markets/:market_id/pools", post(update_pools))
        .route("/markets/:market_id/quote", post(quote_trade))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl+C or SIGTERM
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

/// Serve until `signal` resolves
///
/// Open streams never end on their own, so the broker is shut down when
/// the signal fires; every stream then completes and the graceful drain
/// can finish.
pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let broker = state.broker.clone();
    let addr = listener.local_addr()?;
    info!("Odds server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            signal.await;
            broker.shutdown();
        })
        .await?;

    info!("Odds server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
