//! Server setup and routing.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, state::AppState};

/// Create the API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_index))
        .route("/health", get(handlers::handle_health))
        .route("/v1/completions", post(handlers::handle_completion))
        .route(
            "/v1/chat/completions",
            post(handlers::handle_chat_completion),
        )
        .route(
            "/v2/chat/completions",
            post(handlers::handle_chat_completion_v2),
        )
        .route(
            "/v0/chat/completions",
            post(handlers::handle_chat_completion_v0),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until ctrl-c, then cancel in-flight generations.
pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = state.sessions.clone();
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
                return;
            }
            tracing::info!("shutting down");
            sessions.cancel_all();
        })
        .await?;
    Ok(())
}
