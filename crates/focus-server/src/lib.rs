pub mod routes;
pub mod state;

use axum::Router;
use focus_core::config::AppConfig;
use focus_core::store::SessionStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use routes::ApiError;
pub use state::AppState;

/// Build the axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api = Router::new()
        .merge(routes::session_routes())
        .merge(routes::stats_routes());

    let public = Router::new().merge(routes::health_routes());

    let spa = routes::spa_routes(config.server.static_dir.clone());

    let mut app = Router::new()
        .merge(api)
        .merge(public)
        .merge(spa)
        .with_state(state.clone());

    app = app.layer(TraceLayer::new_for_http());

    if config.server.cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}

/// Start the HTTP server.
pub async fn serve(config: AppConfig, store: Arc<dyn SessionStore>) -> anyhow::Result<()> {
    let state = AppState::new(config.clone(), store)?;
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    if config.server.static_dir.is_none() {
        tracing::debug!("No static_dir configured; serving the API only");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
