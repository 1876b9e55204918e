// rest/mod.rs — Public REST API server.
//
// Axum HTTP server, local only unless a wider bind address is configured.
//
// Endpoints:
//   GET    /v1/tasks
//   POST   /v1/tasks          (single or bulk — body with a `tasks` list)
//   GET    /v1/tasks/{id}
//   PUT    /v1/tasks/{id}
//   DELETE /v1/tasks/{id}
//   GET    /v1/health

pub mod routes;

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let addr: SocketAddr = ctx.config.bind_addr().parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/v1/health", get(routes::health::health))
        // Tasks
        .route(
            "/v1/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_tasks),
        )
        .route(
            "/v1/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
