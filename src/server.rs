use axum::{
    handler::Handler,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::{health_check, AppState},
    clients::handlers::{create_client, get_client, get_client_metrics, list_clients, update_client},
    middleware::{create_cors_layer, rate_limit_middleware, require_elevated_role},
    sales::handlers::{create_sale, delete_sale, get_sale, list_client_sales, list_sales, update_sale},
};

pub fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))

        // Sale ledger
        .route("/sales", get(list_sales).post(create_sale))
        .route("/sales/client/:client_id", get(list_client_sales))
        .route(
            "/sales/:id",
            get(get_sale)
                .patch(update_sale.layer(from_fn(require_elevated_role)))
                .delete(delete_sale),
        )

        // Client directory
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/:id", get(get_client).patch(update_client))
        .route("/clients/:id/metrics", get(get_client_metrics))

        .layer(from_fn_with_state(state.rate_limit.clone(), rate_limit_middleware))
        .layer(CompressionLayer::new())
        .layer(create_cors_layer(allowed_origins))
        // Add request tracing
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
