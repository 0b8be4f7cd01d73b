use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use super::models::HealthResponse;
use crate::{
    clients::ClientDirectory,
    ledger::{LedgerStore, SaleLedger},
    middleware::RateLimitLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub sales: Arc<SaleLedger>,
    pub clients: Arc<ClientDirectory>,
    pub rate_limit: RateLimitLayer,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, rate_limit: RateLimitLayer) -> Self {
        Self {
            sales: Arc::new(SaleLedger::new(store.clone())),
            clients: Arc::new(ClientDirectory::new(store)),
            rate_limit,
        }
    }
}

/// Liveness probe
/// GET /health
pub async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        timestamp: Utc::now(),
    })
}
