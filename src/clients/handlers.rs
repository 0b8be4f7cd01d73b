use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use super::models::{
    ClientListResponse, ClientMetrics, CreateClientRequest, ListClientsQuery, UpdateClientRequest,
};
use crate::api::handler::AppState;
use crate::error::AppResult;
use crate::ledger::models::{Client, PageRequest};
use crate::middleware::{CallerContext, ValidatedJson, ValidatedPath};

/// POST /clients
pub async fn create_client(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<Client>)> {
    let client = state.clients.create(req.into(), caller.store_id).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// PATCH /clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedPath(client_id): ValidatedPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> AppResult<Json<Client>> {
    let client = state
        .clients
        .update(client_id, caller.store_id, req.into())
        .await?;
    Ok(Json(client))
}

/// GET /clients
pub async fn list_clients(
    State(state): State<AppState>,
    caller: CallerContext,
    Query(query): Query<ListClientsQuery>,
) -> AppResult<Json<ClientListResponse>> {
    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref());
    let (clients, pagination) = state
        .clients
        .list(caller.store_id, query.search.as_deref(), page)
        .await?;

    Ok(Json(ClientListResponse { clients, pagination }))
}

/// GET /clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedPath(client_id): ValidatedPath<i64>,
) -> AppResult<Json<Client>> {
    Ok(Json(state.clients.get(client_id, caller.store_id).await?))
}

/// GET /clients/:id/metrics
pub async fn get_client_metrics(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedPath(client_id): ValidatedPath<i64>,
) -> AppResult<Json<ClientMetrics>> {
    Ok(Json(state.clients.metrics(client_id, caller.store_id).await?))
}
