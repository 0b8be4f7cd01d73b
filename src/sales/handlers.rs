use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use super::models::{CreateSaleRequest, ListSalesQuery, SaleListResponse, UpdateSaleRequest};
use crate::api::handler::AppState;
use crate::error::AppResult;
use crate::ledger::models::SaleDetail;
use crate::middleware::{CallerContext, ValidatedJson, ValidatedPath};

/// Book a sale for one of the caller's clients
/// POST /sales
pub async fn create_sale(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedJson(req): ValidatedJson<CreateSaleRequest>,
) -> AppResult<(StatusCode, Json<SaleDetail>)> {
    let sale = state
        .sales
        .create(req.into(), caller.store_id, caller.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

/// Amend description or due date. Role guard runs before this handler.
/// PATCH /sales/:id
pub async fn update_sale(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedPath(sale_id): ValidatedPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateSaleRequest>,
) -> AppResult<Json<SaleDetail>> {
    let sale = state
        .sales
        .update(sale_id, caller.store_id, req.into())
        .await?;

    Ok(Json(sale))
}

/// DELETE /sales/:id
pub async fn delete_sale(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedPath(sale_id): ValidatedPath<i64>,
) -> AppResult<StatusCode> {
    state.sales.delete(sale_id, caller.store_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /sales
pub async fn list_sales(
    State(state): State<AppState>,
    caller: CallerContext,
    Query(query): Query<ListSalesQuery>,
) -> AppResult<Json<SaleListResponse>> {
    let filter = query.filter()?;
    let page = query.page_request();
    debug!("Listing sales for store {}: {:?} {:?}", caller.store_id, filter, page);

    let (sales, pagination) = state.sales.list(caller.store_id, &filter, page).await?;

    Ok(Json(SaleListResponse { sales, pagination }))
}

/// GET /sales/:id
pub async fn get_sale(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedPath(sale_id): ValidatedPath<i64>,
) -> AppResult<Json<SaleDetail>> {
    Ok(Json(state.sales.get(sale_id, caller.store_id).await?))
}

/// GET /sales/client/:client_id
pub async fn list_client_sales(
    State(state): State<AppState>,
    caller: CallerContext,
    ValidatedPath(client_id): ValidatedPath<i64>,
) -> AppResult<Json<Vec<SaleDetail>>> {
    Ok(Json(state.sales.list_by_client(client_id, caller.store_id).await?))
}
