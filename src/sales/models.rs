use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::ledger::models::{
    deserialize_optional_timestamp, deserialize_timestamp, parse_timestamp, PageRequest,
    Pagination, SaleDetail, SaleFilter,
};
use crate::ledger::{SaleInput, SaleUpdate};
use crate::middleware::validation::ledger_amount;

// ========== REQUEST MODELS ==========

/// Body of `POST /sales`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[validate(custom = "ledger_amount")]
    pub value: Decimal,
    pub description: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub due_date: DateTime<Utc>,
    pub client_id: i64,
}

impl From<CreateSaleRequest> for SaleInput {
    fn from(req: CreateSaleRequest) -> Self {
        Self {
            value: req.value,
            description: req.description,
            is_paid: req.is_paid,
            due_date: req.due_date,
            client_id: req.client_id,
        }
    }
}

/// Body of `PATCH /sales/:id`; every field optional
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSaleRequest {
    #[validate(custom = "ledger_amount")]
    pub value: Option<Decimal>,
    pub description: Option<String>,
    pub is_paid: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
    pub client_id: Option<i64>,
}

impl From<UpdateSaleRequest> for SaleUpdate {
    fn from(req: UpdateSaleRequest) -> Self {
        Self {
            value: req.value,
            description: req.description,
            is_paid: req.is_paid,
            due_date: req.due_date,
            client_id: req.client_id,
        }
    }
}

/// Query string of `GET /sales`. Kept as raw strings so that junk paging
/// values fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSalesQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub is_paid: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ListSalesQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), self.limit.as_deref())
    }

    pub fn filter(&self) -> AppResult<SaleFilter> {
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let is_paid = self.is_paid.as_deref().map(|raw| raw == "true");

        let sale_date_range = match (non_empty(&self.start_date), non_empty(&self.end_date)) {
            (Some(start), Some(end)) => Some((query_date("startDate", start)?, query_date("endDate", end)?)),
            _ => None,
        };

        Ok(SaleFilter {
            search,
            is_paid,
            sale_date_range,
        })
    }
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn query_date(field: &str, raw: &str) -> AppResult<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| {
        AppError::validation(
            format!("Invalid input: {} is not a valid date", field),
            serde_json::json!({ field: ["invalid date"] }),
        )
    })
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct SaleListResponse {
    pub sales: Vec<SaleDetail>,
    pub pagination: Pagination,
}
