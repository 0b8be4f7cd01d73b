use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use super::models::*;
use super::store::LedgerStore;
use crate::error::{AppError, AppResult, SaleError};

/// Fields required to book a new sale
#[derive(Debug, Clone)]
pub struct SaleInput {
    pub value: Decimal,
    pub description: String,
    pub is_paid: bool,
    pub due_date: DateTime<Utc>,
    pub client_id: i64,
}

/// Partial sale update. `value`, `is_paid` and `client_id` are accepted only
/// when they repeat the stored value.
#[derive(Debug, Clone, Default)]
pub struct SaleUpdate {
    pub value: Option<Decimal>,
    pub description: Option<String>,
    pub is_paid: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub client_id: Option<i64>,
}

/// Keeps every client's debit balance equal to the unpaid value of their sales
pub struct SaleLedger {
    store: Arc<dyn LedgerStore>,
}

impl SaleLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Book a sale. A paid sale gets a payment for its full value; an unpaid
    /// one raises the client's debit balance by its value.
    pub async fn create(&self, input: SaleInput, store_id: i64, user_id: i64) -> AppResult<SaleDetail> {
        if input.value < Decimal::ZERO {
            return Err(AppError::validation(
                "Invalid input: value must be greater than or equal to 0",
                serde_json::json!({ "value": ["must be greater than or equal to 0"] }),
            ));
        }
        if input.value > MAX_AMOUNT {
            return Err(AppError::validation(
                format!("Invalid input: value must be less than or equal to {}", MAX_AMOUNT),
                serde_json::json!({ "value": [format!("must be less than or equal to {}", MAX_AMOUNT)] }),
            ));
        }

        let mut tx = self.store.begin().await?;

        let client = tx
            .find_client(store_id, input.client_id)
            .await?
            .ok_or(SaleError::ClientNotFound(input.client_id))?;

        let sale = tx
            .insert_sale(NewSale {
                value: input.value,
                description: input.description,
                is_paid: input.is_paid,
                due_date: input.due_date,
                store_id,
                client_id: client.id,
                user_id,
            })
            .await?;

        if sale.is_paid {
            tx.insert_payment(sale.id, sale.value, Utc::now()).await?;
        } else {
            tx.adjust_debit_balance(client.id, sale.value).await?;
        }

        let detail = tx
            .sale_detail(sale.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("sale {} vanished before commit", sale.id)))?;

        tx.commit().await?;

        info!(
            "Sale {} booked for client {} in store {} (value {}, paid: {})",
            sale.id, client.id, store_id, sale.value, sale.is_paid
        );

        Ok(detail)
    }

    /// Delete a sale with its payments, removing its outstanding value from
    /// the client's balance. Returns the amount the balance was reduced by.
    pub async fn delete(&self, sale_id: i64, store_id: i64) -> AppResult<Decimal> {
        let mut tx = self.store.begin().await?;

        let sale = tx
            .lock_sale(store_id, sale_id)
            .await?
            .ok_or(SaleError::SaleNotFound(sale_id))?;

        let total_paid: Decimal = tx
            .sale_payments(sale.id)
            .await?
            .iter()
            .map(|payment| payment.value)
            .sum();
        let debit_to_remove = sale.value - total_paid;

        tx.adjust_debit_balance(sale.client_id, -debit_to_remove).await?;
        let removed_payments = tx.delete_sale_payments(sale.id).await?;
        tx.delete_sale(sale.id).await?;

        tx.commit().await?;

        info!(
            "Sale {} deleted from store {} ({} payments removed, client {} debit reduced by {})",
            sale.id, store_id, removed_payments, sale.client_id, debit_to_remove
        );

        Ok(debit_to_remove)
    }

    pub async fn update(&self, sale_id: i64, store_id: i64, update: SaleUpdate) -> AppResult<SaleDetail> {
        let mut tx = self.store.begin().await?;

        let sale = tx
            .lock_sale(store_id, sale_id)
            .await?
            .ok_or(SaleError::SaleNotFound(sale_id))?;

        if update.value.is_some_and(|value| value != sale.value) {
            return Err(SaleError::ImmutableField("value").into());
        }
        if update.is_paid.is_some_and(|is_paid| is_paid != sale.is_paid) {
            return Err(SaleError::ImmutableField("isPaid").into());
        }
        if update.client_id.is_some_and(|client_id| client_id != sale.client_id) {
            return Err(SaleError::ImmutableField("clientId").into());
        }

        let changes = SaleChanges {
            description: update.description,
            due_date: update.due_date,
        };
        if !changes.is_empty() {
            tx.update_sale(sale.id, changes).await?;
        }

        let detail = tx
            .sale_detail(sale.id)
            .await?
            .ok_or(SaleError::SaleNotFound(sale_id))?;

        tx.commit().await?;

        info!("Sale {} updated in store {}", sale.id, store_id);
        Ok(detail)
    }

    pub async fn get(&self, sale_id: i64, store_id: i64) -> AppResult<SaleDetail> {
        self.store
            .find_sale(store_id, sale_id)
            .await?
            .ok_or_else(|| SaleError::SaleNotFound(sale_id).into())
    }

    pub async fn list(
        &self,
        store_id: i64,
        filter: &SaleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<SaleDetail>, Pagination)> {
        let (sales, total) = self.store.list_sales(store_id, filter, page).await?;
        Ok((sales, Pagination::new(total, page)))
    }

    pub async fn list_by_client(&self, client_id: i64, store_id: i64) -> AppResult<Vec<SaleDetail>> {
        self.store
            .find_client(store_id, client_id)
            .await?
            .ok_or(SaleError::ClientNotFound(client_id))?;

        self.store.list_client_sales(store_id, client_id).await
    }
}
