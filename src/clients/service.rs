use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use super::models::ClientMetrics;
use crate::error::{AppResult, SaleError};
use crate::ledger::models::{Client, ClientChanges, NewClient, PageRequest, Pagination};
use crate::ledger::LedgerStore;

/// Client bookkeeping for one store. The debit balance is never written here;
/// only the sale ledger moves it.
pub struct ClientDirectory {
    store: Arc<dyn LedgerStore>,
}

impl ClientDirectory {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, client: NewClient, store_id: i64) -> AppResult<Client> {
        let mut tx = self.store.begin().await?;
        let client = tx.insert_client(store_id, client).await?;
        tx.commit().await?;

        info!("Client {} registered in store {}", client.id, store_id);
        Ok(client)
    }

    pub async fn update(&self, client_id: i64, store_id: i64, changes: ClientChanges) -> AppResult<Client> {
        let mut tx = self.store.begin().await?;
        tx.find_client(store_id, client_id)
            .await?
            .ok_or(SaleError::ClientNotFound(client_id))?;

        let client = tx.update_client(client_id, changes).await?;
        tx.commit().await?;

        Ok(client)
    }

    pub async fn get(&self, client_id: i64, store_id: i64) -> AppResult<Client> {
        self.store
            .find_client(store_id, client_id)
            .await?
            .ok_or_else(|| SaleError::ClientNotFound(client_id).into())
    }

    pub async fn list(
        &self,
        store_id: i64,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Client>, Pagination)> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let (clients, total) = self.store.list_clients(store_id, search, page).await?;
        Ok((clients, Pagination::new(total, page)))
    }

    pub async fn metrics(&self, client_id: i64, store_id: i64) -> AppResult<ClientMetrics> {
        let client = self.get(client_id, store_id).await?;
        let sales = self.store.list_client_sales(store_id, client_id).await?;
        let now = Utc::now();

        let mut metrics = ClientMetrics {
            client_id: client.id,
            debit_balance: client.debit_balance,
            total_sales: sales.len() as i64,
            total_sold: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            open_sales: 0,
            overdue_sales: 0,
            last_sale_date: sales.iter().map(|s| s.sale.sale_date).max(),
        };

        for sale in &sales {
            metrics.total_sold += sale.sale.value;
            metrics.total_paid += sale.total_paid();
            if sale.outstanding() > Decimal::ZERO {
                metrics.open_sales += 1;
                if sale.sale.due_date < now {
                    metrics.overdue_sales += 1;
                }
            }
        }

        Ok(metrics)
    }
}
