use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::models::*;
use crate::error::AppResult;

/// Read side of the ledger plus the entry point for write transactions.
///
/// Every method is scoped by `store_id`; rows belonging to another store are
/// reported as absent.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction. Dropping the returned handle without calling
    /// [`LedgerTx::commit`] rolls every change back.
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;

    async fn find_client(&self, store_id: i64, client_id: i64) -> AppResult<Option<Client>>;

    async fn list_clients(
        &self,
        store_id: i64,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Client>, i64)>;

    async fn find_sale(&self, store_id: i64, sale_id: i64) -> AppResult<Option<SaleDetail>>;

    async fn list_sales(
        &self,
        store_id: i64,
        filter: &SaleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<SaleDetail>, i64)>;

    /// All sales of one client, newest first
    async fn list_client_sales(&self, store_id: i64, client_id: i64) -> AppResult<Vec<SaleDetail>>;
}

/// Write operations executed inside one storage transaction
#[async_trait]
pub trait LedgerTx: Send {
    async fn find_client(&mut self, store_id: i64, client_id: i64) -> AppResult<Option<Client>>;

    async fn insert_client(&mut self, store_id: i64, client: NewClient) -> AppResult<Client>;

    async fn update_client(&mut self, client_id: i64, changes: ClientChanges) -> AppResult<Client>;

    /// Apply `delta` to the client's debit balance in place (`balance = balance + delta`)
    async fn adjust_debit_balance(&mut self, client_id: i64, delta: Decimal) -> AppResult<()>;

    async fn insert_sale(&mut self, sale: NewSale) -> AppResult<Sale>;

    /// Fetch a sale and hold it against concurrent writers until the transaction ends
    async fn lock_sale(&mut self, store_id: i64, sale_id: i64) -> AppResult<Option<Sale>>;

    async fn update_sale(&mut self, sale_id: i64, changes: SaleChanges) -> AppResult<()>;

    async fn delete_sale(&mut self, sale_id: i64) -> AppResult<()>;

    async fn insert_payment(
        &mut self,
        sale_id: i64,
        value: Decimal,
        pay_date: DateTime<Utc>,
    ) -> AppResult<Payment>;

    async fn sale_payments(&mut self, sale_id: i64) -> AppResult<Vec<Payment>>;

    async fn delete_sale_payments(&mut self, sale_id: i64) -> AppResult<u64>;

    async fn sale_detail(&mut self, sale_id: i64) -> AppResult<Option<SaleDetail>>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
