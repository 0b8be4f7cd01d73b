use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};

use super::models::*;
use super::store::{LedgerStore, LedgerTx};
use crate::error::{AppError, AppResult};

const CLIENT_COLUMNS: &str =
    "id, name, phone, birth_date, observations, debit_balance, store_id, created_at, updated_at";

const SALE_COLUMNS: &str = "id, value, description, is_paid, due_date, sale_date, \
     store_id, client_id, user_id, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, value, pay_date, sale_id, created_at";

const SALE_DETAIL_SELECT: &str = r#"
    SELECT
        s.id, s.value, s.description, s.is_paid, s.due_date, s.sale_date,
        s.store_id, s.client_id, s.user_id, s.created_at, s.updated_at,
        c.name AS client_name, c.phone AS client_phone, c.birth_date AS client_birth_date,
        c.observations AS client_observations, c.debit_balance AS client_debit_balance,
        c.created_at AS client_created_at, c.updated_at AS client_updated_at,
        u.name AS user_name, u.email AS user_email
    FROM sales s
    JOIN clients c ON c.id = s.client_id
    JOIN users u ON u.id = s.user_id
"#;

/// Flat row produced by `SALE_DETAIL_SELECT`
#[derive(sqlx::FromRow)]
struct SaleDetailRow {
    id: i64,
    value: Decimal,
    description: String,
    is_paid: bool,
    due_date: DateTime<Utc>,
    sale_date: DateTime<Utc>,
    store_id: i64,
    client_id: i64,
    user_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    client_name: String,
    client_phone: String,
    client_birth_date: NaiveDate,
    client_observations: Option<String>,
    client_debit_balance: Decimal,
    client_created_at: DateTime<Utc>,
    client_updated_at: DateTime<Utc>,
    user_name: String,
    user_email: String,
}

impl SaleDetailRow {
    fn into_detail(self, payments: Vec<Payment>) -> SaleDetail {
        SaleDetail {
            client: Client {
                id: self.client_id,
                name: self.client_name,
                phone: self.client_phone,
                birth_date: self.client_birth_date,
                observations: self.client_observations,
                debit_balance: self.client_debit_balance,
                store_id: self.store_id,
                created_at: self.client_created_at,
                updated_at: self.client_updated_at,
            },
            user: UserSummary {
                id: self.user_id,
                name: self.user_name,
                email: self.user_email,
            },
            sale: Sale {
                id: self.id,
                value: self.value,
                description: self.description,
                is_paid: self.is_paid,
                due_date: self.due_date,
                sale_date: self.sale_date,
                store_id: self.store_id,
                client_id: self.client_id,
                user_id: self.user_id,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            payments,
        }
    }
}

/// Escape LIKE metacharacters and wrap the term for a substring match
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_sale_filters(qb: &mut QueryBuilder<'_, Postgres>, store_id: i64, filter: &SaleFilter) {
    qb.push(" WHERE s.store_id = ").push_bind(store_id);

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (s.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(is_paid) = filter.is_paid {
        qb.push(" AND s.is_paid = ").push_bind(is_paid);
    }

    if let Some((start, end)) = filter.sale_date_range {
        qb.push(" AND s.sale_date >= ")
            .push_bind(start)
            .push(" AND s.sale_date <= ")
            .push_bind(end);
    }
}

/// Attach payments (newest first) to each row, preserving row order
async fn attach_payments(
    conn: &mut PgConnection,
    rows: Vec<SaleDetailRow>,
) -> AppResult<Vec<SaleDetail>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sale_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let payments = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {} FROM payments WHERE sale_id = ANY($1) ORDER BY pay_date DESC, id DESC",
        PAYMENT_COLUMNS
    ))
    .bind(sale_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_sale: HashMap<i64, Vec<Payment>> = HashMap::new();
    for payment in payments {
        by_sale.entry(payment.sale_id).or_default().push(payment);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let payments = by_sale.remove(&row.id).unwrap_or_default();
            row.into_detail(payments)
        })
        .collect())
}

async fn fetch_sale_detail(
    conn: &mut PgConnection,
    sale_id: i64,
    store_id: Option<i64>,
) -> AppResult<Option<SaleDetail>> {
    let mut qb = QueryBuilder::<Postgres>::new(SALE_DETAIL_SELECT);
    qb.push(" WHERE s.id = ").push_bind(sale_id);
    if let Some(store_id) = store_id {
        qb.push(" AND s.store_id = ").push_bind(store_id);
    }

    let row = qb
        .build_query_as::<SaleDetailRow>()
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(attach_payments(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn fetch_client(
    conn: &mut PgConnection,
    store_id: i64,
    client_id: i64,
) -> AppResult<Option<Client>> {
    let client = sqlx::query_as::<_, Client>(&format!(
        "SELECT {} FROM clients WHERE id = $1 AND store_id = $2",
        CLIENT_COLUMNS
    ))
    .bind(client_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(client)
}

/// Postgres-backed ledger, the source of truth for clients, sales and payments
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn find_client(&self, store_id: i64, client_id: i64) -> AppResult<Option<Client>> {
        let mut conn = self.pool.acquire().await?;
        fetch_client(&mut conn, store_id, client_id).await
    }

    async fn list_clients(
        &self,
        store_id: i64,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Client>, i64)> {
        let mut conn = self.pool.acquire().await?;
        let pattern = search.map(like_pattern);

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM clients", CLIENT_COLUMNS));
        qb.push(" WHERE store_id = ").push_bind(store_id);
        if let Some(pattern) = &pattern {
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern.clone())
                .push(")");
        }
        qb.push(" ORDER BY name ASC, id ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let clients = qb.build_query_as::<Client>().fetch_all(&mut *conn).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients");
        count.push(" WHERE store_id = ").push_bind(store_id);
        if let Some(pattern) = &pattern {
            count
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern.clone())
                .push(")");
        }
        let total = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        Ok((clients, total))
    }

    async fn find_sale(&self, store_id: i64, sale_id: i64) -> AppResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale_detail(&mut conn, sale_id, Some(store_id)).await
    }

    async fn list_sales(
        &self,
        store_id: i64,
        filter: &SaleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<SaleDetail>, i64)> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Postgres>::new(SALE_DETAIL_SELECT);
        push_sale_filters(&mut qb, store_id, filter);
        qb.push(" ORDER BY s.sale_date DESC, s.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<SaleDetailRow>().fetch_all(&mut *conn).await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM sales s JOIN clients c ON c.id = s.client_id",
        );
        push_sale_filters(&mut count, store_id, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let sales = attach_payments(&mut conn, rows).await?;
        Ok((sales, total))
    }

    async fn list_client_sales(&self, store_id: i64, client_id: i64) -> AppResult<Vec<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Postgres>::new(SALE_DETAIL_SELECT);
        qb.push(" WHERE s.store_id = ")
            .push_bind(store_id)
            .push(" AND s.client_id = ")
            .push_bind(client_id)
            .push(" ORDER BY s.created_at DESC, s.id DESC");
        let rows = qb.build_query_as::<SaleDetailRow>().fetch_all(&mut *conn).await?;

        attach_payments(&mut conn, rows).await
    }
}

/// One Postgres transaction; rolled back on drop unless committed
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_client(&mut self, store_id: i64, client_id: i64) -> AppResult<Option<Client>> {
        fetch_client(&mut self.tx, store_id, client_id).await
    }

    async fn insert_client(&mut self, store_id: i64, client: NewClient) -> AppResult<Client> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (name, phone, birth_date, observations, store_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(client.name)
        .bind(client.phone)
        .bind(client.birth_date)
        .bind(client.observations)
        .bind(store_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(client)
    }

    async fn update_client(&mut self, client_id: i64, changes: ClientChanges) -> AppResult<Client> {
        let (set_observations, observations) = match changes.observations {
            Some(observations) => (true, observations),
            None => (false, None),
        };

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                birth_date = COALESCE($4, birth_date),
                observations = CASE WHEN $5 THEN $6 ELSE observations END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(client_id)
        .bind(changes.name)
        .bind(changes.phone)
        .bind(changes.birth_date)
        .bind(set_observations)
        .bind(observations)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Client {}", client_id)))?;

        Ok(client)
    }

    async fn adjust_debit_balance(&mut self, client_id: i64, delta: Decimal) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET debit_balance = debit_balance + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(client_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Client {}", client_id)));
        }

        Ok(())
    }

    async fn insert_sale(&mut self, sale: NewSale) -> AppResult<Sale> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales (value, description, is_paid, due_date, store_id, client_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(sale.value)
        .bind(sale.description)
        .bind(sale.is_paid)
        .bind(sale.due_date)
        .bind(sale.store_id)
        .bind(sale.client_id)
        .bind(sale.user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(sale)
    }

    async fn lock_sale(&mut self, store_id: i64, sale_id: i64) -> AppResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE id = $1 AND store_id = $2 FOR UPDATE",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .bind(store_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sale)
    }

    async fn update_sale(&mut self, sale_id: i64, changes: SaleChanges) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE sales
            SET description = COALESCE($2, description),
                due_date = COALESCE($3, due_date),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(sale_id)
        .bind(changes.description)
        .bind(changes.due_date)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_sale(&mut self, sale_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_payment(
        &mut self,
        sale_id: i64,
        value: Decimal,
        pay_date: DateTime<Utc>,
    ) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (value, pay_date, sale_id) VALUES ($1, $2, $3) RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(value)
        .bind(pay_date)
        .bind(sale_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(payment)
    }

    async fn sale_payments(&mut self, sale_id: i64) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE sale_id = $1 ORDER BY pay_date DESC, id DESC",
            PAYMENT_COLUMNS
        ))
        .bind(sale_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(payments)
    }

    async fn delete_sale_payments(&mut self, sale_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM payments WHERE sale_id = $1")
            .bind(sale_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn sale_detail(&mut self, sale_id: i64) -> AppResult<Option<SaleDetail>> {
        fetch_sale_detail(&mut self.tx, sale_id, None).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
