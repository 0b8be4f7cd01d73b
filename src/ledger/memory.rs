use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::*;
use super::store::{LedgerStore, LedgerTx};
use crate::error::{AppError, AppResult};

#[derive(Clone, Default)]
struct LedgerState {
    stores: HashMap<i64, String>,
    users: HashMap<i64, (i64, UserSummary)>,
    clients: BTreeMap<i64, Client>,
    sales: BTreeMap<i64, Sale>,
    payments: BTreeMap<i64, Payment>,
    next_id: i64,
}

impl LedgerState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn detail(&self, sale: &Sale) -> AppResult<SaleDetail> {
        let client = self
            .clients
            .get(&sale.client_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("dangling client {}", sale.client_id)))?;
        let (_, user) = self
            .users
            .get(&sale.user_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("dangling user {}", sale.user_id)))?;

        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|p| p.sale_id == sale.id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.pay_date.cmp(&a.pay_date).then(b.id.cmp(&a.id)));

        Ok(SaleDetail {
            sale: sale.clone(),
            client,
            user,
            payments,
        })
    }

    fn matches(&self, sale: &Sale, filter: &SaleFilter) -> bool {
        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            let client_name = self
                .clients
                .get(&sale.client_id)
                .map(|c| c.name.to_lowercase())
                .unwrap_or_default();
            if !sale.description.to_lowercase().contains(&needle) && !client_name.contains(&needle) {
                return false;
            }
        }
        if let Some(is_paid) = filter.is_paid {
            if sale.is_paid != is_paid {
                return false;
            }
        }
        if let Some((start, end)) = filter.sale_date_range {
            if sale.sale_date < start || sale.sale_date > end {
                return false;
            }
        }
        true
    }
}

/// In-process ledger with real transaction semantics: a transaction works on
/// a copy of the state and publishes it on commit.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
    fail_payment_inserts: Arc<AtomicBool>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_store(&self, name: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.stores.insert(id, name.to_string());
        id
    }

    pub async fn add_user(&self, store_id: i64, name: &str, email: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let user = UserSummary {
            id,
            name: name.to_string(),
            email: email.to_string(),
        };
        state.users.insert(id, (store_id, user));
        id
    }

    /// Make every subsequent payment insert fail, to exercise rollback
    pub fn fail_payment_inserts(&self, fail: bool) {
        self.fail_payment_inserts.store(fail, Ordering::SeqCst);
    }

    pub async fn sale_count(&self) -> usize {
        self.state.lock().await.sales.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.state.lock().await.payments.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx {
            guard,
            working,
            fail_payment_inserts: self.fail_payment_inserts.clone(),
        }))
    }

    async fn find_client(&self, store_id: i64, client_id: i64) -> AppResult<Option<Client>> {
        let state = self.state.lock().await;
        Ok(state
            .clients
            .get(&client_id)
            .filter(|c| c.store_id == store_id)
            .cloned())
    }

    async fn list_clients(
        &self,
        store_id: i64,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Client>, i64)> {
        let state = self.state.lock().await;
        let needle = search.map(str::to_lowercase);

        let mut clients: Vec<Client> = state
            .clients
            .values()
            .filter(|c| c.store_id == store_id)
            .filter(|c| match &needle {
                Some(needle) => {
                    c.name.to_lowercase().contains(needle) || c.phone.contains(needle.as_str())
                }
                None => true,
            })
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let total = clients.len() as i64;
        let page_items = clients
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .collect();

        Ok((page_items, total))
    }

    async fn find_sale(&self, store_id: i64, sale_id: i64) -> AppResult<Option<SaleDetail>> {
        let state = self.state.lock().await;
        match state.sales.get(&sale_id).filter(|s| s.store_id == store_id) {
            Some(sale) => Ok(Some(state.detail(sale)?)),
            None => Ok(None),
        }
    }

    async fn list_sales(
        &self,
        store_id: i64,
        filter: &SaleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<SaleDetail>, i64)> {
        let state = self.state.lock().await;

        let mut sales: Vec<&Sale> = state
            .sales
            .values()
            .filter(|s| s.store_id == store_id && state.matches(s, filter))
            .collect();
        sales.sort_by(|a, b| b.sale_date.cmp(&a.sale_date).then(b.id.cmp(&a.id)));

        let total = sales.len() as i64;
        let details = sales
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .map(|sale| state.detail(sale))
            .collect::<AppResult<Vec<_>>>()?;

        Ok((details, total))
    }

    async fn list_client_sales(&self, store_id: i64, client_id: i64) -> AppResult<Vec<SaleDetail>> {
        let state = self.state.lock().await;

        let mut sales: Vec<&Sale> = state
            .sales
            .values()
            .filter(|s| s.store_id == store_id && s.client_id == client_id)
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        sales.into_iter().map(|sale| state.detail(sale)).collect()
    }
}

pub struct InMemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
    fail_payment_inserts: Arc<AtomicBool>,
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn find_client(&mut self, store_id: i64, client_id: i64) -> AppResult<Option<Client>> {
        Ok(self
            .working
            .clients
            .get(&client_id)
            .filter(|c| c.store_id == store_id)
            .cloned())
    }

    async fn insert_client(&mut self, store_id: i64, client: NewClient) -> AppResult<Client> {
        if !self.working.stores.contains_key(&store_id) {
            return Err(AppError::Internal(format!("unknown store {}", store_id)));
        }
        let now = Utc::now();
        let client = Client {
            id: self.working.next_id(),
            name: client.name,
            phone: client.phone,
            birth_date: client.birth_date,
            observations: client.observations,
            debit_balance: Decimal::ZERO,
            store_id,
            created_at: now,
            updated_at: now,
        };
        self.working.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_client(&mut self, client_id: i64, changes: ClientChanges) -> AppResult<Client> {
        let client = self
            .working
            .clients
            .get_mut(&client_id)
            .ok_or_else(|| AppError::NotFound(format!("Client {}", client_id)))?;

        if let Some(name) = changes.name {
            client.name = name;
        }
        if let Some(phone) = changes.phone {
            client.phone = phone;
        }
        if let Some(birth_date) = changes.birth_date {
            client.birth_date = birth_date;
        }
        if let Some(observations) = changes.observations {
            client.observations = observations;
        }
        client.updated_at = Utc::now();

        Ok(client.clone())
    }

    async fn adjust_debit_balance(&mut self, client_id: i64, delta: Decimal) -> AppResult<()> {
        let client = self
            .working
            .clients
            .get_mut(&client_id)
            .ok_or_else(|| AppError::NotFound(format!("Client {}", client_id)))?;
        client.debit_balance += delta;
        client.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_sale(&mut self, sale: NewSale) -> AppResult<Sale> {
        if !self.working.clients.contains_key(&sale.client_id) {
            return Err(AppError::Internal(format!("unknown client {}", sale.client_id)));
        }
        if !self.working.users.contains_key(&sale.user_id) {
            return Err(AppError::Internal(format!("unknown user {}", sale.user_id)));
        }

        let now = Utc::now();
        let sale = Sale {
            id: self.working.next_id(),
            value: sale.value,
            description: sale.description,
            is_paid: sale.is_paid,
            due_date: sale.due_date,
            sale_date: now,
            store_id: sale.store_id,
            client_id: sale.client_id,
            user_id: sale.user_id,
            created_at: now,
            updated_at: now,
        };
        self.working.sales.insert(sale.id, sale.clone());
        Ok(sale)
    }

    async fn lock_sale(&mut self, store_id: i64, sale_id: i64) -> AppResult<Option<Sale>> {
        Ok(self
            .working
            .sales
            .get(&sale_id)
            .filter(|s| s.store_id == store_id)
            .cloned())
    }

    async fn update_sale(&mut self, sale_id: i64, changes: SaleChanges) -> AppResult<()> {
        let sale = self
            .working
            .sales
            .get_mut(&sale_id)
            .ok_or_else(|| AppError::NotFound(format!("Sale {}", sale_id)))?;

        if let Some(description) = changes.description {
            sale.description = description;
        }
        if let Some(due_date) = changes.due_date {
            sale.due_date = due_date;
        }
        sale.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_sale(&mut self, sale_id: i64) -> AppResult<()> {
        if self.working.payments.values().any(|p| p.sale_id == sale_id) {
            return Err(AppError::Internal(format!(
                "sale {} still referenced by payments",
                sale_id
            )));
        }
        self.working.sales.remove(&sale_id);
        Ok(())
    }

    async fn insert_payment(
        &mut self,
        sale_id: i64,
        value: Decimal,
        pay_date: DateTime<Utc>,
    ) -> AppResult<Payment> {
        if self.fail_payment_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal("payment insert failed".to_string()));
        }
        if !self.working.sales.contains_key(&sale_id) {
            return Err(AppError::Internal(format!("unknown sale {}", sale_id)));
        }

        let payment = Payment {
            id: self.working.next_id(),
            value,
            pay_date,
            sale_id,
            created_at: Utc::now(),
        };
        self.working.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn sale_payments(&mut self, sale_id: i64) -> AppResult<Vec<Payment>> {
        Ok(self
            .working
            .payments
            .values()
            .filter(|p| p.sale_id == sale_id)
            .cloned()
            .collect())
    }

    async fn delete_sale_payments(&mut self, sale_id: i64) -> AppResult<u64> {
        let before = self.working.payments.len();
        self.working.payments.retain(|_, p| p.sale_id != sale_id);
        Ok((before - self.working.payments.len()) as u64)
    }

    async fn sale_detail(&mut self, sale_id: i64) -> AppResult<Option<SaleDetail>> {
        match self.working.sales.get(&sale_id) {
            Some(sale) => Ok(Some(self.working.detail(sale)?)),
            None => Ok(None),
        }
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
