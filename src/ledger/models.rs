use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::prelude::FromRow;

/// Client of a store, carrying the running debit balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub observations: Option<String>,
    pub debit_balance: Decimal,
    pub store_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sale row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub value: Decimal,
    pub description: String,
    pub is_paid: bool,
    pub due_date: DateTime<Utc>,
    pub sale_date: DateTime<Utc>,
    pub store_id: i64,
    pub client_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub value: Decimal,
    pub pay_date: DateTime<Utc>,
    pub sale_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Public view of the user who booked a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// A sale with its client, creator and payments attached
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub client: Client,
    pub user: UserSummary,
    pub payments: Vec<Payment>,
}

impl SaleDetail {
    pub fn total_paid(&self) -> Decimal {
        self.payments.iter().map(|p| p.value).sum()
    }

    /// Portion of the sale value not yet covered by payments
    pub fn outstanding(&self) -> Decimal {
        self.sale.value - self.total_paid()
    }
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub value: Decimal,
    pub description: String,
    pub is_paid: bool,
    pub due_date: DateTime<Utc>,
    pub store_id: i64,
    pub client_id: i64,
    pub user_id: i64,
}

/// Sale columns that may change after creation
#[derive(Debug, Clone, Default)]
pub struct SaleChanges {
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl SaleChanges {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.due_date.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// `Some(None)` clears the observations
    pub observations: Option<Option<String>>,
}

/// Filters accepted by the sale listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaleFilter {
    pub search: Option<String>,
    pub is_paid: Option<bool>,
    pub sale_date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Largest amount a `NUMERIC(12, 2)` money column holds
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64` at any page size
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Lenient constructor: missing, unparseable or non-positive values fall back to defaults
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: i64| {
            raw.and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v >= 1)
                .unwrap_or(default)
        };

        Self {
            page: parse(page, DEFAULT_PAGE).min(MAX_PAGE),
            limit: parse(limit, DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(total: i64, page: PageRequest) -> Self {
        Self {
            total,
            pages: (total + page.limit - 1) / page.limit,
            current_page: page.page,
            per_page: page.limit,
        }
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw))),
        None => Ok(None),
    }
}
