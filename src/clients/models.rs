use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::ledger::models::{parse_timestamp, Client, ClientChanges, NewClient, Pagination};

/// Phone numbers are stored as bare digits: 10 (landline) or 11 (mobile)
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn phone_digits(phone: &str) -> Result<(), validator::ValidationError> {
    let digits = normalize_phone(phone).len();
    if !(10..=11).contains(&digits) {
        let mut error = validator::ValidationError::new("phone");
        error.message = Some("phone must have 10 or 11 digits".into());
        return Err(error);
    }
    Ok(())
}

/// Accept `YYYY-MM-DD` or a full timestamp, keeping only the calendar date
fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .map(|ts| ts.date_naive())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_date")] NaiveDate);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(date)| date))
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 3, message = "name must have at least 3 characters"))]
    pub name: String,
    #[validate(custom = "phone_digits")]
    pub phone: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub birth_date: NaiveDate,
    pub observations: Option<String>,
}

impl From<CreateClientRequest> for NewClient {
    fn from(req: CreateClientRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            phone: normalize_phone(&req.phone),
            birth_date: req.birth_date,
            observations: req.observations.filter(|o| !o.trim().is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 3, message = "name must have at least 3 characters"))]
    pub name: Option<String>,
    #[validate(custom = "phone_digits")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub observations: Option<Option<String>>,
}

impl From<UpdateClientRequest> for ClientChanges {
    fn from(req: UpdateClientRequest) -> Self {
        Self {
            name: req.name.map(|n| n.trim().to_string()),
            phone: req.phone.as_deref().map(normalize_phone),
            birth_date: req.birth_date,
            observations: req
                .observations
                .map(|o| o.filter(|text| !text.trim().is_empty())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListClientsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<Client>,
    pub pagination: Pagination,
}

/// Aggregates shown when a client row is expanded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetrics {
    pub client_id: i64,
    pub debit_balance: Decimal,
    pub total_sales: i64,
    pub total_sold: Decimal,
    pub total_paid: Decimal,
    pub open_sales: i64,
    pub overdue_sales: i64,
    pub last_sale_date: Option<DateTime<Utc>>,
}
