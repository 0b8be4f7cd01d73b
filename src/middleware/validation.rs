use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;
use crate::ledger::models::MAX_AMOUNT;

/// JSON body that has been deserialized and passed `validator` checks.
///
/// Malformed JSON and failed field rules both surface as 400 validation errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::validation(
        format!("Invalid JSON: {}", rejection.body_text()),
        serde_json::json!({ "body": [rejection.body_text()] }),
    )
}

/// Path parameters whose parse failures are reported in the JSON error envelope
#[derive(Debug, Clone, Copy)]
pub struct ValidatedPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(path_rejection)?;
        Ok(ValidatedPath(value))
    }
}

fn path_rejection(rejection: PathRejection) -> AppError {
    AppError::InvalidInput(rejection.body_text())
}

/// Field rule for decimal amounts that must not be negative
pub fn non_negative(value: &rust_decimal::Decimal) -> Result<(), validator::ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = validator::ValidationError::new("range");
        error.message = Some("must be greater than or equal to 0".into());
        return Err(error);
    }
    Ok(())
}

/// Money amount that fits the ledger's columns: `0 <= value <= MAX_AMOUNT`
pub fn ledger_amount(value: &rust_decimal::Decimal) -> Result<(), validator::ValidationError> {
    non_negative(value)?;
    if *value > MAX_AMOUNT {
        let mut error = validator::ValidationError::new("range");
        error.message = Some(format!("must be less than or equal to {}", MAX_AMOUNT).into());
        return Err(error);
    }
    Ok(())
}
