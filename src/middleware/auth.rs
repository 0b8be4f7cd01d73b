use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppError;

pub const STORE_ID_HEADER: &str = "x-store-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// Owners and managers may amend existing sales
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Owner | Role::Manager)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Role::Owner),
            "MANAGER" => Ok(Role::Manager),
            "EMPLOYEE" => Ok(Role::Employee),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// Identity of the authenticated caller, forwarded by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub store_id: i64,
    pub user_id: i64,
    pub role: Role,
}

impl CallerContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .ok_or(AppError::Unauthorized)
        };

        Ok(Self {
            store_id: header(STORE_ID_HEADER)?
                .trim()
                .parse()
                .map_err(|_| AppError::Unauthorized)?,
            user_id: header(USER_ID_HEADER)?
                .trim()
                .parse()
                .map_err(|_| AppError::Unauthorized)?,
            role: header(USER_ROLE_HEADER)?.parse()?,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        CallerContext::from_headers(&parts.headers)
    }
}

/// Admit only OWNER and MANAGER callers
pub async fn require_elevated_role(
    caller: CallerContext,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !caller.role.is_elevated() {
        tracing::warn!(
            "User {} ({}) denied elevated operation {} {}",
            caller.user_id,
            caller.role.as_str(),
            req.method(),
            req.uri().path()
        );
        return Err(AppError::PermissionDenied);
    }
    Ok(next.run(req).await)
}
