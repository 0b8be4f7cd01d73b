use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;

/// Process-wide request budget shared by every route
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimitLayer {
    /// Allow `requests` per `per_seconds`, replenished evenly. Zero values are clamped to one.
    pub fn new(requests: u32, per_seconds: u64) -> Self {
        let burst = NonZeroU32::new(requests.max(1)).unwrap_or(NonZeroU32::MIN);
        let replenish = Duration::from_secs(per_seconds.max(1)) / burst.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        RateLimitLayer {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn check(&self) -> Result<(), AppError> {
        self.limiter.check().map_err(|_| AppError::RateLimited)
    }
}

pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitLayer>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    rate_limit.check()?;
    Ok(next.run(req).await)
}
