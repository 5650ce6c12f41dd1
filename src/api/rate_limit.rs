//! Rate limiting middleware for the API
//!
//! Applies the service's per-client [`RateLimiter`] to the routes it is
//! layered on. Exempt IPs pass straight through.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};

use crate::error::Error;
use crate::rate_limiter::RateLimiter;

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let client = addr.ip();
    if limiter.is_exempt(&client) {
        return next.run(req).await;
    }

    match limiter.check(client).await {
        None => next.run(req).await,
        Some(retry_after_seconds) => {
            tracing::warn!(
                client = %client,
                path = %req.uri().path(),
                retry_after_seconds,
                "Rate limit exceeded"
            );
            Error::RateLimited {
                retry_after_seconds,
            }
            .into_response()
        }
    }
}
