//! Per-client rate limiting middleware.
//!
//! Applies sliding-window rate limits per bearer token, falling back to
//! the peer address for unauthenticated calls:
//! - 120 requests per minute
//! - 2000 requests per hour

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::middleware::auth::bearer_token;
use crate::api::types::ApiContext;
use crate::sessions::hash_token;

/// Extract a rate-limit key from the request.
fn rate_key(req: &Request<axum::body::Body>) -> String {
    if let Some(token) = bearer_token(req.headers()) {
        let digest = hash_token(&token);
        let prefix: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
        return format!("token:{prefix}");
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Per-client rate limiting. Returns 429 if exceeded.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = rate_key(&req);

    // MutexGuard is !Send — must drop before .await via block scope
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(%key, retry_after, "rate limit exceeded");
            ApiError::ResourceExhausted { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_token_digest_not_token() {
        let req = Request::builder()
            .header("Authorization", "Bearer secret-token-value")
            .body(axum::body::Body::empty())
            .unwrap();
        let key = rate_key(&req);
        assert!(key.starts_with("token:"));
        assert!(!key.contains("secret"));
        assert_eq!(key.len(), "token:".len() + 16);
    }

    #[test]
    fn key_falls_back_to_peer_address() {
        let mut req = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(rate_key(&req), "anonymous");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 51000))));
        assert_eq!(rate_key(&req), "ip:10.0.0.7");
    }
}
