//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves the session, then
//! re-reads the staff profile so a deactivation or role change applies to
//! the very next request. Injects `StaffContext` for downstream handlers.

use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::db::repository::get_user;

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Require a valid bearer token belonging to an active staff member.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthenticated)?;

    // Guards dropped before any .await
    let session = ctx
        .core
        .write_sessions()?
        .validate(&token, Utc::now())
        .ok_or(ApiError::Unauthenticated)?;

    let user = ctx.core.with_db(|conn| get_user(conn, &session.uid).map_err(ApiError::from))?;
    let user = match user {
        Some(user) if user.active => user,
        _ => {
            ctx.core.write_sessions()?.revoke_user(&session.uid);
            tracing::info!(uid = %session.uid, "session rejected for missing or inactive account");
            return Err(ApiError::Unauthenticated);
        }
    };

    req.extensions_mut().insert(StaffContext::from(user));

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
