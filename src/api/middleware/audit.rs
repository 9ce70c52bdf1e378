//! Audit logging middleware.
//!
//! Logs every API request with the staff e-mail, method, path, and
//! response status. Runs innermost (after auth has injected StaffContext).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::{ApiContext, StaffContext};

/// Log API access for audit trail.
/// Accesses `ApiContext` from request extensions.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let ctx = req.extensions().get::<ApiContext>().cloned();
    let actor = req
        .extensions()
        .get::<StaffContext>()
        .map(|s| s.email.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16();
    tracing::info!(%actor, %method, %path, status, "api access");
    if let Some(ctx) = ctx {
        ctx.core
            .log_access(&actor, &format!("{method} {path}"), &format!("status:{status}"));
    }

    response
}
