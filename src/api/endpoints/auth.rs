//! Staff authentication endpoints.
//!
//! `POST /api/auth/login` — Unprotected: e-mail + password for a bearer token
//! `POST /api/auth/logout` — Protected: revokes the presented token
//! `GET /api/auth/me` — Protected: the caller's current profile

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::verify_credentials;
use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::api::middleware::auth::bearer_token;
use crate::api::types::{ApiContext, StaffContext};
use crate::attempts::AttemptStatus;
use crate::db::repository::{get_user, normalize_email};
use crate::models::StaffUser;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: StaffUser,
}

/// Lockout counter key: peer address plus normalized e-mail, so failures
/// from one client cannot lock the account out for everyone else.
fn attempt_key(peer: Option<SocketAddr>, email: &str) -> String {
    match peer {
        Some(addr) => format!("{}/{email}", addr.ip()),
        None => format!("unknown/{email}"),
    }
}

fn retry_after(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (until - now).num_seconds().max(1) as u64
}

/// `POST /api/auth/login`
///
/// Lockout is checked before the password, so a blocked client is refused
/// even with correct credentials.
///
/// The check and the failure record are separate lock acquisitions with
/// the password verification in between, so concurrent requests can all
/// pass the check. Their failures still land on one counter: the one that
/// exhausts it fixes the deadline, and later ones return 429 without
/// extending it.
pub async fn login(
    State(ctx): State<ApiContext>,
    connect: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&request.email);
    let key = attempt_key(connect.map(|ConnectInfo(addr)| addr), &email);

    let now = Utc::now();
    let status = ctx.core.attempts()?.check(&key, now);
    if let AttemptStatus::Blocked { until } = status {
        tracing::info!(client = %key, %until, "login refused during lockout");
        return Err(ApiError::ResourceExhausted {
            retry_after: retry_after(until, now),
        });
    }

    let lookup = email.clone();
    let user = run_blocking(ctx.core.clone(), move |core| {
        core.with_db(|conn| verify_credentials(conn, &lookup, &request.password).map_err(ApiError::from))
    })
    .await?;

    let now = Utc::now();
    let Some(user) = user else {
        let status = {
            let mut attempts = ctx.core.attempts()?;
            attempts.purge_stale(now);
            attempts.record_failure(&key, now)
        };
        ctx.core.log_access(&email, "login", "failure");
        return Err(match status {
            AttemptStatus::Blocked { until } => ApiError::ResourceExhausted {
                retry_after: retry_after(until, now),
            },
            AttemptStatus::Allowed { remaining } => ApiError::InvalidCredentials { remaining },
        });
    };

    ctx.core.attempts()?.record_success(&key);
    let issued = {
        let mut sessions = ctx.core.write_sessions()?;
        sessions.purge_expired(now);
        sessions.issue(user.uid, now)
    };
    ctx.core.log_access(&user.email, "login", "success");
    tracing::info!(uid = %user.uid, role = %user.role, "staff signed in");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthenticated)?;
    let revoked = ctx.core.write_sessions()?.revoke(&token);
    tracing::info!(uid = %staff.uid, "staff signed out");
    Ok(Json(LogoutResponse { revoked }))
}

/// `GET /api/auth/me`
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
) -> Result<Json<StaffUser>, ApiError> {
    let user = ctx
        .core
        .with_db(|conn| get_user(conn, &staff.uid).map_err(ApiError::from))?
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(user))
}
