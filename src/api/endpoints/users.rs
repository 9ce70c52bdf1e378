//! Staff account endpoints.
//!
//! `POST /api/functions/crearUsuario` and `POST /api/functions/actualizarUsuario`
//! keep the callable-function names the client invokes. Both check the
//! caller's stored role; nothing else in the API is role-gated except the
//! staff listing.

use axum::extract::State;
use axum::{Extension, Json};

use crate::accounts::{self, CallableResult, CreateUserInput, UpdateUserInput};
use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::db::repository::list_users;
use crate::models::StaffUser;

/// `POST /api/functions/crearUsuario`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(input): Json<CreateUserInput>,
) -> Result<Json<CallableResult>, ApiError> {
    let result = run_blocking(ctx.core.clone(), move |core| {
        let iterations = core.config.password_iterations;
        core.with_db(|conn| {
            accounts::create_user(conn, Some(staff.uid), &input, iterations).map_err(ApiError::from)
        })
    })
    .await?;
    Ok(Json(result))
}

/// `POST /api/functions/actualizarUsuario`
///
/// Deactivating an account also ends its open sessions.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<CallableResult>, ApiError> {
    let deactivate = input.active == Some(false);
    let result = run_blocking(ctx.core.clone(), move |core| {
        let iterations = core.config.password_iterations;
        core.with_db(|conn| {
            accounts::update_user(conn, Some(staff.uid), &input, iterations).map_err(ApiError::from)
        })
    })
    .await?;

    if deactivate {
        let revoked = ctx.core.write_sessions()?.revoke_user(&result.uid);
        tracing::info!(uid = %result.uid, revoked, "sessions revoked after deactivation");
    }
    Ok(Json(result))
}

/// `GET /api/users` — admin only.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
) -> Result<Json<Vec<StaffUser>>, ApiError> {
    if !staff.is_admin() {
        return Err(ApiError::PermissionDenied(
            "Only administrators can list staff accounts".into(),
        ));
    }
    let users = ctx.core.with_db(|conn| list_users(conn).map_err(ApiError::from))?;
    Ok(Json(users))
}
