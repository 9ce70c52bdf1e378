//! Referrals to other specialties.
//!
//! `GET|POST /api/referrals`, `GET|PUT /api/referrals/:id`,
//! `POST /api/referrals/:id/status`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MineQuery, StaffContext};
use crate::db::repository::{
    insert_referral, list_referrals, require_patient, require_referral, set_referral_status,
    update_referral,
};
use crate::models::{NewReferral, Referral, ReferralFilter, ReferralStatus};
use crate::validation::validate_referral;

/// `GET /api/referrals` — `?status=&priority=&mine=true`.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Query(mut filter): Query<ReferralFilter>,
    Query(mine): Query<MineQuery>,
) -> Result<Json<Vec<Referral>>, ApiError> {
    if mine.mine {
        filter.referred_by = Some(staff.uid);
    }
    let rows = ctx
        .core
        .with_db(|conn| list_referrals(conn, &filter).map_err(ApiError::from))?;
    Ok(Json(rows))
}

/// `POST /api/referrals` — new referrals start as pending.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(input): Json<NewReferral>,
) -> Result<(StatusCode, Json<Referral>), ApiError> {
    validate_referral(&input)?;
    let referral = ctx.core.with_db(|conn| -> Result<Referral, ApiError> {
        let patient = require_patient(conn, &input.patient_id)?;
        Ok(insert_referral(conn, &input, &patient, staff.uid)?)
    })?;
    tracing::info!(
        referral_id = %referral.id,
        priority = %referral.priority,
        "referral created"
    );
    Ok((StatusCode::CREATED, Json(referral)))
}

/// `GET /api/referrals/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Referral>, ApiError> {
    let id = parse_id(&id, "referral")?;
    let referral = ctx
        .core
        .with_db(|conn| require_referral(conn, &id).map_err(ApiError::from))?;
    Ok(Json(referral))
}

/// `PUT /api/referrals/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<NewReferral>,
) -> Result<Json<Referral>, ApiError> {
    let id = parse_id(&id, "referral")?;
    validate_referral(&input)?;
    let referral = ctx
        .core
        .with_db(|conn| update_referral(conn, &id, &input).map_err(ApiError::from))?;
    Ok(Json(referral))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ReferralStatus,
}

/// `POST /api/referrals/:id/status`
pub async fn set_status(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Referral>, ApiError> {
    let id = parse_id(&id, "referral")?;
    let referral = ctx
        .core
        .with_db(|conn| set_referral_status(conn, &id, change.status).map_err(ApiError::from))?;
    tracing::info!(referral_id = %id, status = %change.status, by = %staff.uid, "referral status changed");
    Ok(Json(referral))
}
