//! Delivery (birth) records.
//!
//! `GET|POST /api/deliveries`, `GET|PUT|DELETE /api/deliveries/:id`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MineQuery, StaffContext};
use crate::db::repository::{
    delete_delivery, insert_delivery, list_deliveries, require_delivery, require_patient, update_delivery,
};
use crate::models::{Delivery, DeliveryFilter, NewDelivery};
use crate::validation::validate_delivery;

/// `GET /api/deliveries` — `?patient_id=&mine=true`.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Query(mut filter): Query<DeliveryFilter>,
    Query(mine): Query<MineQuery>,
) -> Result<Json<Vec<Delivery>>, ApiError> {
    if mine.mine {
        filter.recorded_by = Some(staff.uid);
    }
    let rows = ctx
        .core
        .with_db(|conn| list_deliveries(conn, &filter).map_err(ApiError::from))?;
    Ok(Json(rows))
}

/// `POST /api/deliveries`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(input): Json<NewDelivery>,
) -> Result<(StatusCode, Json<Delivery>), ApiError> {
    validate_delivery(&input)?;
    let delivery = ctx.core.with_db(|conn| -> Result<Delivery, ApiError> {
        let patient = require_patient(conn, &input.patient_id)?;
        Ok(insert_delivery(conn, &input, &patient, staff.uid)?)
    })?;
    tracing::info!(delivery_id = %delivery.id, patient_id = %delivery.patient_id, "delivery recorded");
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// `GET /api/deliveries/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Delivery>, ApiError> {
    let id = parse_id(&id, "delivery")?;
    let delivery = ctx
        .core
        .with_db(|conn| require_delivery(conn, &id).map_err(ApiError::from))?;
    Ok(Json(delivery))
}

/// `PUT /api/deliveries/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<NewDelivery>,
) -> Result<Json<Delivery>, ApiError> {
    let id = parse_id(&id, "delivery")?;
    validate_delivery(&input)?;
    let delivery = ctx
        .core
        .with_db(|conn| update_delivery(conn, &id, &input).map_err(ApiError::from))?;
    Ok(Json(delivery))
}

/// `DELETE /api/deliveries/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "delivery")?;
    ctx.core
        .with_db(|conn| delete_delivery(conn, &id).map_err(ApiError::from))?;
    tracing::info!(delivery_id = %id, by = %staff.uid, "delivery deleted");
    Ok(StatusCode::NO_CONTENT)
}
