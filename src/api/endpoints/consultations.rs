//! Consultation endpoints and the printable prescription.
//!
//! `GET|POST /api/consultations`, `GET|PUT|DELETE /api/consultations/:id`,
//! `GET /api/consultations/:id/prescription.pdf`.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::api::endpoints::{parse_id, run_blocking};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MineQuery, StaffContext};
use crate::db::repository::{
    delete_consultation, get_user, insert_consultation, list_consultations, require_consultation,
    require_patient, update_consultation,
};
use crate::models::{Consultation, ConsultationFilter, NewConsultation};
use crate::prescription::{render_pdf, PrescriptionDocument};
use crate::validation::validate_consultation;

/// `GET /api/consultations` — `?patient_id=&staff_id=&from=&to=&mine=true`.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Query(mut filter): Query<ConsultationFilter>,
    Query(mine): Query<MineQuery>,
) -> Result<Json<Vec<Consultation>>, ApiError> {
    if mine.mine {
        filter.staff_id = Some(staff.uid);
    }
    let rows = ctx
        .core
        .with_db(|conn| list_consultations(conn, &filter).map_err(ApiError::from))?;
    Ok(Json(rows))
}

/// `POST /api/consultations` — the attending staff member defaults to the
/// caller.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(input): Json<NewConsultation>,
) -> Result<(StatusCode, Json<Consultation>), ApiError> {
    validate_consultation(&input)?;
    let staff_id = input.staff_id.unwrap_or(staff.uid);
    let consultation = ctx.core.with_db(|conn| -> Result<Consultation, ApiError> {
        require_patient(conn, &input.patient_id)?;
        Ok(insert_consultation(conn, &input, staff_id)?)
    })?;
    tracing::info!(
        consultation_id = %consultation.id,
        patient_id = %consultation.patient_id,
        "consultation recorded"
    );
    Ok((StatusCode::CREATED, Json(consultation)))
}

/// `GET /api/consultations/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Consultation>, ApiError> {
    let id = parse_id(&id, "consultation")?;
    let consultation = ctx
        .core
        .with_db(|conn| require_consultation(conn, &id).map_err(ApiError::from))?;
    Ok(Json(consultation))
}

/// `PUT /api/consultations/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<NewConsultation>,
) -> Result<Json<Consultation>, ApiError> {
    let id = parse_id(&id, "consultation")?;
    validate_consultation(&input)?;
    let consultation = ctx.core.with_db(|conn| -> Result<Consultation, ApiError> {
        require_patient(conn, &input.patient_id)?;
        Ok(update_consultation(conn, &id, &input)?)
    })?;
    Ok(Json(consultation))
}

/// `DELETE /api/consultations/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "consultation")?;
    ctx.core
        .with_db(|conn| delete_consultation(conn, &id).map_err(ApiError::from))?;
    tracing::info!(consultation_id = %id, by = %staff.uid, "consultation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/consultations/:id/prescription.pdf`
pub async fn prescription(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "consultation")?;
    let doc = ctx.core.with_db(|conn| -> Result<PrescriptionDocument, ApiError> {
        let consultation = require_consultation(conn, &id)?;
        let patient = require_patient(conn, &consultation.patient_id)?;
        let staff_name = get_user(conn, &consultation.staff_id)?
            .map(|u| u.display_name)
            .unwrap_or_default();
        Ok(PrescriptionDocument::from_records(
            &ctx.core.config.clinic_name,
            &patient,
            &consultation,
            &staff_name,
        ))
    })?;

    let file_name = doc.file_name();
    let bytes = run_blocking(ctx.core.clone(), move |_| render_pdf(&doc).map_err(ApiError::from)).await?;
    tracing::debug!(consultation_id = %id, size = bytes.len(), "prescription rendered");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
