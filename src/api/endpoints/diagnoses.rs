//! CIE-10 diagnoses attached to a patient.
//!
//! `GET|POST /api/patients/:id/diagnoses`, `DELETE /api/diagnoses/:id`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::db::repository::{
    delete_diagnosis, insert_diagnosis, list_patient_diagnoses, require_consultation, require_patient,
};
use crate::models::{Diagnosis, NewDiagnosis};
use crate::validation::validate_diagnosis;

/// `GET /api/patients/:id/diagnoses`
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<Diagnosis>>, ApiError> {
    let patient_id = parse_id(&patient_id, "patient")?;
    let rows = ctx.core.with_db(|conn| -> Result<Vec<Diagnosis>, ApiError> {
        require_patient(conn, &patient_id)?;
        Ok(list_patient_diagnoses(conn, &patient_id)?)
    })?;
    Ok(Json(rows))
}

/// `POST /api/patients/:id/diagnoses` — a linked consultation must belong
/// to the same patient.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(patient_id): Path<String>,
    Json(input): Json<NewDiagnosis>,
) -> Result<(StatusCode, Json<Diagnosis>), ApiError> {
    let patient_id = parse_id(&patient_id, "patient")?;
    validate_diagnosis(&input)?;
    let diagnosis = ctx.core.with_db(|conn| -> Result<Diagnosis, ApiError> {
        require_patient(conn, &patient_id)?;
        if let Some(consultation_id) = input.consultation_id {
            let consultation = require_consultation(conn, &consultation_id)?;
            if consultation.patient_id != patient_id {
                return Err(ApiError::InvalidArgument(
                    "Consultation belongs to another patient".into(),
                ));
            }
        }
        Ok(insert_diagnosis(conn, patient_id, &input, staff.uid)?)
    })?;
    tracing::info!(diagnosis_id = %diagnosis.id, code = %diagnosis.cie10_code, "diagnosis recorded");
    Ok((StatusCode::CREATED, Json(diagnosis)))
}

/// `DELETE /api/diagnoses/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "diagnosis")?;
    ctx.core
        .with_db(|conn| delete_diagnosis(conn, &id).map_err(ApiError::from))?;
    Ok(StatusCode::NO_CONTENT)
}
