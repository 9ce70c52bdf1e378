//! Patient registry endpoints.
//!
//! `GET|POST /api/patients`, `GET|PUT /api/patients/:id`,
//! `POST /api/patients/:id/deactivate`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::{parse_id, today};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MineQuery, StaffContext};
use crate::db::repository::{
    find_patient_by_national_id, insert_patient, list_patient_diagnoses, list_patient_enrollments,
    list_patients, require_patient, set_patient_status, update_patient,
};
use crate::gestation::{gestational_age, GestationalAge};
use crate::models::{Diagnosis, Enrollment, NewPatient, Patient, PatientFilter, PatientStatus};
use crate::validation::validate_patient;

/// `GET /api/patients` — `?search=&branch=&status=&mine=true`.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Query(mut filter): Query<PatientFilter>,
    Query(mine): Query<MineQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    if mine.mine {
        filter.created_by = Some(staff.uid);
    }
    let patients = ctx.core.with_db(|conn| list_patients(conn, &filter).map_err(ApiError::from))?;
    Ok(Json(patients))
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(input): Json<NewPatient>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    validate_patient(&input, today())?;
    let patient = ctx.core.with_db(|conn| -> Result<Patient, ApiError> {
        if find_patient_by_national_id(conn, input.national_id.trim())?.is_some() {
            return Err(duplicate_dni(&input.national_id));
        }
        Ok(insert_patient(conn, &input, Some(staff.uid))?)
    })?;
    tracing::info!(patient_id = %patient.id, by = %staff.uid, "patient registered");
    Ok((StatusCode::CREATED, Json(patient)))
}

#[derive(Serialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub gestational_age: Option<GestationalAge>,
    pub diagnoses: Vec<Diagnosis>,
    pub enrollments: Vec<Enrollment>,
}

/// `GET /api/patients/:id` — record plus current gestation, diagnoses and
/// program enrollments.
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientDetail>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let detail = ctx.core.with_db(|conn| -> Result<PatientDetail, ApiError> {
        let patient = require_patient(conn, &id)?;
        let diagnoses = list_patient_diagnoses(conn, &id)?;
        let enrollments = list_patient_enrollments(conn, &id)?;
        let gestational_age = patient
            .last_menstrual_period
            .and_then(|lmp| gestational_age(lmp, today()));
        Ok(PatientDetail {
            patient,
            gestational_age,
            diagnoses,
            enrollments,
        })
    })?;
    Ok(Json(detail))
}

/// `PUT /api/patients/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<NewPatient>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id, "patient")?;
    validate_patient(&input, today())?;
    let patient = ctx.core.with_db(|conn| -> Result<Patient, ApiError> {
        if let Some(other) = find_patient_by_national_id(conn, input.national_id.trim())? {
            if other.id != id {
                return Err(duplicate_dni(&input.national_id));
            }
        }
        Ok(update_patient(conn, &id, &input)?)
    })?;
    Ok(Json(patient))
}

/// `POST /api/patients/:id/deactivate` — soft delete; history is kept.
pub async fn deactivate(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let patient = ctx.core.with_db(|conn| -> Result<Patient, ApiError> {
        set_patient_status(conn, &id, PatientStatus::Inactive)?;
        Ok(require_patient(conn, &id)?)
    })?;
    tracing::info!(patient_id = %id, by = %staff.uid, "patient deactivated");
    Ok(Json(patient))
}

fn duplicate_dni(national_id: &str) -> ApiError {
    ApiError::AlreadyExists(format!(
        "A patient with DNI {} is already registered",
        national_id.trim()
    ))
}
