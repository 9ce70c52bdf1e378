//! Care programs and patient enrollments.
//!
//! `GET|POST /api/programs`, `PUT /api/programs/:id`,
//! `GET|POST /api/programs/:id/enrollments`, `PUT|DELETE /api/enrollments/:id`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{
    delete_enrollment, insert_enrollment, insert_program, list_enrollments, list_programs,
    require_patient, require_program, update_enrollment, update_program,
};
use crate::models::{Enrollment, EnrollmentUpdate, NewEnrollment, NewProgram, Program, ProgramStatus};
use crate::validation::{validate_enrollment_notes, validate_program};

#[derive(Debug, Default, Deserialize)]
pub struct ProgramQuery {
    pub status: Option<ProgramStatus>,
}

/// `GET /api/programs` — `?status=active|inactive`.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ProgramQuery>,
) -> Result<Json<Vec<Program>>, ApiError> {
    let programs = ctx
        .core
        .with_db(|conn| list_programs(conn, query.status).map_err(ApiError::from))?;
    Ok(Json(programs))
}

/// `POST /api/programs`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<NewProgram>,
) -> Result<(StatusCode, Json<Program>), ApiError> {
    validate_program(&input)?;
    let program = ctx
        .core
        .with_db(|conn| insert_program(conn, &input).map_err(ApiError::from))?;
    tracing::info!(program_id = %program.id, "program created");
    Ok((StatusCode::CREATED, Json(program)))
}

/// `PUT /api/programs/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<NewProgram>,
) -> Result<Json<Program>, ApiError> {
    let id = parse_id(&id, "program")?;
    validate_program(&input)?;
    let program = ctx
        .core
        .with_db(|conn| update_program(conn, &id, &input).map_err(ApiError::from))?;
    Ok(Json(program))
}

/// `GET /api/programs/:id/enrollments`
pub async fn list_enrolled(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    let id = parse_id(&id, "program")?;
    let rows = ctx.core.with_db(|conn| -> Result<Vec<Enrollment>, ApiError> {
        require_program(conn, &id)?;
        Ok(list_enrollments(conn, &id)?)
    })?;
    Ok(Json(rows))
}

/// `POST /api/programs/:id/enrollments` — a patient can be enrolled in a
/// program once.
pub async fn enroll(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<NewEnrollment>,
) -> Result<(StatusCode, Json<Enrollment>), ApiError> {
    let id = parse_id(&id, "program")?;
    validate_enrollment_notes(input.notes.as_deref())?;
    let enrollment = ctx.core.with_db(|conn| -> Result<Enrollment, ApiError> {
        let program = require_program(conn, &id)?;
        if program.status != ProgramStatus::Active {
            return Err(ApiError::InvalidArgument(format!(
                "Program {} is not accepting enrollments",
                program.name
            )));
        }
        let patient = require_patient(conn, &input.patient_id)?;
        insert_enrollment(conn, &program, &patient, &input).map_err(|e| {
            if e.is_unique_violation() {
                ApiError::AlreadyExists(format!(
                    "{} is already enrolled in {}",
                    patient.full_name(),
                    program.name
                ))
            } else {
                e.into()
            }
        })
    })?;
    tracing::info!(
        enrollment_id = %enrollment.id,
        program_id = %enrollment.program_id,
        "patient enrolled"
    );
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// `PUT /api/enrollments/:id` — stage and notes only.
pub async fn update_enrolled(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<EnrollmentUpdate>,
) -> Result<Json<Enrollment>, ApiError> {
    let id = parse_id(&id, "enrollment")?;
    validate_enrollment_notes(input.notes.as_deref())?;
    let enrollment = ctx
        .core
        .with_db(|conn| update_enrollment(conn, &id, &input).map_err(ApiError::from))?;
    Ok(Json(enrollment))
}

/// `DELETE /api/enrollments/:id`
pub async fn unenroll(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "enrollment")?;
    ctx.core
        .with_db(|conn| delete_enrollment(conn, &id).map_err(ApiError::from))?;
    Ok(StatusCode::NO_CONTENT)
}
