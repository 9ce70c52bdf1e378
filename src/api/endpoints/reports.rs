//! Reports.
//!
//! `GET /api/reports/pregnancies` lists current pregnancies with gestational
//! age, due date and risk labels. `GET /api/reports/summary` adds clinic-wide
//! counters. Both accept `?today=YYYY-MM-DD` to evaluate as of another date.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::api::endpoints::today;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ReportQuery};
use crate::db::repository::{
    count_consultations_since, count_deliveries, count_patients, count_referrals, list_active_patients,
};
use crate::gestation::{pregnancy_report, PregnancyRow, ReportSummary};
use crate::models::{PatientStatus, ReferralStatus};

/// Window for the "recent consultations" counter.
const RECENT_CONSULTATION_DAYS: i64 = 30;

#[derive(Serialize)]
pub struct PregnancyReport {
    pub generated_for: NaiveDate,
    pub summary: ReportSummary,
    pub rows: Vec<PregnancyRow>,
}

/// `GET /api/reports/pregnancies`
pub async fn pregnancies(
    State(ctx): State<ApiContext>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PregnancyReport>, ApiError> {
    let as_of = query.today.unwrap_or_else(today);
    let patients = ctx
        .core
        .with_db(|conn| list_active_patients(conn).map_err(ApiError::from))?;
    let rows = pregnancy_report(&patients, as_of);
    Ok(Json(PregnancyReport {
        generated_for: as_of,
        summary: ReportSummary::from_rows(&rows),
        rows,
    }))
}

#[derive(Serialize)]
pub struct ClinicSummary {
    pub generated_for: NaiveDate,
    pub active_patients: u32,
    pub recent_consultations: u32,
    pub deliveries: u32,
    pub pending_referrals: u32,
    pub pregnancies: ReportSummary,
}

/// `GET /api/reports/summary`
pub async fn summary(
    State(ctx): State<ApiContext>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ClinicSummary>, ApiError> {
    let as_of = query.today.unwrap_or_else(today);
    let since = Utc::now() - Duration::days(RECENT_CONSULTATION_DAYS);
    let summary = ctx.core.with_db(|conn| -> Result<ClinicSummary, ApiError> {
        let patients = list_active_patients(conn)?;
        let rows = pregnancy_report(&patients, as_of);
        Ok(ClinicSummary {
            generated_for: as_of,
            active_patients: count_patients(conn, Some(PatientStatus::Active))?,
            recent_consultations: count_consultations_since(conn, &since)?,
            deliveries: count_deliveries(conn)?,
            pending_referrals: count_referrals(conn, ReferralStatus::Pending)?,
            pregnancies: ReportSummary::from_rows(&rows),
        })
    })?;
    Ok(Json(summary))
}
