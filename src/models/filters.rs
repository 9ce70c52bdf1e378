use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::enums::{PatientStatus, ReferralPriority, ReferralStatus};

#[derive(Debug, Default, Deserialize)]
pub struct PatientFilter {
    /// Case-insensitive match on first name, last name or DNI.
    pub search: Option<String>,
    pub branch: Option<String>,
    pub status: Option<PatientStatus>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConsultationFilter {
    pub patient_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryFilter {
    pub patient_id: Option<Uuid>,
    pub recorded_by: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReferralFilter {
    pub status: Option<ReferralStatus>,
    pub priority: Option<ReferralPriority>,
    pub referred_by: Option<Uuid>,
}
