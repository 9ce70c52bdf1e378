use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ConsultationType;

/// Vital signs taken during a consultation. Every field is optional;
/// the form only records what was measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub blood_pressure: Option<String>,
    #[serde(default)]
    pub heart_rate: Option<u32>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub uterine_height_cm: Option<f64>,
    #[serde(default)]
    pub fetal_heart_rate: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub staff_id: Uuid,
    pub consulted_at: DateTime<Utc>,
    pub consultation_type: ConsultationType,
    pub motive: String,
    pub diagnosis: Option<String>,
    pub instructions: Option<String>,
    pub vitals: Vitals,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConsultation {
    pub patient_id: Uuid,
    /// Defaults to the authenticated staff member when omitted.
    #[serde(default)]
    pub staff_id: Option<Uuid>,
    #[serde(default)]
    pub consulted_at: Option<DateTime<Utc>>,
    pub consultation_type: ConsultationType,
    pub motive: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub vitals: Vitals,
}
