use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A coded diagnosis (CIE-10) attached to a patient, optionally to the
/// consultation where it was made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub cie10_code: String,
    pub description: String,
    pub diagnosed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiagnosis {
    #[serde(default)]
    pub consultation_id: Option<Uuid>,
    pub cie10_code: String,
    pub description: String,
}
