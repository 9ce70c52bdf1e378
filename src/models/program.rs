use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{EnrollmentStage, ProgramStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProgramStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgram {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_program_status")]
    pub status: ProgramStatus,
}

fn default_program_status() -> ProgramStatus {
    ProgramStatus::Active
}

/// Join record between a patient and a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_name: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub stage: EnrollmentStage,
    pub notes: Option<String>,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub patient_id: Uuid,
    #[serde(default = "default_stage")]
    pub stage: EnrollmentStage,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_stage() -> EnrollmentStage {
    EnrollmentStage::Enrolled
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentUpdate {
    pub stage: EnrollmentStage,
    #[serde(default)]
    pub notes: Option<String>,
}
