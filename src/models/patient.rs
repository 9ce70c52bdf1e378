use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{PatientStatus, Sex};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// National ID (DNI), eight digits.
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub branch: String,
    pub gravida: u32,
    pub para: u32,
    pub abortions: u32,
    pub cesareans: u32,
    /// FUM — first day of the last menstrual period.
    pub last_menstrual_period: Option<NaiveDate>,
    pub status: PatientStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Patient form input — everything the client may write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub branch: String,
    #[serde(default)]
    pub gravida: u32,
    #[serde(default)]
    pub para: u32,
    #[serde(default)]
    pub abortions: u32,
    #[serde(default)]
    pub cesareans: u32,
    #[serde(default)]
    pub last_menstrual_period: Option<NaiveDate>,
}
