use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ReferralPriority, ReferralStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_national_id: String,
    pub specialty: String,
    pub reason: String,
    pub priority: ReferralPriority,
    pub status: ReferralStatus,
    pub referred_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReferral {
    pub patient_id: Uuid,
    pub specialty: String,
    pub reason: String,
    pub priority: ReferralPriority,
}
