use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Role, Shift};

/// Staff profile record. Credentials live in a separate table and are
/// never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUser {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub shift: Shift,
    pub branch: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StaffUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
