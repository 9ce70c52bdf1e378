use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DeliveryType, NewbornSex};

/// A delivery record. Patient name and DNI are copied at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_national_id: String,
    pub delivered_at: DateTime<Utc>,
    pub delivery_type: DeliveryType,
    pub apgar_1: u8,
    pub apgar_5: u8,
    pub newborn_weight_g: u32,
    pub newborn_height_cm: f64,
    pub newborn_sex: NewbornSex,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDelivery {
    pub patient_id: Uuid,
    pub delivered_at: DateTime<Utc>,
    pub delivery_type: DeliveryType,
    pub apgar_1: u8,
    pub apgar_5: u8,
    pub newborn_weight_g: u32,
    pub newborn_height_cm: f64,
    pub newborn_sex: NewbornSex,
    #[serde(default)]
    pub notes: Option<String>,
}
