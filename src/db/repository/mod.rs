//! Repository layer — entity-scoped database operations.
//!
//! One sub-module per collection. All public functions are re-exported
//! here so callers use `db::repository::insert_patient` etc.

mod audit;
mod consultation;
mod delivery;
mod diagnosis;
mod patient;
mod program;
mod referral;
mod user;

pub use audit::*;
pub use consultation::*;
pub use delivery::*;
pub use diagnosis::*;
pub use patient::*;
pub use program::*;
pub use referral::*;
pub use user::*;

/// Form inputs shared by repository, domain and API tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use crate::models::*;

    pub fn new_patient(first_name: &str, last_name: &str, national_id: &str) -> NewPatient {
        NewPatient {
            first_name: first_name.into(),
            last_name: last_name.into(),
            national_id: national_id.into(),
            birth_date: NaiveDate::from_ymd_opt(1995, 6, 15).unwrap(),
            sex: Sex::Female,
            phone: Some("987654321".into()),
            email: None,
            address: Some("Av. Los Próceres 123".into()),
            branch: "Central".into(),
            gravida: 1,
            para: 0,
            abortions: 0,
            cesareans: 0,
            last_menstrual_period: None,
        }
    }

    pub fn new_consultation(patient_id: Uuid) -> NewConsultation {
        NewConsultation {
            patient_id,
            staff_id: None,
            consulted_at: None,
            consultation_type: ConsultationType::Prenatal,
            motive: "Control prenatal".into(),
            diagnosis: None,
            instructions: Some("Sulfato ferroso 300 mg, una tableta diaria".into()),
            vitals: Vitals::default(),
        }
    }

    pub fn new_delivery(patient_id: Uuid) -> NewDelivery {
        NewDelivery {
            patient_id,
            delivered_at: Utc.with_ymd_and_hms(2026, 2, 10, 4, 30, 0).unwrap(),
            delivery_type: DeliveryType::Vaginal,
            apgar_1: 8,
            apgar_5: 9,
            newborn_weight_g: 3250,
            newborn_height_cm: 50.0,
            newborn_sex: NewbornSex::Female,
            notes: None,
        }
    }
}
