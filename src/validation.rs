//! Form validation for every record the API accepts.
//!
//! Each `validate_*` function collects all failing fields instead of
//! stopping at the first one, so a client can mark every invalid input
//! in a single round-trip.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::models::*;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TEXT_LEN: usize = 2000;
pub const MAX_OBSTETRIC_COUNT: u32 = 30;

static NATIONAL_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{8}$").unwrap());
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?\d{7,15}$").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static CIE10: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9]{2}(\.[0-9]{1,2})?$").unwrap());
static BLOOD_PRESSURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,3}/\d{2,3}$").unwrap());

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All rejected fields of one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn required(&mut self, field: &'static str, value: &str, max: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.push(field, "is required");
        } else if trimmed.chars().count() > max {
            self.push(field, format!("must be at most {max} characters"));
        }
    }

    fn optional_text(&mut self, field: &'static str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.push(field, format!("must be at most {max} characters"));
            }
        }
    }

    fn range<T: PartialOrd + std::fmt::Display>(&mut self, field: &'static str, value: T, min: T, max: T) {
        if value < min || value > max {
            self.push(field, format!("must be between {min} and {max}"));
        }
    }
}

pub fn is_valid_national_id(value: &str) -> bool {
    NATIONAL_ID.is_match(value.trim())
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

pub fn is_valid_cie10(value: &str) -> bool {
    CIE10.is_match(&value.trim().to_uppercase())
}

pub fn validate_patient(input: &NewPatient, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.required("first_name", &input.first_name, MAX_NAME_LEN);
    errors.required("last_name", &input.last_name, MAX_NAME_LEN);
    if !is_valid_national_id(&input.national_id) {
        errors.push("national_id", "must be exactly 8 digits");
    }
    if input.birth_date > today {
        errors.push("birth_date", "cannot be in the future");
    }
    if let Some(phone) = input.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        if !PHONE.is_match(phone.trim()) {
            errors.push("phone", "must contain 7 to 15 digits");
        }
    }
    if let Some(email) = input.email.as_deref().filter(|e| !e.trim().is_empty()) {
        if !is_valid_email(email) {
            errors.push("email", "is not a valid e-mail address");
        }
    }
    errors.optional_text("address", input.address.as_deref(), 200);
    errors.required("branch", &input.branch, MAX_NAME_LEN);
    errors.range("gravida", input.gravida, 0, MAX_OBSTETRIC_COUNT);
    errors.range("para", input.para, 0, MAX_OBSTETRIC_COUNT);
    errors.range("abortions", input.abortions, 0, MAX_OBSTETRIC_COUNT);
    errors.range("cesareans", input.cesareans, 0, MAX_OBSTETRIC_COUNT);
    if let Some(lmp) = input.last_menstrual_period {
        if lmp > today {
            errors.push("last_menstrual_period", "cannot be in the future");
        }
        if input.sex != Sex::Female {
            errors.push("last_menstrual_period", "only applies to female patients");
        }
    }
    errors.into_result()
}

pub fn validate_consultation(input: &NewConsultation) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.required("motive", &input.motive, 500);
    errors.optional_text("diagnosis", input.diagnosis.as_deref(), MAX_TEXT_LEN);
    errors.optional_text("instructions", input.instructions.as_deref(), MAX_TEXT_LEN);

    let v = &input.vitals;
    if let Some(w) = v.weight_kg {
        errors.range("vitals.weight_kg", w, 1.0, 300.0);
    }
    if let Some(h) = v.height_cm {
        errors.range("vitals.height_cm", h, 30.0, 250.0);
    }
    if let Some(bp) = v.blood_pressure.as_deref() {
        if !BLOOD_PRESSURE.is_match(bp.trim()) {
            errors.push("vitals.blood_pressure", "must look like 120/80");
        }
    }
    if let Some(hr) = v.heart_rate {
        errors.range("vitals.heart_rate", hr, 20, 250);
    }
    if let Some(t) = v.temperature_c {
        errors.range("vitals.temperature_c", t, 30.0, 45.0);
    }
    if let Some(u) = v.uterine_height_cm {
        errors.range("vitals.uterine_height_cm", u, 0.0, 50.0);
    }
    if let Some(f) = v.fetal_heart_rate {
        errors.range("vitals.fetal_heart_rate", f, 50, 250);
    }
    errors.into_result()
}

pub fn validate_delivery(input: &NewDelivery) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.range("apgar_1", input.apgar_1, 0, 10);
    errors.range("apgar_5", input.apgar_5, 0, 10);
    errors.range("newborn_weight_g", input.newborn_weight_g, 300, 6000);
    errors.range("newborn_height_cm", input.newborn_height_cm, 20.0, 65.0);
    errors.optional_text("notes", input.notes.as_deref(), MAX_TEXT_LEN);
    errors.into_result()
}

pub fn validate_referral(input: &NewReferral) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.required("specialty", &input.specialty, MAX_NAME_LEN);
    errors.required("reason", &input.reason, MAX_TEXT_LEN);
    errors.into_result()
}

pub fn validate_program(input: &NewProgram) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.required("name", &input.name, MAX_NAME_LEN);
    errors.optional_text("description", input.description.as_deref(), MAX_TEXT_LEN);
    errors.into_result()
}

pub fn validate_enrollment_notes(notes: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.optional_text("notes", notes, MAX_TEXT_LEN);
    errors.into_result()
}

pub fn validate_diagnosis(input: &NewDiagnosis) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !is_valid_cie10(&input.cie10_code) {
        errors.push("cie10_code", "must be a CIE-10 code such as O24.4");
    }
    errors.required("description", &input.description, 500);
    errors.into_result()
}

/// Staff account fields checked by the account-management functions.
pub fn validate_account(
    email: &str,
    display_name: &str,
    branch: &str,
    password: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !is_valid_email(email) {
        errors.push("email", "is not a valid e-mail address");
    }
    errors.required("display_name", display_name, MAX_NAME_LEN);
    errors.required("branch", branch, MAX_NAME_LEN);
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("password", format!("must be at least {MIN_PASSWORD_LEN} characters"));
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn valid_patient_passes() {
        assert!(validate_patient(&new_patient("Rosa", "Quispe", "45678912"), today()).is_ok());
    }

    #[test]
    fn patient_collects_every_failing_field() {
        let mut input = new_patient(" ", "Quispe", "4567891A");
        input.phone = Some("12".into());
        input.cesareans = 31;
        input.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let err = validate_patient(&input, today()).unwrap_err();
        assert!(err.has("first_name"));
        assert!(err.has("national_id"));
        assert!(err.has("phone"));
        assert!(err.has("cesareans"));
        assert!(err.has("birth_date"));
        assert!(!err.has("last_name"));
        assert_eq!(err.errors.len(), 5);
    }

    #[test]
    fn blank_optional_contact_fields_are_ignored() {
        let mut input = new_patient("Rosa", "Quispe", "45678912");
        input.phone = Some("".into());
        input.email = Some("  ".into());
        assert!(validate_patient(&input, today()).is_ok());
    }

    #[test]
    fn lmp_rules() {
        let mut future = new_patient("Rosa", "Quispe", "45678912");
        future.last_menstrual_period = Some(NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
        assert!(validate_patient(&future, today()).unwrap_err().has("last_menstrual_period"));

        let mut male = new_patient("Juan", "Quispe", "45678913");
        male.sex = Sex::Male;
        male.last_menstrual_period = Some(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        assert!(validate_patient(&male, today()).unwrap_err().has("last_menstrual_period"));
    }

    #[test]
    fn national_id_must_be_eight_digits() {
        assert!(is_valid_national_id("01234567"));
        assert!(!is_valid_national_id("1234567"));
        assert!(!is_valid_national_id("123456789"));
        assert!(!is_valid_national_id("1234-678"));
    }

    #[test]
    fn consultation_vitals_bounds() {
        let mut input = new_consultation(Uuid::new_v4());
        input.vitals.blood_pressure = Some("alta".into());
        input.vitals.fetal_heart_rate = Some(300);
        input.vitals.temperature_c = Some(36.8);
        let err = validate_consultation(&input).unwrap_err();
        assert!(err.has("vitals.blood_pressure"));
        assert!(err.has("vitals.fetal_heart_rate"));
        assert!(!err.has("vitals.temperature_c"));
    }

    #[test]
    fn delivery_apgar_and_anthropometry() {
        assert!(validate_delivery(&new_delivery(Uuid::new_v4())).is_ok());
        let mut input = new_delivery(Uuid::new_v4());
        input.apgar_5 = 11;
        input.newborn_weight_g = 200;
        let err = validate_delivery(&input).unwrap_err();
        assert!(err.has("apgar_5"));
        assert!(err.has("newborn_weight_g"));
        assert!(!err.has("apgar_1"));
    }

    #[test]
    fn cie10_shapes() {
        assert!(is_valid_cie10("O24.4"));
        assert!(is_valid_cie10("o80"));
        assert!(is_valid_cie10("Z34.91"));
        assert!(!is_valid_cie10("O2"));
        assert!(!is_valid_cie10("24.4"));
        assert!(!is_valid_cie10("O24.444"));
    }

    #[test]
    fn account_password_minimum() {
        assert!(validate_account("a@b.pe", "Ana", "Central", "secret").is_ok());
        let err = validate_account("not-an-email", "Ana", "Central", "12345").unwrap_err();
        assert!(err.has("email"));
        assert!(err.has("password"));
    }

    #[test]
    fn error_display_lists_fields() {
        let err = ValidationErrors::single("name", "is required");
        assert_eq!(err.to_string(), "name: is required");
    }
}
