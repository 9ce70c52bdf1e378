//! Gestational age and obstetric risk labelling.
//!
//! Pure functions over patient records: no database access, no clock.
//! Callers pass `today` so reports are reproducible.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Patient, PatientStatus, Sex};

/// Naegele's rule: due date is 280 days after the last menstrual period.
pub const GESTATION_DAYS: i64 = 280;

pub const LABEL_ADOLESCENT: &str = "Adolescente";
pub const LABEL_ADVANCED_AGE: &str = "Edad Avanzada";
pub const LABEL_PRIOR_CESAREAN: &str = "Cesárea Previa";
pub const LABEL_PRIOR_ABORTION: &str = "Aborto Previo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GestationalAge {
    pub days: i64,
    pub weeks: i64,
    pub trimester: u8,
}

/// `None` when the LMP lies after `today`.
pub fn gestational_age(lmp: NaiveDate, today: NaiveDate) -> Option<GestationalAge> {
    let days = (today - lmp).num_days();
    if days < 0 {
        return None;
    }
    let weeks = days / 7;
    Some(GestationalAge {
        days,
        weeks,
        trimester: trimester_for_weeks(weeks),
    })
}

pub fn trimester_for_weeks(weeks: i64) -> u8 {
    match weeks {
        i64::MIN..=13 => 1,
        14..=26 => 2,
        _ => 3,
    }
}

pub fn due_date(lmp: NaiveDate) -> NaiveDate {
    lmp + Duration::days(GESTATION_DAYS)
}

/// Completed years between `birth` and `today`.
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "BAJO")]
    Bajo,
    #[serde(rename = "ALTO")]
    Alto,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bajo => "BAJO",
            Self::Alto => "ALTO",
        }
    }

    pub fn from_labels(labels: &[&'static str]) -> Self {
        if labels.is_empty() {
            Self::Bajo
        } else {
            Self::Alto
        }
    }
}

pub fn risk_labels(age: i32, cesareans: u32, abortions: u32) -> Vec<&'static str> {
    let mut labels = Vec::new();
    if age < 18 {
        labels.push(LABEL_ADOLESCENT);
    }
    if age > 35 {
        labels.push(LABEL_ADVANCED_AGE);
    }
    if cesareans > 0 {
        labels.push(LABEL_PRIOR_CESAREAN);
    }
    if abortions > 0 {
        labels.push(LABEL_PRIOR_ABORTION);
    }
    labels
}

/// One row of the current-pregnancies report.
#[derive(Debug, Clone, Serialize)]
pub struct PregnancyRow {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub national_id: String,
    pub branch: String,
    pub age: i32,
    pub last_menstrual_period: NaiveDate,
    pub due_date: NaiveDate,
    pub gestational_days: i64,
    pub weeks: i64,
    pub trimester: u8,
    pub risk_labels: Vec<&'static str>,
    pub risk_level: RiskLevel,
}

impl PregnancyRow {
    pub fn from_patient(patient: &Patient, today: NaiveDate) -> Option<Self> {
        if patient.status != PatientStatus::Active || patient.sex != Sex::Female {
            return None;
        }
        let lmp = patient.last_menstrual_period?;
        let gestation = gestational_age(lmp, today)?;
        let age = age_in_years(patient.birth_date, today);
        let labels = risk_labels(age, patient.cesareans, patient.abortions);
        Some(Self {
            patient_id: patient.id,
            patient_name: patient.full_name(),
            national_id: patient.national_id.clone(),
            branch: patient.branch.clone(),
            age,
            last_menstrual_period: lmp,
            due_date: due_date(lmp),
            gestational_days: gestation.days,
            weeks: gestation.weeks,
            trimester: gestation.trimester,
            risk_level: RiskLevel::from_labels(&labels),
            risk_labels: labels,
        })
    }
}

/// Active pregnancies, most advanced first. Ties keep input order.
pub fn pregnancy_report(patients: &[Patient], today: NaiveDate) -> Vec<PregnancyRow> {
    let mut rows: Vec<PregnancyRow> = patients
        .iter()
        .filter_map(|p| PregnancyRow::from_patient(p, today))
        .collect();
    rows.sort_by(|a, b| b.weeks.cmp(&a.weeks));
    rows
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub first_trimester: usize,
    pub second_trimester: usize,
    pub third_trimester: usize,
    pub high_risk: usize,
    pub low_risk: usize,
}

impl ReportSummary {
    pub fn from_rows(rows: &[PregnancyRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Default::default()
        };
        for row in rows {
            match row.trimester {
                1 => summary.first_trimester += 1,
                2 => summary.second_trimester += 1,
                _ => summary.third_trimester += 1,
            }
            match row.risk_level {
                RiskLevel::Alto => summary.high_risk += 1,
                RiskLevel::Bajo => summary.low_risk += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 10, 16)
    }

    fn patient(name: &str, birth: NaiveDate, lmp: Option<NaiveDate>) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            first_name: name.into(),
            last_name: "Quispe".into(),
            national_id: "45678912".into(),
            birth_date: birth,
            sex: Sex::Female,
            phone: None,
            email: None,
            address: None,
            branch: "Central".into(),
            gravida: 1,
            para: 0,
            abortions: 0,
            cesareans: 0,
            last_menstrual_period: lmp,
            status: PatientStatus::Active,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn weeks_are_floor_of_days() {
        let lmp = date(2026, 1, 1);
        for k in [0_i64, 6, 7, 13, 97, 98, 188, 189, 280] {
            let age = gestational_age(lmp, lmp + Duration::days(k)).unwrap();
            assert_eq!(age.days, k);
            assert_eq!(age.weeks, k / 7);
        }
    }

    #[test]
    fn trimester_boundaries() {
        assert_eq!(trimester_for_weeks(0), 1);
        assert_eq!(trimester_for_weeks(13), 1);
        assert_eq!(trimester_for_weeks(14), 2);
        assert_eq!(trimester_for_weeks(26), 2);
        assert_eq!(trimester_for_weeks(27), 3);
        assert_eq!(trimester_for_weeks(41), 3);
    }

    #[test]
    fn future_lmp_has_no_gestational_age() {
        assert!(gestational_age(today() + Duration::days(1), today()).is_none());
    }

    #[test]
    fn age_counts_completed_years() {
        assert_eq!(age_in_years(date(1986, 10, 16), today()), 40);
        assert_eq!(age_in_years(date(1986, 10, 17), today()), 39);
        assert_eq!(age_in_years(date(2008, 10, 17), today()), 17);
    }

    #[test]
    fn risk_labels_are_independent() {
        assert!(risk_labels(25, 0, 0).is_empty());
        assert_eq!(risk_labels(17, 0, 0), vec![LABEL_ADOLESCENT]);
        assert!(risk_labels(18, 0, 0).is_empty());
        assert!(risk_labels(35, 0, 0).is_empty());
        assert_eq!(risk_labels(36, 0, 0), vec![LABEL_ADVANCED_AGE]);
        assert_eq!(
            risk_labels(40, 2, 1),
            vec![LABEL_ADVANCED_AGE, LABEL_PRIOR_CESAREAN, LABEL_PRIOR_ABORTION]
        );
        assert_eq!(RiskLevel::from_labels(&[]), RiskLevel::Bajo);
        assert_eq!(RiskLevel::from_labels(&[LABEL_PRIOR_ABORTION]), RiskLevel::Alto);
    }

    #[test]
    fn two_hundred_days_at_forty_is_high_risk_third_trimester() {
        let lmp = today() - Duration::days(200);
        let p = patient("Rosa", date(1986, 1, 10), Some(lmp));
        let row = PregnancyRow::from_patient(&p, today()).unwrap();
        assert_eq!(row.weeks, 28);
        assert_eq!(row.trimester, 3);
        assert_eq!(row.age, 40);
        assert_eq!(row.risk_labels, vec![LABEL_ADVANCED_AGE]);
        assert_eq!(row.risk_level, RiskLevel::Alto);
        assert_eq!(row.due_date, lmp + Duration::days(280));
    }

    #[test]
    fn report_filters_and_sorts() {
        let mut male = patient("Luis", date(1990, 1, 1), Some(today() - Duration::days(50)));
        male.sex = Sex::Male;
        let mut inactive = patient("Ines", date(1990, 1, 1), Some(today() - Duration::days(60)));
        inactive.status = PatientStatus::Inactive;
        let no_lmp = patient("Nora", date(1990, 1, 1), None);
        let early = patient("Eva", date(1990, 1, 1), Some(today() - Duration::days(30)));
        let late = patient("Lia", date(1990, 1, 1), Some(today() - Duration::days(250)));
        let tie = patient("Tia", date(1990, 1, 1), Some(today() - Duration::days(31)));
        let future = patient("Fia", date(1990, 1, 1), Some(today() + Duration::days(3)));

        let rows = pregnancy_report(&[male, inactive, no_lmp, early, late, tie, future], today());
        let names: Vec<_> = rows.iter().map(|r| r.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Lia Quispe", "Eva Quispe", "Tia Quispe"]);
    }

    #[test]
    fn summary_counts() {
        let mut risky = patient("Ana", date(2010, 1, 1), Some(today() - Duration::days(100)));
        risky.cesareans = 1;
        let rows = pregnancy_report(
            &[
                patient("Eva", date(1990, 1, 1), Some(today() - Duration::days(30))),
                risky,
                patient("Lia", date(1990, 1, 1), Some(today() - Duration::days(250))),
            ],
            today(),
        );
        let summary = ReportSummary::from_rows(&rows);
        assert_eq!(
            summary,
            ReportSummary {
                total: 3,
                first_trimester: 1,
                second_trimester: 1,
                third_trimester: 1,
                high_risk: 1,
                low_risk: 2,
            }
        );
    }

    #[test]
    fn risk_level_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Alto).unwrap(), "\"ALTO\"");
        assert_eq!(RiskLevel::Bajo.as_str(), "BAJO");
    }
}
