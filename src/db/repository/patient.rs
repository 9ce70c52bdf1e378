use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, now_utc, parse_date, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, first_name, last_name, national_id, birth_date, sex, phone,
     email, address, branch, gravida, para, abortions, cesareans, last_menstrual_period,
     status, created_by, created_at, updated_at";

/// Inserts a new patient built from form input. Returns the stored record.
pub fn insert_patient(
    conn: &Connection,
    input: &NewPatient,
    created_by: Option<Uuid>,
) -> Result<Patient, DatabaseError> {
    let now = now_utc();
    let patient = Patient {
        id: Uuid::new_v4(),
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        national_id: input.national_id.trim().to_string(),
        birth_date: input.birth_date,
        sex: input.sex,
        phone: input.phone.clone(),
        email: input.email.clone(),
        address: input.address.clone(),
        branch: input.branch.trim().to_string(),
        gravida: input.gravida,
        para: input.para,
        abortions: input.abortions,
        cesareans: input.cesareans,
        last_menstrual_period: input.last_menstrual_period,
        status: PatientStatus::Active,
        created_by,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, national_id, birth_date, sex, phone,
         email, address, branch, gravida, para, abortions, cesareans, last_menstrual_period,
         status, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.national_id,
            patient.birth_date.to_string(),
            patient.sex.as_str(),
            patient.phone,
            patient.email,
            patient.address,
            patient.branch,
            patient.gravida,
            patient.para,
            patient.abortions,
            patient.cesareans,
            patient.last_menstrual_period.map(|d| d.to_string()),
            patient.status.as_str(),
            patient.created_by.map(|id| id.to_string()),
            format_timestamp(&patient.created_at),
            format_timestamp(&patient.updated_at),
        ],
    )?;
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![id.to_string()], read_patient_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Like [`get_patient`] but a missing row is an error.
pub fn require_patient(conn: &Connection, id: &Uuid) -> Result<Patient, DatabaseError> {
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id))
}

pub fn find_patient_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE national_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![national_id], read_patient_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_patients(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Patient>, DatabaseError> {
    let mut sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE 1=1");
    let mut values: Vec<String> = Vec::new();

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let n = values.len() + 1;
        sql.push_str(&format!(
            " AND (first_name LIKE ?{n} ESCAPE '\\' COLLATE NOCASE
               OR last_name LIKE ?{n} ESCAPE '\\' COLLATE NOCASE
               OR national_id LIKE ?{n} ESCAPE '\\')"
        ));
        values.push(format!("%{}%", escape_like(search)));
    }
    if let Some(branch) = &filter.branch {
        values.push(branch.clone());
        sql.push_str(&format!(" AND branch = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(status.as_str().to_string());
        sql.push_str(&format!(" AND status = ?{}", values.len()));
    }
    if let Some(created_by) = filter.created_by {
        values.push(created_by.to_string());
        sql.push_str(&format!(" AND created_by = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(values.iter()), read_patient_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(patient_from_row).collect()
}

/// Escapes `LIKE` wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Every active patient, for report computation.
pub fn list_active_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    list_patients(
        conn,
        &PatientFilter {
            status: Some(PatientStatus::Active),
            ..Default::default()
        },
    )
}

/// Overwrites the form fields of an existing patient.
pub fn update_patient(conn: &Connection, id: &Uuid, input: &NewPatient) -> Result<Patient, DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, national_id = ?4, birth_date = ?5,
         sex = ?6, phone = ?7, email = ?8, address = ?9, branch = ?10, gravida = ?11, para = ?12,
         abortions = ?13, cesareans = ?14, last_menstrual_period = ?15, updated_at = ?16
         WHERE id = ?1",
        params![
            id.to_string(),
            input.first_name.trim(),
            input.last_name.trim(),
            input.national_id.trim(),
            input.birth_date.to_string(),
            input.sex.as_str(),
            input.phone,
            input.email,
            input.address,
            input.branch.trim(),
            input.gravida,
            input.para,
            input.abortions,
            input.cesareans,
            input.last_menstrual_period.map(|d| d.to_string()),
            format_timestamp(&now_utc()),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    require_patient(conn, id)
}

pub fn set_patient_status(
    conn: &Connection,
    id: &Uuid,
    status: PatientStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), format_timestamp(&now_utc())],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    Ok(())
}

pub fn count_patients(conn: &Connection, status: Option<PatientStatus>) -> Result<u32, DatabaseError> {
    let count = match status {
        Some(s) => conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE status = ?1",
            params![s.as_str()],
            |row| row.get::<_, u32>(0),
        )?,
        None => conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get::<_, u32>(0))?,
    };
    Ok(count)
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    national_id: String,
    birth_date: String,
    sex: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    branch: String,
    gravida: u32,
    para: u32,
    abortions: u32,
    cesareans: u32,
    last_menstrual_period: Option<String>,
    status: String,
    created_by: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        national_id: row.get(3)?,
        birth_date: row.get(4)?,
        sex: row.get(5)?,
        phone: row.get(6)?,
        email: row.get(7)?,
        address: row.get(8)?,
        branch: row.get(9)?,
        gravida: row.get(10)?,
        para: row.get(11)?,
        abortions: row.get(12)?,
        cesareans: row.get(13)?,
        last_menstrual_period: row.get(14)?,
        status: row.get(15)?,
        created_by: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        national_id: row.national_id,
        birth_date: parse_date(&row.birth_date)?,
        sex: Sex::from_str(&row.sex)?,
        phone: row.phone,
        email: row.email,
        address: row.address,
        branch: row.branch,
        gravida: row.gravida,
        para: row.para,
        abortions: row.abortions,
        cesareans: row.cesareans,
        last_menstrual_period: row.last_menstrual_period.as_deref().map(parse_date).transpose()?,
        status: PatientStatus::from_str(&row.status)?,
        created_by: row.created_by.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_get_roundtrip() {
        let conn = open_memory_database().unwrap();
        let input = new_patient("Rosa", "Quispe", "45678912");
        let stored = insert_patient(&conn, &input, None).unwrap();

        let fetched = get_patient(&conn, &stored.id).unwrap().unwrap();
        assert_eq!(fetched.full_name(), "Rosa Quispe");
        assert_eq!(fetched.national_id, "45678912");
        assert_eq!(fetched.status, PatientStatus::Active);
        assert_eq!(fetched.created_at, stored.created_at);
    }

    #[test]
    fn get_missing_patient_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient(&conn, &Uuid::new_v4()).unwrap().is_none());
        let err = require_patient(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn duplicate_national_id_is_unique_violation() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &new_patient("Rosa", "Quispe", "45678912"), None).unwrap();
        let err = insert_patient(&conn, &new_patient("Ana", "Mamani", "45678912"), None).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn list_filters_by_search_branch_and_status() {
        let conn = open_memory_database().unwrap();
        let rosa = insert_patient(&conn, &new_patient("Rosa", "Quispe", "45678912"), None).unwrap();
        let mut other_branch = new_patient("Ana", "Mamani", "11223344");
        other_branch.branch = "Norte".into();
        insert_patient(&conn, &other_branch, None).unwrap();

        let by_name = list_patients(
            &conn,
            &PatientFilter { search: Some("quis".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, rosa.id);

        let by_dni = list_patients(
            &conn,
            &PatientFilter { search: Some("1122".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_dni[0].first_name, "Ana");

        let by_branch = list_patients(
            &conn,
            &PatientFilter { branch: Some("Norte".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_branch.len(), 1);

        set_patient_status(&conn, &rosa.id, PatientStatus::Inactive).unwrap();
        let active = list_active_patients(&conn).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].first_name, "Ana");
    }

    #[test]
    fn search_wildcards_match_literally() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &new_patient("Rosa", "Quispe", "45678912"), None).unwrap();
        insert_patient(&conn, &new_patient("Ana", "Mamani", "11223344"), None).unwrap();
        let odd = insert_patient(&conn, &new_patient("Luz_Maria", "Huaman", "99887766"), None).unwrap();

        let search = |term: &str| {
            list_patients(&conn, &PatientFilter { search: Some(term.into()), ..Default::default() })
                .unwrap()
        };

        let underscore = search("_");
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].id, odd.id);
        assert!(search("%").is_empty());
        assert!(search("\\").is_empty());
        assert_eq!(search("z_m").len(), 1);
        assert!(search("Ros_").is_empty());
    }

    #[test]
    fn list_orders_by_last_name() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &new_patient("Zoila", "Vargas", "10000001"), None).unwrap();
        insert_patient(&conn, &new_patient("Ana", "alvarez", "10000002"), None).unwrap();
        let all = list_patients(&conn, &PatientFilter::default()).unwrap();
        assert_eq!(all[0].last_name, "alvarez");
        assert_eq!(all[1].last_name, "Vargas");
    }

    #[test]
    fn update_overwrites_form_fields() {
        let conn = open_memory_database().unwrap();
        let stored = insert_patient(&conn, &new_patient("Rosa", "Quispe", "45678912"), None).unwrap();
        let mut edit = new_patient("Rosa Elena", "Quispe", "45678912");
        edit.cesareans = 1;
        let updated = update_patient(&conn, &stored.id, &edit).unwrap();
        assert_eq!(updated.first_name, "Rosa Elena");
        assert_eq!(updated.cesareans, 1);
        assert_eq!(updated.created_at, stored.created_at);
    }

    #[test]
    fn update_missing_patient_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_patient(&conn, &Uuid::new_v4(), &new_patient("A", "B", "12345678")).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn count_by_status() {
        let conn = open_memory_database().unwrap();
        let p = insert_patient(&conn, &new_patient("Rosa", "Quispe", "45678912"), None).unwrap();
        insert_patient(&conn, &new_patient("Ana", "Mamani", "11223344"), None).unwrap();
        set_patient_status(&conn, &p.id, PatientStatus::Inactive).unwrap();
        assert_eq!(count_patients(&conn, None).unwrap(), 2);
        assert_eq!(count_patients(&conn, Some(PatientStatus::Active)).unwrap(), 1);
    }
}
