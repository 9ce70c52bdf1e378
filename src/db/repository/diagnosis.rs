use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

pub fn insert_diagnosis(
    conn: &Connection,
    patient_id: Uuid,
    input: &NewDiagnosis,
    diagnosed_by: Uuid,
) -> Result<Diagnosis, DatabaseError> {
    let diag = Diagnosis {
        id: Uuid::new_v4(),
        patient_id,
        consultation_id: input.consultation_id,
        cie10_code: input.cie10_code.trim().to_uppercase(),
        description: input.description.trim().to_string(),
        diagnosed_by,
        created_at: now_utc(),
    };
    conn.execute(
        "INSERT INTO diagnoses (id, patient_id, consultation_id, cie10_code, description, diagnosed_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            diag.id.to_string(),
            diag.patient_id.to_string(),
            diag.consultation_id.map(|id| id.to_string()),
            diag.cie10_code,
            diag.description,
            diag.diagnosed_by.to_string(),
            format_timestamp(&diag.created_at),
        ],
    )?;
    Ok(diag)
}

pub fn list_patient_diagnoses(conn: &Connection, patient_id: &Uuid) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, consultation_id, cie10_code, description, diagnosed_by, created_at
         FROM diagnoses WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut diagnoses = Vec::new();
    for row in rows {
        let (id, patient_id, consultation_id, cie10_code, description, diagnosed_by, created_at) = row?;
        diagnoses.push(Diagnosis {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            consultation_id: consultation_id.as_deref().map(parse_uuid).transpose()?,
            cie10_code,
            description,
            diagnosed_by: parse_uuid(&diagnosed_by)?,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    Ok(diagnoses)
}

pub fn delete_diagnosis(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM diagnoses WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("diagnosis", id));
    }
    Ok(())
}
