use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

const CONSULTATION_COLUMNS: &str = "id, patient_id, staff_id, consulted_at, consultation_type,
     motive, diagnosis, instructions, weight_kg, height_cm, blood_pressure, heart_rate,
     temperature_c, uterine_height_cm, fetal_heart_rate, created_at";

pub fn insert_consultation(
    conn: &Connection,
    input: &NewConsultation,
    staff_id: Uuid,
) -> Result<Consultation, DatabaseError> {
    let now = now_utc();
    let consultation = Consultation {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        staff_id,
        consulted_at: input.consulted_at.unwrap_or(now),
        consultation_type: input.consultation_type,
        motive: input.motive.trim().to_string(),
        diagnosis: input.diagnosis.clone(),
        instructions: input.instructions.clone(),
        vitals: input.vitals.clone(),
        created_at: now,
    };

    let v = &consultation.vitals;
    conn.execute(
        "INSERT INTO consultations (id, patient_id, staff_id, consulted_at, consultation_type,
         motive, diagnosis, instructions, weight_kg, height_cm, blood_pressure, heart_rate,
         temperature_c, uterine_height_cm, fetal_heart_rate, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            consultation.id.to_string(),
            consultation.patient_id.to_string(),
            consultation.staff_id.to_string(),
            format_timestamp(&consultation.consulted_at),
            consultation.consultation_type.as_str(),
            consultation.motive,
            consultation.diagnosis,
            consultation.instructions,
            v.weight_kg,
            v.height_cm,
            v.blood_pressure,
            v.heart_rate,
            v.temperature_c,
            v.uterine_height_cm,
            v.fetal_heart_rate,
            format_timestamp(&consultation.created_at),
        ],
    )?;
    // Re-read so the returned timestamps carry storage precision.
    require_consultation(conn, &consultation.id)
}

pub fn get_consultation(conn: &Connection, id: &Uuid) -> Result<Option<Consultation>, DatabaseError> {
    let sql = format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id.to_string()], read_consultation_row) {
        Ok(row) => Ok(Some(consultation_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn require_consultation(conn: &Connection, id: &Uuid) -> Result<Consultation, DatabaseError> {
    get_consultation(conn, id)?.ok_or_else(|| DatabaseError::not_found("consultation", id))
}

/// Newest first.
pub fn list_consultations(
    conn: &Connection,
    filter: &ConsultationFilter,
) -> Result<Vec<Consultation>, DatabaseError> {
    let mut sql = format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE 1=1");
    let mut values: Vec<String> = Vec::new();

    if let Some(patient_id) = filter.patient_id {
        values.push(patient_id.to_string());
        sql.push_str(&format!(" AND patient_id = ?{}", values.len()));
    }
    if let Some(staff_id) = filter.staff_id {
        values.push(staff_id.to_string());
        sql.push_str(&format!(" AND staff_id = ?{}", values.len()));
    }
    if let Some(from) = filter.from {
        values.push(format_timestamp(&from));
        sql.push_str(&format!(" AND consulted_at >= ?{}", values.len()));
    }
    if let Some(to) = filter.to {
        values.push(format_timestamp(&to));
        sql.push_str(&format!(" AND consulted_at < ?{}", values.len()));
    }
    sql.push_str(" ORDER BY consulted_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(values.iter()), read_consultation_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(consultation_from_row).collect()
}

/// Overwrites the clinical content. Patient and staff links never change.
pub fn update_consultation(
    conn: &Connection,
    id: &Uuid,
    input: &NewConsultation,
) -> Result<Consultation, DatabaseError> {
    let existing = require_consultation(conn, id)?;
    let v = &input.vitals;
    conn.execute(
        "UPDATE consultations SET consulted_at = ?2, consultation_type = ?3, motive = ?4,
         diagnosis = ?5, instructions = ?6, weight_kg = ?7, height_cm = ?8, blood_pressure = ?9,
         heart_rate = ?10, temperature_c = ?11, uterine_height_cm = ?12, fetal_heart_rate = ?13
         WHERE id = ?1",
        params![
            id.to_string(),
            format_timestamp(&input.consulted_at.unwrap_or(existing.consulted_at)),
            input.consultation_type.as_str(),
            input.motive.trim(),
            input.diagnosis,
            input.instructions,
            v.weight_kg,
            v.height_cm,
            v.blood_pressure,
            v.heart_rate,
            v.temperature_c,
            v.uterine_height_cm,
            v.fetal_heart_rate,
        ],
    )?;
    require_consultation(conn, id)
}

pub fn delete_consultation(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM consultations WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("consultation", id));
    }
    Ok(())
}

pub fn count_consultations_since(
    conn: &Connection,
    since: &chrono::DateTime<chrono::Utc>,
) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM consultations WHERE consulted_at >= ?1",
        params![format_timestamp(since)],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(count)
}

struct ConsultationRow {
    id: String,
    patient_id: String,
    staff_id: String,
    consulted_at: String,
    consultation_type: String,
    motive: String,
    diagnosis: Option<String>,
    instructions: Option<String>,
    vitals: Vitals,
    created_at: String,
}

fn read_consultation_row(row: &Row<'_>) -> rusqlite::Result<ConsultationRow> {
    Ok(ConsultationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        staff_id: row.get(2)?,
        consulted_at: row.get(3)?,
        consultation_type: row.get(4)?,
        motive: row.get(5)?,
        diagnosis: row.get(6)?,
        instructions: row.get(7)?,
        vitals: Vitals {
            weight_kg: row.get(8)?,
            height_cm: row.get(9)?,
            blood_pressure: row.get(10)?,
            heart_rate: row.get(11)?,
            temperature_c: row.get(12)?,
            uterine_height_cm: row.get(13)?,
            fetal_heart_rate: row.get(14)?,
        },
        created_at: row.get(15)?,
    })
}

fn consultation_from_row(row: ConsultationRow) -> Result<Consultation, DatabaseError> {
    Ok(Consultation {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        staff_id: parse_uuid(&row.staff_id)?,
        consulted_at: parse_timestamp(&row.consulted_at)?,
        consultation_type: ConsultationType::from_str(&row.consultation_type)?,
        motive: row.motive,
        diagnosis: row.diagnosis,
        instructions: row.instructions,
        vitals: row.vitals,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
