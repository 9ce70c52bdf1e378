use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

// ═══════════════════════════════════════════
// Programs
// ═══════════════════════════════════════════

pub fn insert_program(conn: &Connection, input: &NewProgram) -> Result<Program, DatabaseError> {
    let program = Program {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        description: input.description.clone(),
        status: input.status,
        created_at: now_utc(),
    };
    conn.execute(
        "INSERT INTO programs (id, name, description, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            program.id.to_string(),
            program.name,
            program.description,
            program.status.as_str(),
            format_timestamp(&program.created_at),
        ],
    )?;
    Ok(program)
}

pub fn get_program(conn: &Connection, id: &Uuid) -> Result<Option<Program>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, status, created_at FROM programs WHERE id = ?1",
    )?;
    match stmt.query_row(params![id.to_string()], read_program_row) {
        Ok(row) => Ok(Some(program_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn require_program(conn: &Connection, id: &Uuid) -> Result<Program, DatabaseError> {
    get_program(conn, id)?.ok_or_else(|| DatabaseError::not_found("program", id))
}

pub fn list_programs(conn: &Connection, status: Option<ProgramStatus>) -> Result<Vec<Program>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, status, created_at FROM programs
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY name COLLATE NOCASE",
    )?;
    let rows = stmt
        .query_map(params![status.map(|s| s.as_str())], read_program_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(program_from_row).collect()
}

pub fn update_program(conn: &Connection, id: &Uuid, input: &NewProgram) -> Result<Program, DatabaseError> {
    let updated = conn.execute(
        "UPDATE programs SET name = ?2, description = ?3, status = ?4 WHERE id = ?1",
        params![id.to_string(), input.name.trim(), input.description, input.status.as_str()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("program", id));
    }
    require_program(conn, id)
}

type ProgramRow = (String, String, Option<String>, String, String);

fn read_program_row(row: &Row<'_>) -> rusqlite::Result<ProgramRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn program_from_row((id, name, description, status, created_at): ProgramRow) -> Result<Program, DatabaseError> {
    Ok(Program {
        id: parse_uuid(&id)?,
        name,
        description,
        status: ProgramStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

// ═══════════════════════════════════════════
// Enrollments
// ═══════════════════════════════════════════

const ENROLLMENT_COLUMNS: &str =
    "id, program_id, program_name, patient_id, patient_name, stage, notes, enrolled_at";

pub fn insert_enrollment(
    conn: &Connection,
    program: &Program,
    patient: &Patient,
    input: &NewEnrollment,
) -> Result<Enrollment, DatabaseError> {
    let enrollment = Enrollment {
        id: Uuid::new_v4(),
        program_id: program.id,
        program_name: program.name.clone(),
        patient_id: patient.id,
        patient_name: patient.full_name(),
        stage: input.stage,
        notes: input.notes.clone(),
        enrolled_at: now_utc(),
    };
    conn.execute(
        "INSERT INTO enrollments (id, program_id, program_name, patient_id, patient_name, stage, notes, enrolled_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            enrollment.id.to_string(),
            enrollment.program_id.to_string(),
            enrollment.program_name,
            enrollment.patient_id.to_string(),
            enrollment.patient_name,
            enrollment.stage.as_str(),
            enrollment.notes,
            format_timestamp(&enrollment.enrolled_at),
        ],
    )?;
    Ok(enrollment)
}

pub fn get_enrollment(conn: &Connection, id: &Uuid) -> Result<Option<Enrollment>, DatabaseError> {
    let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id.to_string()], read_enrollment_row) {
        Ok(row) => Ok(Some(enrollment_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_enrollments(conn: &Connection, program_id: &Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE program_id = ?1 ORDER BY enrolled_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![program_id.to_string()], read_enrollment_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(enrollment_from_row).collect()
}

pub fn list_patient_enrollments(conn: &Connection, patient_id: &Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE patient_id = ?1 ORDER BY enrolled_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], read_enrollment_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(enrollment_from_row).collect()
}

pub fn update_enrollment(
    conn: &Connection,
    id: &Uuid,
    input: &EnrollmentUpdate,
) -> Result<Enrollment, DatabaseError> {
    let updated = conn.execute(
        "UPDATE enrollments SET stage = ?2, notes = ?3 WHERE id = ?1",
        params![id.to_string(), input.stage.as_str(), input.notes],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("enrollment", id));
    }
    get_enrollment(conn, id)?.ok_or_else(|| DatabaseError::not_found("enrollment", id))
}

pub fn delete_enrollment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM enrollments WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("enrollment", id));
    }
    Ok(())
}

struct EnrollmentRow {
    id: String,
    program_id: String,
    program_name: String,
    patient_id: String,
    patient_name: String,
    stage: String,
    notes: Option<String>,
    enrolled_at: String,
}

fn read_enrollment_row(row: &Row<'_>) -> rusqlite::Result<EnrollmentRow> {
    Ok(EnrollmentRow {
        id: row.get(0)?,
        program_id: row.get(1)?,
        program_name: row.get(2)?,
        patient_id: row.get(3)?,
        patient_name: row.get(4)?,
        stage: row.get(5)?,
        notes: row.get(6)?,
        enrolled_at: row.get(7)?,
    })
}

fn enrollment_from_row(row: EnrollmentRow) -> Result<Enrollment, DatabaseError> {
    Ok(Enrollment {
        id: parse_uuid(&row.id)?,
        program_id: parse_uuid(&row.program_id)?,
        program_name: row.program_name,
        patient_id: parse_uuid(&row.patient_id)?,
        patient_name: row.patient_name,
        stage: EnrollmentStage::from_str(&row.stage)?,
        notes: row.notes,
        enrolled_at: parse_timestamp(&row.enrolled_at)?,
    })
}
