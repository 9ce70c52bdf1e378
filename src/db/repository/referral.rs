use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

const REFERRAL_COLUMNS: &str = "id, patient_id, patient_name, patient_national_id, specialty,
     reason, priority, status, referred_by, created_at, updated_at";

pub fn insert_referral(
    conn: &Connection,
    input: &NewReferral,
    patient: &Patient,
    referred_by: Uuid,
) -> Result<Referral, DatabaseError> {
    let now = now_utc();
    let referral = Referral {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        patient_name: patient.full_name(),
        patient_national_id: patient.national_id.clone(),
        specialty: input.specialty.trim().to_string(),
        reason: input.reason.trim().to_string(),
        priority: input.priority,
        status: ReferralStatus::Pending,
        referred_by,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO referrals (id, patient_id, patient_name, patient_national_id, specialty,
         reason, priority, status, referred_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            referral.id.to_string(),
            referral.patient_id.to_string(),
            referral.patient_name,
            referral.patient_national_id,
            referral.specialty,
            referral.reason,
            referral.priority.as_str(),
            referral.status.as_str(),
            referral.referred_by.to_string(),
            format_timestamp(&referral.created_at),
            format_timestamp(&referral.updated_at),
        ],
    )?;
    Ok(referral)
}

pub fn get_referral(conn: &Connection, id: &Uuid) -> Result<Option<Referral>, DatabaseError> {
    let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id.to_string()], read_referral_row) {
        Ok(row) => Ok(Some(referral_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn require_referral(conn: &Connection, id: &Uuid) -> Result<Referral, DatabaseError> {
    get_referral(conn, id)?.ok_or_else(|| DatabaseError::not_found("referral", id))
}

/// Urgent first, then newest.
pub fn list_referrals(conn: &Connection, filter: &ReferralFilter) -> Result<Vec<Referral>, DatabaseError> {
    let mut sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE 1=1");
    let mut values: Vec<String> = Vec::new();
    if let Some(status) = filter.status {
        values.push(status.as_str().to_string());
        sql.push_str(&format!(" AND status = ?{}", values.len()));
    }
    if let Some(priority) = filter.priority {
        values.push(priority.as_str().to_string());
        sql.push_str(&format!(" AND priority = ?{}", values.len()));
    }
    if let Some(referred_by) = filter.referred_by {
        values.push(referred_by.to_string());
        sql.push_str(&format!(" AND referred_by = ?{}", values.len()));
    }
    sql.push_str(
        " ORDER BY CASE priority WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
          created_at DESC",
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(values.iter()), read_referral_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(referral_from_row).collect()
}

pub fn update_referral(conn: &Connection, id: &Uuid, input: &NewReferral) -> Result<Referral, DatabaseError> {
    let updated = conn.execute(
        "UPDATE referrals SET specialty = ?2, reason = ?3, priority = ?4, updated_at = ?5 WHERE id = ?1",
        params![
            id.to_string(),
            input.specialty.trim(),
            input.reason.trim(),
            input.priority.as_str(),
            format_timestamp(&now_utc()),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("referral", id));
    }
    require_referral(conn, id)
}

pub fn set_referral_status(
    conn: &Connection,
    id: &Uuid,
    status: ReferralStatus,
) -> Result<Referral, DatabaseError> {
    let updated = conn.execute(
        "UPDATE referrals SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), format_timestamp(&now_utc())],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("referral", id));
    }
    require_referral(conn, id)
}

pub fn count_referrals(conn: &Connection, status: ReferralStatus) -> Result<u32, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM referrals WHERE status = ?1",
        params![status.as_str()],
        |row| row.get::<_, u32>(0),
    )?)
}

struct ReferralRow {
    id: String,
    patient_id: String,
    patient_name: String,
    patient_national_id: String,
    specialty: String,
    reason: String,
    priority: String,
    status: String,
    referred_by: String,
    created_at: String,
    updated_at: String,
}

fn read_referral_row(row: &Row<'_>) -> rusqlite::Result<ReferralRow> {
    Ok(ReferralRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        patient_national_id: row.get(3)?,
        specialty: row.get(4)?,
        reason: row.get(5)?,
        priority: row.get(6)?,
        status: row.get(7)?,
        referred_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn referral_from_row(row: ReferralRow) -> Result<Referral, DatabaseError> {
    Ok(Referral {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        patient_name: row.patient_name,
        patient_national_id: row.patient_national_id,
        specialty: row.specialty,
        reason: row.reason,
        priority: ReferralPriority::from_str(&row.priority)?,
        status: ReferralStatus::from_str(&row.status)?,
        referred_by: parse_uuid(&row.referred_by)?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
