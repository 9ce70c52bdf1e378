use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

const DELIVERY_COLUMNS: &str = "id, patient_id, patient_name, patient_national_id, delivered_at,
     delivery_type, apgar_1, apgar_5, newborn_weight_g, newborn_height_cm, newborn_sex, notes,
     recorded_by, created_at";

/// Records a delivery. The patient's display name and DNI are copied
/// from the patient record as it is now.
pub fn insert_delivery(
    conn: &Connection,
    input: &NewDelivery,
    patient: &Patient,
    recorded_by: Uuid,
) -> Result<Delivery, DatabaseError> {
    let delivery = Delivery {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        patient_name: patient.full_name(),
        patient_national_id: patient.national_id.clone(),
        delivered_at: input.delivered_at,
        delivery_type: input.delivery_type,
        apgar_1: input.apgar_1,
        apgar_5: input.apgar_5,
        newborn_weight_g: input.newborn_weight_g,
        newborn_height_cm: input.newborn_height_cm,
        newborn_sex: input.newborn_sex,
        notes: input.notes.clone(),
        recorded_by,
        created_at: now_utc(),
    };

    conn.execute(
        "INSERT INTO deliveries (id, patient_id, patient_name, patient_national_id, delivered_at,
         delivery_type, apgar_1, apgar_5, newborn_weight_g, newborn_height_cm, newborn_sex, notes,
         recorded_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            delivery.id.to_string(),
            delivery.patient_id.to_string(),
            delivery.patient_name,
            delivery.patient_national_id,
            format_timestamp(&delivery.delivered_at),
            delivery.delivery_type.as_str(),
            delivery.apgar_1,
            delivery.apgar_5,
            delivery.newborn_weight_g,
            delivery.newborn_height_cm,
            delivery.newborn_sex.as_str(),
            delivery.notes,
            delivery.recorded_by.to_string(),
            format_timestamp(&delivery.created_at),
        ],
    )?;
    require_delivery(conn, &delivery.id)
}

pub fn get_delivery(conn: &Connection, id: &Uuid) -> Result<Option<Delivery>, DatabaseError> {
    let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id.to_string()], read_delivery_row) {
        Ok(row) => Ok(Some(delivery_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn require_delivery(conn: &Connection, id: &Uuid) -> Result<Delivery, DatabaseError> {
    get_delivery(conn, id)?.ok_or_else(|| DatabaseError::not_found("delivery", id))
}

pub fn list_deliveries(conn: &Connection, filter: &DeliveryFilter) -> Result<Vec<Delivery>, DatabaseError> {
    let mut sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE 1=1");
    let mut values: Vec<String> = Vec::new();
    if let Some(patient_id) = filter.patient_id {
        values.push(patient_id.to_string());
        sql.push_str(&format!(" AND patient_id = ?{}", values.len()));
    }
    if let Some(recorded_by) = filter.recorded_by {
        values.push(recorded_by.to_string());
        sql.push_str(&format!(" AND recorded_by = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY delivered_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(values.iter()), read_delivery_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(delivery_from_row).collect()
}

/// Overwrites the delivery and newborn fields. The denormalized patient
/// copy is left as it was written.
pub fn update_delivery(conn: &Connection, id: &Uuid, input: &NewDelivery) -> Result<Delivery, DatabaseError> {
    let updated = conn.execute(
        "UPDATE deliveries SET delivered_at = ?2, delivery_type = ?3, apgar_1 = ?4, apgar_5 = ?5,
         newborn_weight_g = ?6, newborn_height_cm = ?7, newborn_sex = ?8, notes = ?9
         WHERE id = ?1",
        params![
            id.to_string(),
            format_timestamp(&input.delivered_at),
            input.delivery_type.as_str(),
            input.apgar_1,
            input.apgar_5,
            input.newborn_weight_g,
            input.newborn_height_cm,
            input.newborn_sex.as_str(),
            input.notes,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("delivery", id));
    }
    require_delivery(conn, id)
}

pub fn delete_delivery(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM deliveries WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("delivery", id));
    }
    Ok(())
}

pub fn count_deliveries(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM deliveries", [], |row| row.get::<_, u32>(0))?)
}

struct DeliveryRow {
    id: String,
    patient_id: String,
    patient_name: String,
    patient_national_id: String,
    delivered_at: String,
    delivery_type: String,
    apgar_1: u8,
    apgar_5: u8,
    newborn_weight_g: u32,
    newborn_height_cm: f64,
    newborn_sex: String,
    notes: Option<String>,
    recorded_by: String,
    created_at: String,
}

fn read_delivery_row(row: &Row<'_>) -> rusqlite::Result<DeliveryRow> {
    Ok(DeliveryRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        patient_national_id: row.get(3)?,
        delivered_at: row.get(4)?,
        delivery_type: row.get(5)?,
        apgar_1: row.get(6)?,
        apgar_5: row.get(7)?,
        newborn_weight_g: row.get(8)?,
        newborn_height_cm: row.get(9)?,
        newborn_sex: row.get(10)?,
        notes: row.get(11)?,
        recorded_by: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn delivery_from_row(row: DeliveryRow) -> Result<Delivery, DatabaseError> {
    Ok(Delivery {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        patient_name: row.patient_name,
        patient_national_id: row.patient_national_id,
        delivered_at: parse_timestamp(&row.delivered_at)?,
        delivery_type: DeliveryType::from_str(&row.delivery_type)?,
        apgar_1: row.apgar_1,
        apgar_5: row.apgar_5,
        newborn_weight_g: row.newborn_weight_g,
        newborn_height_cm: row.newborn_height_cm,
        newborn_sex: NewbornSex::from_str(&row.newborn_sex)?,
        notes: row.notes,
        recorded_by: parse_uuid(&row.recorded_by)?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
