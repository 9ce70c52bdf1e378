use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

const USER_COLUMNS: &str =
    "uid, email, display_name, role, shift, branch, active, created_at, updated_at";

/// Profile fields for a new staff account.
#[derive(Debug, Clone)]
pub struct NewStaffUser {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub shift: Shift,
    pub branch: String,
}

/// Creates the profile record and its credential row in one transaction.
pub fn insert_user_with_credentials(
    conn: &mut Connection,
    input: &NewStaffUser,
    password_hash: &str,
) -> Result<StaffUser, DatabaseError> {
    let now = now_utc();
    let user = StaffUser {
        uid: Uuid::new_v4(),
        email: normalize_email(&input.email),
        display_name: input.display_name.trim().to_string(),
        role: input.role,
        shift: input.shift,
        branch: input.branch.trim().to_string(),
        active: true,
        created_at: now,
        updated_at: now,
    };

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (uid, email, display_name, role, shift, branch, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8)",
        params![
            user.uid.to_string(),
            user.email,
            user.display_name,
            user.role.as_str(),
            user.shift.as_str(),
            user.branch,
            format_timestamp(&user.created_at),
            format_timestamp(&user.updated_at),
        ],
    )?;
    tx.execute(
        "INSERT INTO credentials (uid, password_hash, updated_at) VALUES (?1, ?2, ?3)",
        params![user.uid.to_string(), password_hash, format_timestamp(&now)],
    )?;
    tx.commit()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, uid: &Uuid) -> Result<Option<StaffUser>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1");
    let row = conn
        .query_row(&sql, params![uid.to_string()], read_user_row)
        .optional()?;
    row.map(user_from_row).transpose()
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<StaffUser>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let row = conn
        .query_row(&sql, params![normalize_email(email)], read_user_row)
        .optional()?;
    row.map(user_from_row).transpose()
}

pub fn list_users(conn: &Connection) -> Result<Vec<StaffUser>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY display_name COLLATE NOCASE");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], read_user_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(user_from_row).collect()
}

pub fn count_users(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, u32>(0))?)
}

/// Field-level profile changes. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct StaffUserChanges {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub shift: Option<Shift>,
    pub branch: Option<String>,
    pub active: Option<bool>,
}

pub fn update_user_profile(
    conn: &Connection,
    uid: &Uuid,
    changes: &StaffUserChanges,
) -> Result<StaffUser, DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET
            display_name = COALESCE(?2, display_name),
            role = COALESCE(?3, role),
            shift = COALESCE(?4, shift),
            branch = COALESCE(?5, branch),
            active = COALESCE(?6, active),
            updated_at = ?7
         WHERE uid = ?1",
        params![
            uid.to_string(),
            changes.display_name.as_deref().map(str::trim),
            changes.role.map(|r| r.as_str()),
            changes.shift.map(|s| s.as_str()),
            changes.branch.as_deref().map(str::trim),
            changes.active,
            format_timestamp(&now_utc()),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("user", uid));
    }
    get_user(conn, uid)?.ok_or_else(|| DatabaseError::not_found("user", uid))
}

pub fn get_password_hash(conn: &Connection, uid: &Uuid) -> Result<Option<String>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT password_hash FROM credentials WHERE uid = ?1",
            params![uid.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?)
}

pub fn set_password_hash(conn: &Connection, uid: &Uuid, password_hash: &str) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE credentials SET password_hash = ?2, updated_at = ?3 WHERE uid = ?1",
        params![uid.to_string(), password_hash, format_timestamp(&now_utc())],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("credentials", uid));
    }
    Ok(())
}

/// E-mail addresses are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

struct UserRow {
    uid: String,
    email: String,
    display_name: String,
    role: String,
    shift: String,
    branch: String,
    active: i32,
    created_at: String,
    updated_at: String,
}

fn read_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        uid: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        role: row.get(3)?,
        shift: row.get(4)?,
        branch: row.get(5)?,
        active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn user_from_row(row: UserRow) -> Result<StaffUser, DatabaseError> {
    Ok(StaffUser {
        uid: parse_uuid(&row.uid)?,
        email: row.email,
        display_name: row.display_name,
        role: Role::from_str(&row.role)?,
        shift: Shift::from_str(&row.shift)?,
        branch: row.branch,
        active: row.active != 0,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn staff(email: &str, role: Role) -> NewStaffUser {
        NewStaffUser {
            email: email.into(),
            display_name: "Obst. Carmen Rojas".into(),
            role,
            shift: Shift::Morning,
            branch: "Central".into(),
        }
    }

    #[test]
    fn insert_creates_profile_and_credentials() {
        let mut conn = open_memory_database().unwrap();
        let user = insert_user_with_credentials(&mut conn, &staff("Carmen@Clinica.pe ", Role::Obstetrician), "hash")
            .unwrap();
        assert_eq!(user.email, "carmen@clinica.pe");
        assert!(user.active);

        let found = find_user_by_email(&conn, "CARMEN@clinica.pe").unwrap().unwrap();
        assert_eq!(found.uid, user.uid);
        assert_eq!(get_password_hash(&conn, &user.uid).unwrap().as_deref(), Some("hash"));
    }

    #[test]
    fn duplicate_email_rolls_back() {
        let mut conn = open_memory_database().unwrap();
        insert_user_with_credentials(&mut conn, &staff("carmen@clinica.pe", Role::Admin), "hash").unwrap();
        let err = insert_user_with_credentials(&mut conn, &staff("carmen@clinica.pe", Role::Admin), "hash")
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(count_users(&conn).unwrap(), 1);
        let creds: u32 = conn
            .query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))
            .unwrap();
        assert_eq!(creds, 1);
    }

    #[test]
    fn partial_profile_update_keeps_other_fields() {
        let mut conn = open_memory_database().unwrap();
        let user = insert_user_with_credentials(&mut conn, &staff("carmen@clinica.pe", Role::Obstetrician), "hash")
            .unwrap();
        let updated = update_user_profile(
            &conn,
            &user.uid,
            &StaffUserChanges {
                role: Some(Role::Admin),
                shift: Some(Shift::Night),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.shift, Shift::Night);
        assert_eq!(updated.display_name, "Obst. Carmen Rojas");
        assert_eq!(updated.branch, "Central");
    }

    #[test]
    fn password_hash_replacement() {
        let mut conn = open_memory_database().unwrap();
        let user = insert_user_with_credentials(&mut conn, &staff("carmen@clinica.pe", Role::Admin), "old").unwrap();
        set_password_hash(&conn, &user.uid, "new").unwrap();
        assert_eq!(get_password_hash(&conn, &user.uid).unwrap().as_deref(), Some("new"));
        assert!(set_password_hash(&conn, &Uuid::new_v4(), "x").is_err());
    }

    #[test]
    fn list_users_sorted_by_name() {
        let mut conn = open_memory_database().unwrap();
        let mut b = staff("b@clinica.pe", Role::Obstetrician);
        b.display_name = "Beatriz".into();
        let mut a = staff("a@clinica.pe", Role::Obstetrician);
        a.display_name = "alicia".into();
        insert_user_with_credentials(&mut conn, &b, "h").unwrap();
        insert_user_with_credentials(&mut conn, &a, "h").unwrap();
        let users = list_users(&conn).unwrap();
        assert_eq!(users[0].display_name, "alicia");
    }
}
