//! Privileged staff-account operations.
//!
//! `create_user` and `update_user` are the only operations that enforce a
//! role server-side: the caller's own profile is read from the database
//! and must carry the admin role. Errors carry the callable-function codes
//! the client understands (`unauthenticated`, `permission-denied`,
//! `invalid-argument`, `already-exists`, `internal`).

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core_state::CoreError;
use crate::crypto::{self, CryptoError};
use crate::db::repository::{
    count_users, find_user_by_email, get_password_hash, get_user, insert_user_with_credentials,
    set_password_hash, update_user_profile, NewStaffUser, StaffUserChanges,
};
use crate::db::DatabaseError;
use crate::models::{Role, Shift, StaffUser};
use crate::validation::{validate_account, ValidationErrors, MAX_NAME_LEN, MIN_PASSWORD_LEN};

#[derive(Error, Debug)]
pub enum CallableError {
    #[error("The function must be called while authenticated")]
    Unauthenticated,

    #[error("Only administrators can manage staff accounts")]
    PermissionDenied,

    #[error("Invalid argument: {0}")]
    InvalidArgument(ValidationErrors),

    #[error("An account with e-mail {0} already exists")]
    AlreadyExists(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CallableError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission-denied",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::AlreadyExists(_) => "already-exists",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<DatabaseError> for CallableError {
    fn from(err: DatabaseError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CryptoError> for CallableError {
    fn from(err: CryptoError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CoreError> for CallableError {
    fn from(err: CoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Success payload of a callable function.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallableResult {
    pub status: &'static str,
    pub message: String,
    pub uid: Uuid,
}

impl CallableResult {
    fn success(message: impl Into<String>, uid: Uuid) -> Self {
        Self {
            status: "success",
            message: message.into(),
            uid,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default = "default_shift")]
    pub shift: Shift,
    pub branch: String,
}

fn default_shift() -> Shift {
    Shift::Morning
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    #[serde(default)]
    pub uid: Option<Uuid>,
    /// Empty or absent leaves the password unchanged.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub shift: Option<Shift>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// The caller must be signed in and their stored profile must be an
/// active admin.
fn require_admin(conn: &Connection, caller: Option<Uuid>) -> Result<StaffUser, CallableError> {
    let uid = caller.ok_or(CallableError::Unauthenticated)?;
    match get_user(conn, &uid)? {
        Some(user) if user.active && user.is_admin() => Ok(user),
        _ => {
            tracing::warn!(caller = %uid, "account management denied");
            Err(CallableError::PermissionDenied)
        }
    }
}

/// `crearUsuario`: creates credentials and profile for a new staff member.
pub fn create_user(
    conn: &mut Connection,
    caller: Option<Uuid>,
    input: &CreateUserInput,
    iterations: u32,
) -> Result<CallableResult, CallableError> {
    let admin = require_admin(conn, caller)?;
    validate_account(&input.email, &input.display_name, &input.branch, &input.password)
        .map_err(CallableError::InvalidArgument)?;

    if find_user_by_email(conn, &input.email)?.is_some() {
        return Err(CallableError::AlreadyExists(input.email.trim().to_lowercase()));
    }

    let hash = crypto::hash_password(&input.password, iterations)?;
    let profile = NewStaffUser {
        email: input.email.clone(),
        display_name: input.display_name.clone(),
        role: input.role,
        shift: input.shift,
        branch: input.branch.clone(),
    };
    let user = insert_user_with_credentials(conn, &profile, &hash).map_err(|e| {
        if e.is_unique_violation() {
            CallableError::AlreadyExists(profile.email.trim().to_lowercase())
        } else {
            CallableError::from(e)
        }
    })?;

    tracing::info!(uid = %user.uid, role = %user.role, by = %admin.uid, "staff account created");
    Ok(CallableResult::success(
        format!("Usuario {} creado correctamente", user.email),
        user.uid,
    ))
}

/// `actualizarUsuario`: changes password, role and profile fields.
pub fn update_user(
    conn: &Connection,
    caller: Option<Uuid>,
    input: &UpdateUserInput,
    iterations: u32,
) -> Result<CallableResult, CallableError> {
    let admin = require_admin(conn, caller)?;

    let uid = input.uid.ok_or_else(|| invalid("uid", "is required"))?;
    let mut errors = ValidationErrors::default();
    let password = input.password.as_deref().filter(|p| !p.is_empty());
    if password.is_some_and(|p| p.chars().count() < MIN_PASSWORD_LEN) {
        errors.push("password", format!("must be at least {MIN_PASSWORD_LEN} characters"));
    }
    for (field, value) in [("display_name", &input.display_name), ("branch", &input.branch)] {
        let Some(value) = value else { continue };
        let len = value.trim().chars().count();
        if len == 0 {
            errors.push(field, "must not be empty");
        } else if len > MAX_NAME_LEN {
            errors.push(field, format!("must be at most {MAX_NAME_LEN} characters"));
        }
    }
    errors.into_result().map_err(CallableError::InvalidArgument)?;

    if get_user(conn, &uid)?.is_none() {
        return Err(invalid("uid", "does not match any account"));
    }

    if let Some(p) = password {
        let hash = crypto::hash_password(p, iterations)?;
        set_password_hash(conn, &uid, &hash)?;
    }
    let changes = StaffUserChanges {
        display_name: input.display_name.clone(),
        role: input.role,
        shift: input.shift,
        branch: input.branch.clone(),
        active: input.active,
    };
    let user = update_user_profile(conn, &uid, &changes)?;

    tracing::info!(
        uid = %user.uid,
        role = %user.role,
        active = user.active,
        password_changed = password.is_some(),
        by = %admin.uid,
        "staff account updated"
    );
    Ok(CallableResult::success(
        format!("Usuario {} actualizado correctamente", user.email),
        user.uid,
    ))
}

fn invalid(field: &'static str, message: &str) -> CallableError {
    CallableError::InvalidArgument(ValidationErrors::single(field, message))
}

/// Checks a login. `Ok(None)` covers unknown e-mail, wrong password and
/// deactivated accounts alike.
pub fn verify_credentials(
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<Option<StaffUser>, CallableError> {
    let Some(user) = find_user_by_email(conn, email)? else {
        return Ok(None);
    };
    let Some(hash) = get_password_hash(conn, &user.uid)? else {
        return Ok(None);
    };
    if !crypto::verify_password(password, &hash)? || !user.active {
        return Ok(None);
    }
    Ok(Some(user))
}

/// Creates the configured administrator when no account exists yet.
pub fn bootstrap_admin(conn: &mut Connection, config: &AppConfig) -> Result<Option<StaffUser>, CallableError> {
    let Some(admin) = &config.bootstrap_admin else {
        return Ok(None);
    };
    if count_users(conn)? > 0 {
        return Ok(None);
    }
    validate_account(&admin.email, &admin.display_name, "Central", &admin.password)
        .map_err(CallableError::InvalidArgument)?;

    let hash = crypto::hash_password(&admin.password, config.password_iterations)?;
    let user = insert_user_with_credentials(
        conn,
        &NewStaffUser {
            email: admin.email.clone(),
            display_name: admin.display_name.clone(),
            role: Role::Admin,
            shift: Shift::Morning,
            branch: "Central".into(),
        },
        &hash,
    )?;
    tracing::info!(uid = %user.uid, email = %user.email, "bootstrap administrator created");
    Ok(Some(user))
}
