use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::attempts::{DEFAULT_LOCKOUT_SECS, DEFAULT_MAX_ATTEMPTS};
use crate::crypto::PBKDF2_ITERATIONS;

/// Application-level constants
pub const APP_NAME: &str = "Obstetrix";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_PREFIX: &str = "OBSTETRIX_";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8640";
pub const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;
pub const DEFAULT_CLINIC_NAME: &str = "Centro Obstétrico";
pub const DEFAULT_ADMIN_NAME: &str = "Administrador";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Cannot determine home directory; set {ENV_PREFIX}DATA_DIR")]
    NoHomeDir,
}

/// Credentials for the first administrator, created only when the
/// users table is empty.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub session_ttl_secs: i64,
    pub max_login_attempts: u32,
    pub lockout_secs: i64,
    pub password_iterations: u32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub clinic_name: String,
}

impl AppConfig {
    /// Reads `OBSTETRIX_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Keys carry the full
    /// `OBSTETRIX_` prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = match get("DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => app_data_dir()?,
        };
        let database_path = get("DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("obstetrix.db"));

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), || {
            DEFAULT_BIND_ADDR.parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}BIND_ADDR"),
                value: DEFAULT_BIND_ADDR.into(),
            })
        })?;
        let session_ttl_secs = positive("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), DEFAULT_SESSION_TTL_SECS)?;
        let max_login_attempts = positive("MAX_LOGIN_ATTEMPTS", get("MAX_LOGIN_ATTEMPTS"), DEFAULT_MAX_ATTEMPTS)?;
        let lockout_secs = positive("LOCKOUT_SECS", get("LOCKOUT_SECS"), DEFAULT_LOCKOUT_SECS)?;
        let password_iterations = positive("PASSWORD_ITERATIONS", get("PASSWORD_ITERATIONS"), PBKDF2_ITERATIONS)?;

        let bootstrap_admin = match (get("ADMIN_EMAIL"), lookup(&format!("{ENV_PREFIX}ADMIN_PASSWORD"))) {
            (Some(email), Some(password)) if !password.is_empty() => Some(BootstrapAdmin {
                email,
                password,
                display_name: get("ADMIN_NAME").unwrap_or_else(|| DEFAULT_ADMIN_NAME.into()),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            data_dir,
            database_path,
            session_ttl_secs,
            max_login_attempts,
            lockout_secs,
            password_iterations,
            bootstrap_admin,
            clinic_name: get("CLINIC_NAME").unwrap_or_else(|| DEFAULT_CLINIC_NAME.into()),
        })
    }

    /// Config for tests and embedded use: everything default, data under
    /// `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8640)),
            database_path: data_dir.join("obstetrix.db"),
            data_dir,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_login_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
            password_iterations: PBKDF2_ITERATIONS,
            bootstrap_admin: None,
            clinic_name: DEFAULT_CLINIC_NAME.into(),
        }
    }
}

fn parse_or<T, D>(name: &str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    D: FnOnce() -> Result<T, ConfigError>,
{
    match raw {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{name}"),
            value,
        }),
        None => default(),
    }
}

fn positive<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let value = parse_or(name, raw.clone(), || Ok(default))?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{name}"),
            value: raw.unwrap_or_default(),
        });
    }
    Ok(value)
}

/// Get the application data directory
/// ~/Obstetrix/ unless overridden
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "obstetrix_lib=info,obstetrix=info,tower_http=info"
}
