//! API endpoint handlers.
//!
//! One module per clinic resource. Handlers validate input, then hand
//! the work to the repository layer through `CoreState::with_db`.

pub mod auth;
pub mod consultations;
pub mod deliveries;
pub mod diagnoses;
pub mod health;
pub mod patients;
pub mod programs;
pub mod referrals;
pub mod reports;
pub mod users;

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Parse a path segment as a record id.
pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidArgument(format!("Invalid {entity} ID")))
}

/// Clinic-local calendar date.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Runs CPU-heavy work (password hashing) off the async executor.
pub(crate) async fn run_blocking<T, F>(core: Arc<CoreState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&CoreState) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&core))
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_garbage() {
        let err = parse_id("not-a-uuid", "patient").unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
        assert!(parse_id(&Uuid::new_v4().to_string(), "patient").is_ok());
    }
}
