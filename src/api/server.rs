//! Clinic API server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::api::router::clinic_api_router;
use crate::core_state::CoreState;

/// Handle to a running API server.
pub struct ClinicServer {
    pub local_addr: SocketAddr,
    pub started_at: chrono::DateTime<chrono::Utc>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ClinicServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Clinic API shutdown signal sent");
        }
    }
}

/// Start the API on `addr`. Port 0 binds an ephemeral port; the bound
/// address is in `ClinicServer::local_addr`.
pub async fn start_server_on(core: Arc<CoreState>, addr: SocketAddr) -> Result<ClinicServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let app = clinic_api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Clinic API received shutdown signal");
        };

        tracing::info!(addr = %local_addr, "Clinic API started");

        if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Clinic API server error: {e}");
        }

        tracing::info!("Clinic API stopped");
    });

    Ok(ClinicServer {
        local_addr,
        started_at: chrono::Utc::now(),
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db;

    fn test_core() -> Arc<CoreState> {
        let config = AppConfig::with_data_dir(std::env::temp_dir());
        Arc::new(CoreState::new(config, db::open_memory_database().unwrap()))
    }

    async fn start() -> ClinicServer {
        start_server_on(test_core(), SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("server should start")
    }

    #[tokio::test]
    async fn serves_health_over_http() {
        let mut server = start().await;
        assert!(server.local_addr.port() > 0);

        let url = format!("http://{}/api/health", server.local_addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        server.shutdown();
    }

    #[tokio::test]
    async fn protected_route_rejects_anonymous_client() {
        let mut server = start().await;

        let url = format!("http://{}/api/patients", server.local_addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let url = format!("http://{}/nonexistent", server.local_addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start().await;
        server.shutdown();
        server.shutdown();
    }
}
