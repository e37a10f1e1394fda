/// `GET /health`
///
/// Always answers 200 so load balancers can tell a running process from a
/// dead one; store reachability is reported in the body.
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "database": "connected" }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub version: &'static str,
    pub database: StoreStatus,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    let (status, database) = match state.store.ping().await {
        Ok(()) => (ServiceStatus::Healthy, StoreStatus::Connected),
        Err(e) => {
            tracing::warn!(error = %e, "Store did not answer health probe");
            (ServiceStatus::Degraded, StoreStatus::Disconnected)
        }
    };

    Json(HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
