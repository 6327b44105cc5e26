//! Health check endpoint.

use actix_web::{HttpResponse, web};
use geofeed_core::ports::QueueStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// Audit replication backlog; absent when the queue cannot report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<QueueStats>,
}

/// GET /api/v1/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let jobs = match state.jobs.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!(error = %e, "Job queue stats unavailable");
            None
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        jobs,
    })
}
