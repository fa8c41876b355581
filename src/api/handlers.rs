use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

use crate::api::models::HealthResponse;
use crate::github::PushEvent;
use crate::pipeline::{Pipeline, RunOutcome};
use crate::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub settings: crate::config::Settings,
}

/// POST /saas/github/webhook - run the pipeline for a merge/push event
pub async fn github_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PushEvent>,
) -> Result<&'static str> {
    info!(
        "Webhook received for {}/{} ({})",
        payload.repository.owner.login, payload.repository.name, payload.ref_name
    );

    match state.pipeline.run(&payload).await? {
        RunOutcome::Completed(report) => {
            info!(
                "Run {} finished: {} files uploaded, page {} at version {}",
                report.run_id, report.files_uploaded, report.page_id, report.page_version
            );
        }
        RunOutcome::AlreadyPublished { before, after } => {
            info!("Delivery for {}..{} already published", before, after);
        }
    }

    Ok("success")
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
