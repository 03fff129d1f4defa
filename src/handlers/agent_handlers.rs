use crate::agent::LogLevel;
use crate::app_state::AppState;
use axum::extract::State;
use serde_json::json;
use tracing::{error, info};

pub async fn check_now_handler(State(app_state): State<AppState>) -> String {
    run_check_job(app_state);

    "Job started".to_string()
}

/// Runs one check cycle on a spawned task. The outcome lands in the agent
/// log either way, which is what the liveness check reads.
pub fn run_check_job(app_state: AppState) {
    tokio::spawn(async move {
        info!("Starting job to check statements.");

        match app_state.agent.check().await {
            Ok(outcome) => {
                info!("Check finished, {} events emitted.", outcome.events_emitted);
                if let Err(e) = app_state.agent.logs.append(
                    LogLevel::Info,
                    format!("check finished, {} events emitted", outcome.events_emitted),
                ) {
                    error!("Error writing agent log: {:#?}", e);
                }
            }
            Err(e) => {
                error!("Error checking statements: {:#?}", e);
                if let Err(log_err) = app_state
                    .agent
                    .logs
                    .append(LogLevel::Error, e.to_string())
                {
                    error!("Error writing agent log: {:#?}", log_err);
                }
            }
        }
    });
}

pub async fn status_handler(State(app_state): State<AppState>) -> String {
    serde_json::to_string_pretty(&json!({ "working": app_state.agent.working() })).unwrap()
}

pub async fn list_logs_handler(State(app_state): State<AppState>) -> String {
    serde_json::to_string_pretty(&app_state.agent.logs.data()).unwrap()
}
