use crate::app_state::AppState;
use crate::brave::Overview;
use crate::csv::{StatementCsv, VecToCsv};
use axum::extract::State;

pub async fn list_events_handler(State(app_state): State<AppState>) -> String {
    serde_json::to_string_pretty(&app_state.agent.events.data()).unwrap()
}

pub async fn events_to_csv_handler(State(app_state): State<AppState>) -> String {
    let statements_csv: Vec<StatementCsv> = app_state
        .agent
        .events
        .data()
        .iter()
        // full-mode events wrap the whole payload and have no paymentDate
        .filter_map(|event| serde_json::from_value::<Overview>(event.payload.clone()).ok())
        .map(|overview| StatementCsv::from(&overview))
        .collect();
    statements_csv.to_csv()
}
