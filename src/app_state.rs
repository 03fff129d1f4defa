use crate::agent::StatementAgent;

#[derive(Clone)]
pub struct AppState {
    pub agent: StatementAgent,
}
