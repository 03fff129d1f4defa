//! The agent's own log, one entry per finished or failed check cycle.
//!
//! The liveness check reads this log: an error entry newer than the newest
//! event marks the agent as not working.

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub level: LogLevel,
    pub message: String,
    /// RFC 3339.
    pub created_at: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogLevel {
    #[default]
    Info,
    Error,
}
