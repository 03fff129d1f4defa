use super::db_base::{JsonFileDb, KeyValueFileDb};
use crate::agent::{Event, LogEntry, LogLevel};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

pub type EventsDb = JsonFileDb<Event>;

impl EventsDb {
    pub fn new_events_db() -> Result<Self, Box<dyn std::error::Error>> {
        let res = JsonFileDb::<Event>::new("db/events.json".to_string());
        info!("Events DB initialized.");
        res
    }

    /// Appends one event to the stream, stamping id and creation time.
    pub fn emit(&self, payload: Value) -> Result<Event, Box<dyn std::error::Error>> {
        let event = Event {
            id: self.next_id(),
            created_at: Utc::now().to_rfc3339(),
            payload,
        };
        self.push(event.clone())?;
        Ok(event)
    }
}

pub type LogsDb = JsonFileDb<LogEntry>;

impl LogsDb {
    pub fn new_logs_db() -> Result<Self, Box<dyn std::error::Error>> {
        let res = JsonFileDb::<LogEntry>::new("db/logs.json".to_string());
        info!("Logs DB initialized.");
        res
    }

    pub fn append(
        &self,
        level: LogLevel,
        message: String,
    ) -> Result<(), Box<dyn std::error::Error>> {
        debug!("Agent log [{}]: {}", level, message);
        self.push(LogEntry {
            id: self.next_id(),
            level,
            message,
            created_at: Utc::now().to_rfc3339(),
        })
    }
}

pub type MemoryDb = KeyValueFileDb;

impl MemoryDb {
    pub fn new_memory_db() -> Result<Self, Box<dyn std::error::Error>> {
        let res = KeyValueFileDb::new("db/memory.json".to_string());
        info!("Memory DB initialized.");
        res
    }
}
