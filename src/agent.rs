mod event;
mod log;
mod options;

pub use self::event::*;
pub use self::log::*;
pub use self::options::*;

use crate::brave::{Overview, StatementsApi, StatementsPayload};
use crate::db::{EventsDb, KeyValueStore, LogsDb, MemoryDb};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Memory key holding the serialized previous payload.
pub const LAST_STATUS_KEY: &str = "last_status";

pub trait HasId {
    fn id(&self) -> u64;
}

impl HasId for Event {
    fn id(&self) -> u64 {
        self.id
    }
}

impl HasId for LogEntry {
    fn id(&self) -> u64 {
        self.id
    }
}

/// Errors that abort a check cycle. Each one is fatal for the cycle it
/// occurs in: nothing is emitted and the snapshot is left untouched. The
/// next scheduled tick starts over independently.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("statements request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("statements endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("statements response is not valid JSON: {0}")]
    Decode(serde_json::Error),

    #[error("stored snapshot is unreadable: {0}")]
    Snapshot(serde_json::Error),

    #[error("failed to serialize payload: {0}")]
    Serialize(serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub events_emitted: usize,
    pub snapshot_updated: bool,
}

/// What one check cycle decided to do, before anything is written.
struct CheckPlan {
    events: Vec<Value>,
    snapshot: Option<String>,
}

/**
The statement agent itself: fetches the statements payload, emits one event
per unseen overview record (or the whole payload in full mode), and keeps a
serialized snapshot of the previous payload in its memory slot to detect
changes across cycles.
*/
#[derive(Clone)]
pub struct StatementAgent {
    pub options: AgentOptions,
    pub api: StatementsApi,
    pub memory: MemoryDb,
    pub events: EventsDb,
    pub logs: LogsDb,
}

impl StatementAgent {
    pub fn new(
        options: AgentOptions,
        api: StatementsApi,
        memory: MemoryDb,
        events: EventsDb,
        logs: LogsDb,
    ) -> Self {
        Self {
            options,
            api,
            memory,
            events,
            logs,
        }
    }

    /// Runs one check cycle: fetch, diff, emit, store.
    pub async fn check(&self) -> Result<CheckOutcome, Box<dyn std::error::Error>> {
        let payload = self.api.get_statements().await?;

        if boolify(&self.options.debug).unwrap_or(false) {
            debug!("statements payload: {:?}", payload);
        }

        self.apply(payload)
    }

    fn apply(&self, payload: StatementsPayload) -> Result<CheckOutcome, Box<dyn std::error::Error>> {
        let changes_only = boolify(&self.options.changes_only).unwrap_or(true);
        let debug = boolify(&self.options.debug).unwrap_or(false);

        let last_status = self.memory.get(LAST_STATUS_KEY);
        let plan = plan_check(&payload, last_status.as_deref(), changes_only, debug)?;

        for event_payload in &plan.events {
            self.events.emit(event_payload.clone())?;
        }

        let snapshot_updated = plan.snapshot.is_some();
        if let Some(snapshot) = plan.snapshot {
            self.memory.set(LAST_STATUS_KEY, snapshot)?;
        }

        Ok(CheckOutcome {
            events_emitted: plan.events.len(),
            snapshot_updated,
        })
    }

    /// The agent is working when an event was created within the expected
    /// receive period and no error has been logged since that event.
    pub fn working(&self) -> bool {
        let days = self
            .options
            .expected_receive_period_in_days
            .parse::<i64>()
            .unwrap_or(0);
        self.event_created_within(days) && !self.recent_error_logs()
    }

    fn event_created_within(&self, days: i64) -> bool {
        match self.last_event_at() {
            Some(last_event_at) => Utc::now() - Duration::days(days) <= last_event_at,
            None => false,
        }
    }

    fn recent_error_logs(&self) -> bool {
        match (self.last_event_at(), self.last_error_log_at()) {
            (Some(event_at), Some(error_at)) => event_at <= error_at,
            _ => false,
        }
    }

    fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.events
            .data()
            .last()
            .and_then(|event| DateTime::parse_from_rfc3339(&event.created_at).ok())
            .map(|at| at.with_timezone(&Utc))
    }

    fn last_error_log_at(&self) -> Option<DateTime<Utc>> {
        self.logs
            .data()
            .iter()
            .rev()
            .find(|entry| entry.level == LogLevel::Error)
            .and_then(|entry| DateTime::parse_from_rfc3339(&entry.created_at).ok())
            .map(|at| at.with_timezone(&Utc))
    }
}

/// Decides which events to emit and whether to rewrite the snapshot.
/// Pure: reads nothing but its arguments, writes nothing.
fn plan_check(
    payload: &StatementsPayload,
    last_status: Option<&str>,
    changes_only: bool,
    debug: bool,
) -> Result<CheckPlan, AgentError> {
    let serialized = serde_json::to_string(payload).map_err(AgentError::Serialize)?;
    let last_status = last_status.unwrap_or("");

    if !changes_only {
        // full mode always emits the whole payload, once per cycle
        let event = serde_json::to_value(payload).map_err(AgentError::Serialize)?;
        let snapshot = (serialized != last_status).then_some(serialized);
        return Ok(CheckPlan {
            events: vec![event],
            snapshot,
        });
    }

    if serialized == last_status {
        return Ok(CheckPlan {
            events: Vec::new(),
            snapshot: None,
        });
    }

    let events = if last_status.is_empty() {
        // first run: every current overview is new
        payload
            .overviews
            .iter()
            .map(overview_event)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        let previous = parse_snapshot(last_status)?;
        let mut events = Vec::new();
        for overview in &payload.overviews {
            let found = previous
                .overviews
                .iter()
                .any(|prior| prior.payment_date == overview.payment_date);
            if debug {
                debug!("overview {}: found is {}", overview.payment_date, found);
            }
            if !found {
                events.push(overview_event(overview)?);
            }
        }
        events
    };

    Ok(CheckPlan {
        events,
        snapshot: Some(serialized),
    })
}

fn overview_event(overview: &Overview) -> Result<Value, AgentError> {
    serde_json::to_value(overview).map_err(AgentError::Serialize)
}

/// Parses a stored snapshot back into a payload. Snapshots written by this
/// agent are canonical JSON; older slots may still hold hash-inspect text
/// (`"key"=>"value"`, `nil`), which is normalized to JSON before parsing.
fn parse_snapshot(text: &str) -> Result<StatementsPayload, AgentError> {
    if let Ok(payload) = serde_json::from_str(text) {
        return Ok(payload);
    }

    let repaired = text.replace("=>", ": ").replace(": nil", ": null");
    serde_json::from_str(&repaired).map_err(AgentError::Snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{JsonFileDb, KeyValueFileDb};
    use serde_json::json;
    use tempfile::TempDir;

    fn payload(dates: &[&str]) -> StatementsPayload {
        let overviews: Vec<Value> = dates
            .iter()
            .map(|date| json!({ "paymentDate": date, "totalEarned": "482.5" }))
            .collect();
        serde_json::from_value(json!({ "overviews": overviews })).unwrap()
    }

    fn snapshot_of(payload: &StatementsPayload) -> String {
        serde_json::to_string(payload).unwrap()
    }

    fn test_options() -> AgentOptions {
        AgentOptions {
            csrf_token: "token".to_string(),
            publishers_session: "session".to_string(),
            pk_id: "pk".to_string(),
            expected_receive_period_in_days: "31".to_string(),
            changes_only: "true".to_string(),
            debug: "false".to_string(),
        }
    }

    fn test_agent(tmp: &TempDir, options: AgentOptions) -> StatementAgent {
        let path = |name: &str| tmp.path().join(name).to_string_lossy().into_owned();
        let api = StatementsApi::new(&options);
        StatementAgent::new(
            options,
            api,
            KeyValueFileDb::new(path("memory.json")).unwrap(),
            JsonFileDb::new(path("events.json")).unwrap(),
            JsonFileDb::new(path("logs.json")).unwrap(),
        )
    }

    #[test]
    fn first_run_emits_every_overview() {
        let new = payload(&["2020-01-01", "2020-01-02"]);
        let plan = plan_check(&new, None, true, false).unwrap();

        assert_eq!(plan.events.len(), 2);
        assert_eq!(plan.snapshot, Some(snapshot_of(&new)));
    }

    #[test]
    fn identical_payload_is_a_no_op() {
        let new = payload(&["2020-01-01"]);
        let stored = snapshot_of(&new);
        let plan = plan_check(&new, Some(&stored), true, false).unwrap();

        assert!(plan.events.is_empty());
        assert!(plan.snapshot.is_none());
    }

    #[test]
    fn repeated_dates_emit_nothing_but_refresh_the_snapshot() {
        let mut previous = payload(&["2020-01-01", "2020-01-02"]);
        previous.overviews[0]
            .rest
            .insert("totalEarned".to_string(), json!("9.9"));
        let stored = snapshot_of(&previous);

        let new = payload(&["2020-01-01", "2020-01-02"]);
        let plan = plan_check(&new, Some(&stored), true, false).unwrap();

        assert!(plan.events.is_empty());
        assert_eq!(plan.snapshot, Some(snapshot_of(&new)));
    }

    #[test]
    fn new_date_emits_exactly_that_record() {
        let stored = snapshot_of(&payload(&["2020-01-01"]));
        let new = payload(&["2020-01-01", "2020-01-02"]);
        let plan = plan_check(&new, Some(&stored), true, false).unwrap();

        assert_eq!(plan.events.len(), 1);
        assert_eq!(plan.events[0]["paymentDate"], "2020-01-02");
        assert_eq!(plan.snapshot, Some(snapshot_of(&new)));
    }

    #[test]
    fn full_mode_always_emits_the_whole_payload() {
        let new = payload(&["2020-01-01"]);
        let stored = snapshot_of(&new);

        let plan = plan_check(&new, Some(&stored), false, false).unwrap();
        assert_eq!(plan.events.len(), 1);
        assert_eq!(plan.events[0]["overviews"][0]["paymentDate"], "2020-01-01");
        // unchanged text, so the snapshot stays as is
        assert!(plan.snapshot.is_none());

        let plan = plan_check(&new, None, false, false).unwrap();
        assert_eq!(plan.events.len(), 1);
        assert_eq!(plan.snapshot, Some(snapshot_of(&new)));
    }

    #[test]
    fn legacy_hash_inspect_snapshot_is_repaired() {
        let stored = r#"{"overviews"=>[{"paymentDate"=>"2020-01-01", "settlementAmount"=>nil}]}"#;
        let previous = parse_snapshot(stored).unwrap();

        assert_eq!(previous.overviews.len(), 1);
        assert_eq!(previous.overviews[0].payment_date, "2020-01-01");
        assert_eq!(previous.overviews[0].rest["settlementAmount"], Value::Null);
    }

    #[test]
    fn unreadable_snapshot_is_fatal() {
        let err = parse_snapshot("{definitely not json").unwrap_err();
        assert!(matches!(err, AgentError::Snapshot(_)));

        // and the cycle aborts without touching anything
        let stored = "{definitely not json";
        let new = payload(&["2020-01-01"]);
        assert!(plan_check(&new, Some(stored), true, false).is_err());
    }

    #[test]
    fn apply_emits_and_stores_across_cycles() {
        let tmp = TempDir::new().unwrap();
        let agent = test_agent(&tmp, test_options());

        let outcome = agent.apply(payload(&["2020-01-01", "2020-01-02"])).unwrap();
        assert_eq!(outcome.events_emitted, 2);
        assert!(outcome.snapshot_updated);
        assert_eq!(agent.events.data().len(), 2);
        assert!(agent.memory.get(LAST_STATUS_KEY).is_some());

        // same payload again: nothing new
        let outcome = agent.apply(payload(&["2020-01-01", "2020-01-02"])).unwrap();
        assert_eq!(outcome.events_emitted, 0);
        assert!(!outcome.snapshot_updated);

        // one more date: exactly one more event
        let outcome = agent
            .apply(payload(&["2020-01-01", "2020-01-02", "2020-02-01"]))
            .unwrap();
        assert_eq!(outcome.events_emitted, 1);
        assert_eq!(agent.events.data().len(), 3);
        assert_eq!(
            agent.events.data()[2].payload["paymentDate"],
            "2020-02-01"
        );
    }

    #[test]
    fn full_mode_apply_wraps_the_payload() {
        let tmp = TempDir::new().unwrap();
        let mut options = test_options();
        options.changes_only = "false".to_string();
        let agent = test_agent(&tmp, options);

        agent.apply(payload(&["2020-01-01"])).unwrap();
        agent.apply(payload(&["2020-01-01"])).unwrap();

        let events = agent.events.data();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload["overviews"][0]["paymentDate"], "2020-01-01");
    }

    #[test]
    fn working_requires_a_recent_event_and_no_newer_error() {
        let tmp = TempDir::new().unwrap();
        let agent = test_agent(&tmp, test_options());

        assert!(!agent.working());

        agent.apply(payload(&["2020-01-01"])).unwrap();
        assert!(agent.working());

        agent
            .logs
            .append(LogLevel::Error, "statements request failed".to_string())
            .unwrap();
        assert!(!agent.working());
    }

    #[test]
    fn working_expires_with_the_receive_period() {
        let tmp = TempDir::new().unwrap();
        let agent = test_agent(&tmp, test_options());

        let stale = Event {
            id: 1,
            created_at: (Utc::now() - Duration::days(60)).to_rfc3339(),
            payload: Value::Null,
        };
        agent.events.save(vec![stale]).unwrap();

        assert!(!agent.working());
    }
}
