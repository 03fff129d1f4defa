//! Events appended to the agent's outgoing stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/**
One emitted event. The payload is a single overview record in changes-only
mode, or the whole statements payload in full mode; upstream field names are
carried verbatim either way.
*/
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    /// RFC 3339 emission time.
    pub created_at: String,
    pub payload: Value,
}
