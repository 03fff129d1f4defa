/*!
Structs related to the publishers portal statements API's response.
*/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/**
Structure representing one statement overview record.

The portal returns a large nested object per statement (settled
transactions, totals, deposit breakdowns, earning period, rate cards, ...)
and none of it is documented, so only `paymentDate` is typed: it is the one
field the agent inspects, and two overviews with the same payment date are
treated as the same statement.

Everything else rides in `rest` and is passed through to emitted events
verbatim, explicit nulls included.
*/
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    /// Settlement date of the statement, e.g. "2020-12-09".
    pub payment_date: String,

    /// Remaining upstream fields, untouched.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/**
Response of /publishers/statements.
*/
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementsPayload {
    pub overviews: Vec<Overview>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}
