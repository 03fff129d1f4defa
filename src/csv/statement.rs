use crate::brave::Overview;
use crate::csv::ToCsv;
use serde_json::Value;

/// Flat row for spreadsheet import, one per emitted statement event. The
/// columns beyond the payment date are untyped upstream, so they are dug
/// out of the pass-through bag and left empty when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementCsv {
    pub payment_date: String,
    pub total_earned: String,
    pub bat_total_deposited: String,
    pub settlement_destination: String,
    pub period_start: String,
    pub period_end: String,
}

impl From<&Overview> for StatementCsv {
    fn from(overview: &Overview) -> Self {
        let earning_period = overview.rest.get("earningPeriod");

        StatementCsv {
            payment_date: overview.payment_date.clone(),
            total_earned: rest_string(overview, "totalEarned"),
            bat_total_deposited: rest_string(overview, "batTotalDeposited"),
            settlement_destination: rest_string(overview, "settlementDestination"),
            period_start: nested_string(earning_period, "startDate"),
            period_end: nested_string(earning_period, "endDate"),
        }
    }
}

fn rest_string(overview: &Overview, key: &str) -> String {
    overview
        .rest
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn nested_string(value: Option<&Value>, key: &str) -> String {
    value
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl ToCsv for StatementCsv {
    fn header_row() -> &'static str {
        "payment_date,total_earned,bat_total_deposited,settlement_destination,period_start,period_end"
    }

    fn to_csv_row(&self) -> String {
        let StatementCsv {
            payment_date,
            total_earned,
            bat_total_deposited,
            settlement_destination,
            period_start,
            period_end,
        } = self;

        let settlement_destination = Self::format_csv_value(settlement_destination);

        format!(
            "{payment_date},{total_earned},{bat_total_deposited},{settlement_destination},{period_start},{period_end}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::VecToCsv;
    use serde_json::json;

    #[test]
    fn renders_rows_from_overview_fields() {
        let overview: Overview = serde_json::from_value(json!({
            "paymentDate": "2020-12-09",
            "totalEarned": "482.5",
            "batTotalDeposited": "458.4",
            "settlementDestination": "wallet-1",
            "earningPeriod": { "startDate": "2020-11-01", "endDate": "2020-12-09" }
        }))
        .unwrap();

        let csv = vec![StatementCsv::from(&overview)].to_csv();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("payment_date,total_earned,bat_total_deposited,settlement_destination,period_start,period_end")
        );
        assert_eq!(
            lines.next(),
            Some("2020-12-09,482.5,458.4,wallet-1,2020-11-01,2020-12-09")
        );
    }

    #[test]
    fn missing_columns_stay_empty() {
        let overview: Overview =
            serde_json::from_value(json!({ "paymentDate": "2020-12-09" })).unwrap();

        let row = StatementCsv::from(&overview).to_csv_row();
        assert_eq!(row, "2020-12-09,,,,,");
    }
}
