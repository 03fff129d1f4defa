//! Agent options and their validation.

/// Options are kept as the raw strings the operator supplied; call sites
/// boolify or parse at the point of use. `validate` reports every violation
/// at once so a misconfigured agent fails with the full list.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct AgentOptions {
    pub csrf_token: String,
    pub publishers_session: String,
    pub pk_id: String,
    pub expected_receive_period_in_days: String,
    pub changes_only: String,
    pub debug: String,
}

impl AgentOptions {
    /// Reads options from the environment (`.env` supported). Unset or
    /// empty variables fall back to the defaults; the credentials have no
    /// usable default and stay empty for `validate` to reject.
    pub fn from_env() -> Self {
        Self {
            csrf_token: env_or("BRAVE_CSRF_TOKEN", ""),
            publishers_session: env_or("BRAVE_PUBLISHERS_SESSION", ""),
            pk_id: env_or("BRAVE_PK_ID", ""),
            expected_receive_period_in_days: env_or("BRAVE_EXPECTED_RECEIVE_PERIOD_IN_DAYS", "31"),
            changes_only: env_or("BRAVE_CHANGES_ONLY", "true"),
            debug: env_or("BRAVE_DEBUG", "false"),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.csrf_token.is_empty() {
            errors.push("csrf_token is a required field".to_string());
        }

        if self.publishers_session.is_empty() {
            errors.push("publishers_session is a required field".to_string());
        }

        if self.pk_id.is_empty() {
            errors.push("pk_id is a required field".to_string());
        }

        if !self.changes_only.is_empty() && boolify(&self.changes_only).is_none() {
            errors.push("if provided, changes_only must be true or false".to_string());
        }

        if !self.debug.is_empty() && boolify(&self.debug).is_none() {
            errors.push("if provided, debug must be true or false".to_string());
        }

        match self.expected_receive_period_in_days.parse::<i64>() {
            Ok(days) if days > 0 => {}
            _ => errors.push(
                "Please provide 'expected_receive_period_in_days' to indicate how many days \
                 can pass before this Agent is considered to be not working"
                    .to_string(),
            ),
        }

        errors
    }
}

fn env_or(key: &str, default: &str) -> String {
    match dotenv::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

pub(crate) fn boolify(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
