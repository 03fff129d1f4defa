//! Struct and methods to call the publishers portal statements API

use super::StatementsPayload;
use crate::agent::{AgentError, AgentOptions};
use tracing::{debug, error, info};

pub const STATEMENTS_BASE_URL: &str = "https://publishers.basicattentiontoken.org";

const STATEMENTS_PATH: &str = "/publishers/statements?id=undefined";
const REFERER: &str = "https://publishers.basicattentiontoken.org/publishers/statements?locale=en";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.106 Safari/537.36";

/// Calls the statements endpoint with the session cookies of a logged-in
/// publisher. The portal has no API tokens; authentication is the CSRF
/// token plus two cookies lifted from a browser session.
#[derive(Default, Debug, Clone)]
pub struct StatementsApi {
    csrf_token: String,
    pk_id: String,
    publishers_session: String,
    base_url: String,
}

impl StatementsApi {
    pub fn new(options: &AgentOptions) -> Self {
        Self {
            csrf_token: options.csrf_token.clone(),
            pk_id: options.pk_id.clone(),
            publishers_session: options.publishers_session.clone(),
            base_url: STATEMENTS_BASE_URL.to_string(),
        }
    }

    pub async fn get_statements(&self) -> Result<StatementsPayload, AgentError> {
        let url = format!("{}{}", self.base_url, STATEMENTS_PATH);
        let cookie = format!(
            "_pk_testcookie..undefined=1; _pk_id.6.8f93={}; _pk_ses.6.8f93=1; _publishers_session={}",
            self.pk_id, self.publishers_session
        );

        debug!("Calling statements API: {}", url);

        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .header("Authority", "publishers.basicattentiontoken.org")
            .header("Accept", "application/json")
            .header("X-Csrf-Token", &self.csrf_token)
            .header("User-Agent", USER_AGENT)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Sec-Gpc", "1")
            .header("Sec-Fetch-Site", "same-origin")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Dest", "empty")
            .header("Referer", REFERER)
            .header("Accept-Language", "fr,en-US;q=0.9,en;q=0.8")
            .header("Cookie", cookie)
            .send()
            .await?;

        let status = response.status();
        info!("request status: {}", status);

        if !status.is_success() {
            return Err(AgentError::Status(status));
        }

        let text = response.text().await?;
        match serde_json::from_str::<StatementsPayload>(&text) {
            Ok(payload) => Ok(payload),
            Err(e) => {
                error!("Failed to decode statements response: {:?}", &text);
                Err(AgentError::Decode(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_api(server: &MockServer) -> StatementsApi {
        StatementsApi {
            csrf_token: "token".to_string(),
            pk_id: "pk".to_string(),
            publishers_session: "session".to_string(),
            base_url: server.uri(),
        }
    }

    #[tokio::test]
    async fn sends_session_headers_and_decodes_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/publishers/statements"))
            .and(query_param("id", "undefined"))
            .and(header("X-Csrf-Token", "token"))
            .and(header("Accept", "application/json"))
            .and(header(
                "Cookie",
                "_pk_testcookie..undefined=1; _pk_id.6.8f93=pk; _pk_ses.6.8f93=1; _publishers_session=session",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "overviews": [{ "paymentDate": "2020-12-09", "totalEarned": "482.5" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = test_api(&server).get_statements().await.unwrap();
        assert_eq!(payload.overviews.len(), 1);
        assert_eq!(payload.overviews[0].payment_date, "2020-12-09");
    }

    #[tokio::test]
    async fn non_2xx_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/publishers/statements"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = test_api(&server).get_statements().await.unwrap_err();
        assert!(matches!(err, AgentError::Status(status) if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/publishers/statements"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>session expired</html>"))
            .mount(&server)
            .await;

        let err = test_api(&server).get_statements().await.unwrap_err();
        assert!(matches!(err, AgentError::Decode(_)));
    }
}
