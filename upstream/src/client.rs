use crate::envelope::Call;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::config::UpstreamConfig;
use shared::{Error, Result};
use tracing::{debug, warn};
use vakit::ports::UpstreamFetcher;
use vakit::{FailureReason, LookupRequest, LookupResult};

const USER_AGENT: &str = concat!("vakit-proxy/", env!("CARGO_PKG_VERSION"));

/// Client for the Diyanet directory/time-table service.
/// Each operation is `POST {base_url}/{operation}` with a JSON parameter object.
#[derive(Clone, Debug)]
pub struct DiyanetClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl DiyanetClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn call(&self, call: &Call) -> std::result::Result<Value, FailureReason> {
        let url = format!("{}/{}", self.base_url, call.operation);
        debug!("Calling upstream {} at {}", call.operation, url);

        let mut builder = self.client.post(&url).json(&call.params);
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }

        let response = builder.send().await.map_err(|e| {
            FailureReason::UpstreamUnreachable(format!("{} request failed: {}", call.operation, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FailureReason::UpstreamUnreachable(format!(
                "{} returned status {}",
                call.operation, status
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            FailureReason::UpstreamUnreachable(format!(
                "{} returned an unreadable body: {}",
                call.operation, e
            ))
        })
    }
}

#[async_trait]
impl UpstreamFetcher for DiyanetClient {
    async fn fetch(&self, request: &LookupRequest) -> LookupResult {
        let call = Call::for_request(request);
        match self.call(&call).await {
            Ok(body) => call.extract(body),
            Err(reason) => {
                warn!("{}: {}", request, reason);
                LookupResult::Failure(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String) -> UpstreamConfig {
        UpstreamConfig {
            url,
            username: None,
            password: None,
            timeout: Duration::from_secs(2),
        }
    }

    fn client(server: &MockServer) -> DiyanetClient {
        DiyanetClient::new(&config(format!("{}/DiyanetService/", server.uri()))).unwrap()
    }

    #[tokio::test]
    async fn test_time_table_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/DiyanetService/GetVakitler"))
            .and(body_json(json!({"sehirId": "9541", "saatFarki": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "GetVakitlerResult": {
                    "DateItem": [
                        {"MiladiTarihKisa": "01.01.2026", "Imsak": "06:41"},
                        {"MiladiTarihKisa": "02.01.2026", "Imsak": "06:41"},
                        {"MiladiTarihKisa": "03.01.2026", "Imsak": "06:42"}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        match client(&server)
            .fetch(&LookupRequest::time_table("9541", 2))
            .await
        {
            LookupResult::Success(records) => {
                assert_eq!(records.len(), 3);
                assert_eq!(records[2].get("Imsak"), Some(&json!("06:42")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_result_is_empty_result_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/DiyanetService/GetSehirler"))
            .and(body_json(json!({"ulkeKodu": "TR", "eyaletKod": "99", "filter": ""})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .fetch(&LookupRequest::cities("TR", "99"))
            .await;
        assert_eq!(
            outcome,
            LookupResult::Failure(FailureReason::UpstreamEmptyResult {
                operation: "GetSehirler".into()
            })
        );
    }

    #[tokio::test]
    async fn test_server_error_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).fetch(&LookupRequest::ListCountries).await;
        assert!(matches!(
            outcome,
            LookupResult::Failure(FailureReason::UpstreamUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<soap:Fault/>"))
            .mount(&server)
            .await;

        let outcome = client(&server).fetch(&LookupRequest::ListCountries).await;
        assert!(matches!(
            outcome,
            LookupResult::Failure(FailureReason::UpstreamUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let outcome = DiyanetClient::new(&config(uri))
            .unwrap()
            .fetch(&LookupRequest::ListCountries)
            .await;
        assert!(matches!(
            outcome,
            LookupResult::Failure(FailureReason::UpstreamUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_sends_basic_auth_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/GetUlkeler"))
            .and(header("authorization", "Basic c3ZjOnNlY3JldA=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "GetUlkelerResult": {"UlkeItem": [{"UlkeAdi": "TURKIYE", "UlkeID": "2"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DiyanetClient::new(&UpstreamConfig {
            username: Some("svc".into()),
            password: Some("secret".into()),
            ..config(server.uri())
        })
        .unwrap();

        assert!(client.fetch(&LookupRequest::ListCountries).await.is_success());
    }
}
