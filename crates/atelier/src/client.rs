use reqwest::{Client, Response};
use serde_json::Value;
use std::fmt;
use strum::Display;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::Error;
use crate::finetune::FinetuneRequest;
use crate::generate::GenerateRequest;
use crate::status::JobStatus;

pub const FINETUNE_PATH: &str = "v1/finetune";
pub const GENERATE_PATH: &str = "v1/flux-pro-finetuned";
pub const RESULT_PATH: &str = "v1/get_result";

const API_KEY_HEADER: &str = "x-key";

/// Which side of the API a job belongs to. Determines the identifier field
/// in the submission response and the default polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum JobKind {
    Finetune,
    Inference,
}

/// Proof of a successful submission. Everything after submission (polling,
/// result extraction, registry writes) keys off this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub kind: JobKind,
}

/// Async client for the fine-tune and inference endpoints.
///
/// Holds a connection-pooled [`reqwest::Client`] with connect and request
/// timeouts from [`ApiConfig`], so no call can hang indefinitely.
pub struct BflClient {
    client: Client,
    host: String,
    api_key: String,
}

impl BflClient {
    pub fn new(config: ApiConfig) -> Result<Self, Error> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Auth("API key must not be empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            host: config.host,
            api_key: config.api_key,
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Helper to attach the authentication and content-type headers every
    /// endpoint expects.
    fn add_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, Error> {
        let request = self.add_headers(self.client.post(self.url(path)));
        let response = request.json(payload).send().await?;
        Self::read_submission_response(response).await
    }

    async fn read_submission_response(response: Response) -> Result<Value, Error> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::RemoteRequest { status, body });
        }
        serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!("submission response is not valid JSON: {}", e))
        })
    }

    fn extract_id(payload: &Value, field: &str) -> Result<String, Error> {
        payload
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::MalformedResponse(format!(
                    "submission response has no {} field: {}",
                    field, payload
                ))
            })
    }

    /// Submits a fine-tune job. Returns as soon as the remote accepts it;
    /// completion is tracked separately via polling.
    pub async fn submit_finetune(&self, request: &FinetuneRequest) -> Result<JobHandle, Error> {
        let payload = request.to_payload()?;
        debug!("Submitting fine-tune: {}", request.comment);

        let response = self.post(FINETUNE_PATH, &payload).await?;
        let id = Self::extract_id(&response, "finetune_id")?;
        info!("Fine-tune accepted: {} ({})", request.comment, id);

        Ok(JobHandle {
            id,
            kind: JobKind::Finetune,
        })
    }

    /// Submits an inference job against a previously trained fine-tune.
    pub async fn submit_generate(&self, request: &GenerateRequest) -> Result<JobHandle, Error> {
        let payload = request.to_payload()?;
        debug!("Submitting inference against fine-tune {}", request.finetune_id);

        let response = self.post(GENERATE_PATH, &payload).await?;
        let id = Self::extract_id(&response, "id")?;
        info!("Inference request accepted: {}", id);

        Ok(JobHandle {
            id,
            kind: JobKind::Inference,
        })
    }

    /// Fetches the current status of a job. Transport failures and non-2xx
    /// answers here are [`Error::PollTransport`]: the job itself may still
    /// be running fine when a single status fetch is not.
    pub async fn get_result(&self, job_id: &str) -> Result<JobStatus, Error> {
        let request = self
            .add_headers(self.client.get(self.url(RESULT_PATH)))
            .query(&[("id", job_id)]);

        let response = request
            .send()
            .await
            .map_err(|e| Error::PollTransport(Error::transport_detail(&e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::PollTransport(Error::transport_detail(&e)))?;
        if !status.is_success() {
            return Err(Error::PollTransport(format!(
                "status fetch returned {}: {}",
                status, body
            )));
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!("poll response is not valid JSON: {}", e))
        })?;
        JobStatus::from_response(&payload)
    }
}

impl fmt::Debug for BflClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BflClient")
            .field("host", &self.host)
            .field("api_key", &"[hidden]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finetune::{CaptionMode, Priority};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> BflClient {
        BflClient::new(ApiConfig::new(server.uri(), "test-key")).unwrap()
    }

    fn finetune_request() -> FinetuneRequest {
        FinetuneRequest::builder(b"zip bytes".to_vec(), "cat-v1")
            .mode(CaptionMode::Character)
            .priority(Priority::Quality)
            .build()
    }

    #[test]
    fn empty_api_key_is_rejected_before_any_call() {
        let err = BflClient::new(ApiConfig::new("https://api.us1.bfl.ai", "  ")).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn submit_finetune_posts_payload_and_reads_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/finetune"))
            .and(header("x-key", "test-key"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "finetune_id": "ft-123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handle = test_client(&server)
            .submit_finetune(&finetune_request())
            .await
            .unwrap();
        assert_eq!(handle.id, "ft-123");
        assert_eq!(handle.kind, JobKind::Finetune);
    }

    #[tokio::test]
    async fn submit_generate_reads_id_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/flux-pro-finetuned"))
            .and(header("x-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "inf-456"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = GenerateRequest::builder("ft-123", "TOK on a beach").build();
        let handle = test_client(&server).submit_generate(&request).await.unwrap();
        assert_eq!(handle.id, "inf-456");
        assert_eq!(handle.kind, JobKind::Inference);
    }

    #[tokio::test]
    async fn non_success_submission_preserves_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/finetune"))
            .respond_with(ResponseTemplate::new(402).set_body_string("out of credits"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .submit_finetune(&finetune_request())
            .await
            .unwrap_err();
        match err {
            Error::RemoteRequest { status, body } => {
                assert_eq!(status.as_u16(), 402);
                assert_eq!(body, "out of credits");
            }
            other => panic!("expected RemoteRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_identifier_in_submission_response_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/finetune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .submit_finetune(&finetune_request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/finetune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "finetune_id": "ft-123"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let request = FinetuneRequest::builder(b"zip".to_vec(), "c")
            .iterations(5000)
            .build();
        let err = test_client(&server).submit_finetune(&request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn get_result_sends_id_and_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/get_result"))
            .and(query_param("id", "ft-123"))
            .and(header("x-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Pending",
                "progress": 0.25
            })))
            .expect(1)
            .mount(&server)
            .await;

        let status = test_client(&server).get_result("ft-123").await.unwrap();
        assert_eq!(
            status,
            JobStatus::Pending {
                progress: Some(0.25)
            }
        );
    }

    #[tokio::test]
    async fn non_success_status_fetch_is_poll_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/get_result"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = test_client(&server).get_result("ft-123").await.unwrap_err();
        match err {
            Error::PollTransport(detail) => assert!(detail.contains("500")),
            other => panic!("expected PollTransport, got {:?}", other),
        }
    }
}
