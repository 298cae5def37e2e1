//! Request runner - a single HTTP exchange checked against an expected status

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Method};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::output;
use crate::session::TestSession;

/// Request payload. A request carries at most one of these.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// URL-encoded form fields
    Form(Vec<(String, String)>),
    /// Multipart file upload
    File(FileUpload),
    /// JSON document, sent with `Content-Type: application/json`
    Json(Value),
}

/// A file streamed from disk as a multipart upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub path: PathBuf,
    pub len: u64,
}

impl FileUpload {
    pub async fn from_path(field: &str, path: &Path, content_type: &str) -> std::io::Result<Self> {
        let len = tokio::fs::metadata(path).await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            field: field.to_string(),
            file_name,
            content_type: content_type.to_string(),
            path: path.to_path_buf(),
            len,
        })
    }

    /// Open the file and wrap it as a streaming multipart part
    async fn into_part(self) -> HarnessResult<(String, Part)> {
        let file = tokio::fs::File::open(&self.path).await?;
        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, self.len)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?;
        Ok((self.field, part))
    }
}

/// One named API call and the status it is expected to return
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub name: String,
    pub method: Method,
    pub endpoint: String,
    pub expected_status: u16,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(name: impl Into<String>, method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            endpoint: endpoint.into(),
            expected_status: 200,
            body: RequestBody::Empty,
        }
    }

    pub fn get(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(name, Method::GET, endpoint)
    }

    pub fn post(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(name, Method::POST, endpoint)
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn json(mut self, payload: Value) -> Self {
        self.body = RequestBody::Json(payload);
        self
    }

    pub fn file(mut self, upload: FileUpload) -> Self {
        self.body = RequestBody::File(upload);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }
}

/// Result of a single request
#[derive(Debug)]
pub struct StepOutcome {
    pub success: bool,
    /// Parsed response body, or an empty object
    pub payload: Value,
    /// Observed status, absent on transport failure
    pub status: Option<u16>,
    pub error: Option<HarnessError>,
}

impl StepOutcome {
    fn passed(status: u16, payload: Value) -> Self {
        Self {
            success: true,
            payload,
            status: Some(status),
            error: None,
        }
    }

    fn unexpected(expected: u16, actual: u16, payload: Value) -> Self {
        Self {
            success: false,
            payload,
            status: Some(actual),
            error: Some(HarnessError::UnexpectedStatus { expected, actual }),
        }
    }

    fn failed(err: HarnessError) -> Self {
        Self {
            success: false,
            payload: empty_object(),
            status: None,
            error: Some(err),
        }
    }

    pub fn into_result(self) -> HarnessResult<Value> {
        if self.success {
            return Ok(self.payload);
        }
        Err(self
            .error
            .unwrap_or_else(|| HarnessError::Contract("request failed".to_string())))
    }
}

/// Issues requests against `{base_url}/{endpoint}`
#[derive(Debug, Clone)]
pub struct RequestRunner {
    client: Client,
    base_url: String,
}

impl RequestRunner {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> HarnessResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Send a request without touching any counters.
    ///
    /// Transport faults, and upload files that cannot be opened, are logged
    /// and folded into a failed outcome with an empty payload. There are no
    /// retries.
    pub async fn send(&self, request: ApiRequest) -> StepOutcome {
        output::print_testing(&request.name);
        let expected = request.expected_status;

        match self.exchange(request).await {
            Ok((status, text)) => {
                let payload = parse_body(&text);
                if status == expected {
                    output::print_success(&format!("Passed - Status: {}", status));
                    StepOutcome::passed(status, payload)
                } else {
                    output::print_error(&format!(
                        "Failed - Expected {}, got {}",
                        expected, status
                    ));
                    output::print_info(&format!("Response: {}", text));
                    warn!(expected, status, "Unexpected response status");
                    StepOutcome::unexpected(expected, status, payload)
                }
            }
            Err(e) => {
                output::print_error(&format!("Failed - Error: {}", e));
                warn!("Request error: {}", e);
                StepOutcome::failed(e)
            }
        }
    }

    /// Send a request as one counted test: the attempt is always recorded,
    /// the pass only when the status matches.
    pub async fn run_test(&self, session: &mut TestSession, request: ApiRequest) -> StepOutcome {
        session.record_attempt();
        let outcome = self.send(request).await;
        if outcome.success {
            session.record_pass();
        }
        outcome
    }

    /// Like [`run_test`](Self::run_test), but the pass is only recorded once
    /// `check` also accepts the payload.
    pub async fn run_checked<T, F>(
        &self,
        session: &mut TestSession,
        request: ApiRequest,
        check: F,
    ) -> HarnessResult<T>
    where
        F: FnOnce(&Value) -> Result<T, String>,
    {
        session.record_attempt();
        let payload = self.send(request).await.into_result()?;
        let value = check(&payload).map_err(HarnessError::Contract)?;
        session.record_pass();
        Ok(value)
    }

    async fn exchange(&self, request: ApiRequest) -> HarnessResult<(u16, String)> {
        let url = self.url(&request.endpoint);
        debug!("{} {}", request.method, url);

        let builder = self.client.request(request.method, &url);
        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::File(upload) => {
                let (field, part) = upload.into_part().await?;
                builder.multipart(Form::new().part(field, part))
            }
            RequestBody::Json(payload) => builder
                .header(CONTENT_TYPE, "application/json")
                .json(&payload),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Parse a response body as JSON, falling back to an empty object
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| empty_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joins_without_double_slash() {
        let runner = RequestRunner::new("http://localhost:8002/", None).unwrap();
        assert_eq!(runner.url("health"), "http://localhost:8002/health");
        assert_eq!(runner.url("/api/templates"), "http://localhost:8002/api/templates");
    }

    #[test]
    fn test_parse_body_falls_back_to_empty_object() {
        assert_eq!(parse_body("not json"), json!({}));
        assert_eq!(parse_body(""), json!({}));
        assert_eq!(parse_body(r#"{"ok":true}"#), json!({"ok": true}));
    }

    #[test]
    fn test_builder_replaces_body() {
        let request = ApiRequest::post("Process", "api/process")
            .form(vec![("a".into(), "b".into())])
            .json(json!({"video_id": "x"}))
            .expect_status(201);

        assert_eq!(request.expected_status, 201);
        assert!(matches!(request.body, RequestBody::Json(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failed_step() {
        // Nothing listens on the discard port on loopback.
        let runner = RequestRunner::new("http://127.0.0.1:9", None).unwrap();
        let mut session = TestSession::new();

        let outcome = runner
            .run_test(&mut session, ApiRequest::get("Unreachable", "health"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.payload, json!({}));
        assert!(outcome.status.is_none());
        assert!(matches!(outcome.error, Some(HarnessError::Transport(_))));
        assert_eq!(session.tests_run(), 1);
        assert_eq!(session.tests_passed(), 0);
    }
}
