use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use routewatch_core::{normalize, read_text, ProcessingOptions, Record};
use routewatch_logging::rw_debug;
use serde_json::Value;
use url::Url;

use crate::{ApiError, StatusReply, SubmitAccepted};

pub const SUBMIT_PATH: &str = "bulk-routes/process-csv-enhanced";
pub const STATUS_PATH: &str = "bulk-routes/status";
pub const CANCEL_PATH: &str = "bulk-routes/cancel";

const UPLOAD_FIELD: &str = "csvFile";
const DEFAULT_UPLOAD_NAME: &str = "routes.csv";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Prefix every endpoint path is joined onto, e.g. `http://host/api`.
    pub base_url: String,
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Replaces `request_timeout` for the CSV upload.
    pub upload_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            auth_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

/// The bulk-routes backend contract.
#[async_trait::async_trait]
pub trait BulkRoutesApi: Send + Sync {
    /// Uploads the CSV with string-encoded options.
    async fn submit(
        &self,
        file: &Path,
        options: &ProcessingOptions,
        processing_id: &str,
    ) -> Result<SubmitAccepted, ApiError>;

    /// Reads the singleton job status.
    async fn status(&self) -> Result<StatusReply, ApiError>;

    /// Best-effort cancel. `Ok(false)` when the server has no cancel endpoint
    /// or declined.
    async fn cancel(&self) -> Result<bool, ApiError>;

    /// Fetches any collection endpoint and normalizes the payload.
    async fn records(&self, path: &str) -> Result<Vec<Record>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    settings: ApiSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let mut base_url = settings.base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url).map_err(|err| ApiError::InvalidUrl(err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.settings.auth_token.as_deref() {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }
}

#[async_trait::async_trait]
impl BulkRoutesApi for ReqwestApi {
    async fn submit(
        &self,
        file: &Path,
        options: &ProcessingOptions,
        processing_id: &str,
    ) -> Result<SubmitAccepted, ApiError> {
        let url = self.endpoint(SUBMIT_PATH)?;
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|err| ApiError::Io(format!("{}: {err}", file.display())))?;
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_UPLOAD_NAME)
            .to_string();
        rw_debug!(
            "Submitting {} ({} bytes) as {}",
            file_name,
            bytes.len(),
            processing_id
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(map_reqwest_error)?;
        let form = options.form_fields().into_iter().fold(
            Form::new()
                .part(UPLOAD_FIELD, part)
                .text("processingId", processing_id.to_string()),
            |form, (name, value)| form.text(name, value),
        );

        let response = self
            .authorize(self.client.post(url))
            .timeout(self.settings.upload_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        let value = parse_lenient(&body);

        if !status.is_success() {
            return Err(http_error(status, &value));
        }
        if value.get("success") == Some(&Value::Bool(false)) {
            return Err(ApiError::Rejected(
                message_of(&value)
                    .unwrap_or_else(|| "Bulk processing request was rejected".to_string()),
            ));
        }
        Ok(SubmitAccepted {
            message: message_of(&value),
            data: value.get("data").filter(|data| !data.is_null()).cloned(),
        })
    }

    async fn status(&self) -> Result<StatusReply, ApiError> {
        let url = self.endpoint(STATUS_PATH)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(StatusReply::NotFound);
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(http_error(status, &parse_lenient(&body)));
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        Ok(StatusReply::Status(value))
    }

    async fn cancel(&self) -> Result<bool, ApiError> {
        let url = self.endpoint(CANCEL_PATH)?;
        let response = self
            .authorize(self.client.post(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            rw_debug!("Cancel endpoint unavailable ({})", status);
            return Ok(false);
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        let value = parse_lenient(&body);
        if !status.is_success() {
            return Err(http_error(status, &value));
        }
        Ok(value.get("success") != Some(&Value::Bool(false)))
    }

    async fn records(&self, path: &str) -> Result<Vec<Record>, ApiError> {
        let url = self.endpoint(path)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(http_error(status, &parse_lenient(&body)));
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        Ok(normalize(&value))
    }
}

/// JSON when the body parses, otherwise the raw text as a string value.
fn parse_lenient(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.trim().to_string()))
}

fn message_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => read_text(object, &["message", "error"]),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn http_error(status: StatusCode, body: &Value) -> ApiError {
    ApiError::HttpStatus {
        status: status.as_u16(),
        message: message_of(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    if err.is_builder() {
        return ApiError::InvalidUrl(err.to_string());
    }
    ApiError::Network(err.to_string())
}
