use super::request::DetectionRequest;
use super::response::{RawResponse, server_error};
use crate::config::ServiceSettings;
use crate::error::PredictionError;
use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// 把偵測請求送到遠端服務
///
/// 只負責傳輸；回應內容由協調器檢查。
pub trait DetectionTransport: Send + Sync {
    fn send(
        &self,
        request: DetectionRequest,
    ) -> impl Future<Output = Result<RawResponse, PredictionError>> + Send;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub loaded_models: Vec<String>,
    #[serde(default)]
    pub device_info: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub output_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelCatalog {
    pub available_models: Vec<ModelDescriptor>,
    #[serde(default)]
    pub default_model: Option<String>,
}

/// 遠端偵測服務的 HTTP client
#[derive(Debug, Clone)]
pub struct HttpDetectionClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpDetectionClient {
    /// 逾時套用在整個請求（連線、上傳、等待回應）
    pub fn new(settings: &ServiceSettings) -> Result<Self, PredictionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(network_error)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    pub async fn health(&self) -> Result<ServiceHealth, PredictionError> {
        self.get_json("health").await
    }

    pub async fn models(&self) -> Result<ModelCatalog, PredictionError> {
        self.get_json("models").await
    }

    async fn get_json<B: DeserializeOwned>(&self, path: &str) -> Result<B, PredictionError> {
        let url = self.endpoint(path);
        debug!("GET {url}");

        let response = self.http.get(&url).send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;

        let raw = RawResponse::new(status, body);
        if !raw.is_success() {
            return Err(server_error(raw.status, &raw.body));
        }

        serde_json::from_str(&raw.body)
            .map_err(|e| PredictionError::MalformedResponse(format!("{path}: {e}")))
    }
}

impl DetectionTransport for HttpDetectionClient {
    async fn send(&self, request: DetectionRequest) -> Result<RawResponse, PredictionError> {
        let url = self.endpoint(&format!("detect/{}", request.kind.endpoint()));
        let form = request.into_form().await?;

        info!(
            "送出偵測請求 {url}: {} (model={})",
            request.file_name, request.config.model_variant
        );

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;
        debug!("偵測回應 {status}: {} bytes", body.len());

        Ok(RawResponse::new(status, body))
    }
}

fn network_error(error: reqwest::Error) -> PredictionError {
    if error.is_timeout() {
        PredictionError::Network(format!("request timed out: {error}"))
    } else {
        PredictionError::Network(error.to_string())
    }
}
