use crate::component::media_ingestion::AssetInfo;
use crate::config::{DetectionConfig, MediaKind};
use crate::error::PredictionError;
use reqwest::multipart;
use std::path::PathBuf;

/// 一次偵測請求：原始媒體檔加上偵測參數
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRequest {
    pub kind: MediaKind,
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub config: DetectionConfig,
}

impl DetectionRequest {
    #[must_use]
    pub fn new(asset: &AssetInfo, config: DetectionConfig) -> Self {
        Self {
            kind: asset.kind,
            path: asset.path.clone(),
            file_name: asset.file_name.clone(),
            mime_type: asset.mime_type.clone(),
            config,
        }
    }

    /// 除了檔案之外的表單欄位
    ///
    /// 圖片端點只接受 `model_type`；`frame_rate` 為 `None` 時不送，
    /// 由服務端自行決定。
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("model_type", self.config.model_variant.as_str().to_string())];

        if self.kind == MediaKind::Video {
            if let Some(rate) = self.config.frame_rate {
                fields.push(("frame_rate", rate.to_string()));
            }
            fields.push(("max_frames", self.config.max_frames.to_string()));
        }

        fields
    }

    /// 讀取媒體檔並組成 multipart 表單
    pub async fn into_form(&self) -> Result<multipart::Form, PredictionError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            PredictionError::MediaUnavailable(format!("{}: {e}", self.path.display()))
        })?;

        let part = multipart::Part::bytes(bytes)
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)
            .map_err(|e| PredictionError::MediaUnavailable(e.to_string()))?;

        let mut form = multipart::Form::new().part("file", part);
        for (name, value) in self.form_fields() {
            form = form.text(name, value);
        }

        Ok(form)
    }
}
