use crate::component::frame_sampler::SampleFrame;
use crate::component::media_ingestion::AssetInfo;
use crate::config::MediaKind;
use crate::error::PredictionError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 服務端原始回應
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// 服務端回傳 `Fake` / `Real`，不分大小寫
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fake" => Some(Self::Fake),
            "real" => Some(Self::Real),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_fake(self) -> bool {
        matches!(self, Self::Fake)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => f.write_str("real"),
            Self::Fake => f.write_str("fake"),
        }
    }
}

/// 服務端判定為偽造的單一影格
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameAnnotation {
    pub frame_index: usize,
    pub label: Label,
    pub confidence: f64,
    /// base64 編碼的 JPEG
    #[serde(skip)]
    pub image_encoding: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    #[serde(default)]
    pub frames_extracted: u32,
    #[serde(default)]
    pub frame_rate_used: Option<f64>,
    #[serde(default)]
    pub max_frames_limit: u32,
}

/// 單一媒體的偵測結果，只屬於產生它的那個媒體
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub asset_id: Uuid,
    pub media_kind: MediaKind,
    pub model_used: Option<String>,
    pub overall_label: Label,
    /// 影片的整體結果沒有單一信心值
    pub confidence: Option<f64>,
    pub fake_percentage: f64,
    pub total_frames: u32,
    pub per_frame_annotations: Vec<FrameAnnotation>,
    pub processing_info: Option<ProcessingInfo>,
    pub source_filename: Option<String>,
    /// 客戶端取樣的預覽影格
    #[serde(skip)]
    pub preview_frames: Vec<SampleFrame>,
}

#[derive(Deserialize)]
struct ImageBody {
    model_used: Option<String>,
    filename: Option<String>,
    result: Option<ImageVerdict>,
}

#[derive(Deserialize)]
struct ImageVerdict {
    prediction: Option<String>,
    is_fake: Option<bool>,
    confidence: Option<f64>,
}

#[derive(Deserialize)]
struct VideoBody {
    model_used: Option<String>,
    filename: Option<String>,
    result: Option<VideoVerdict>,
    processing_info: Option<ProcessingInfo>,
    #[serde(default)]
    fake_frames: Vec<FakeFrameEntry>,
}

#[derive(Deserialize)]
struct VideoVerdict {
    overall_prediction: Option<String>,
    fake_percentage: Option<f64>,
    total_frames: Option<u32>,
}

#[derive(Deserialize)]
struct FakeFrameEntry {
    frame_index: usize,
    prediction: String,
    #[serde(default)]
    confidence: f64,
    image_base64: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// 檢查回應並轉為 `DetectionResult`
///
/// 非 2xx 為 `Server`；2xx 但缺少必要欄位為 `MalformedResponse`。
pub fn interpret(asset: &AssetInfo, raw: &RawResponse) -> Result<DetectionResult, PredictionError> {
    if !raw.is_success() {
        return Err(server_error(raw.status, &raw.body));
    }

    match asset.kind {
        MediaKind::Image => interpret_image(asset.id, &raw.body),
        MediaKind::Video => interpret_video(asset.id, &raw.body),
    }
}

/// FastAPI 錯誤格式為 `{"detail": ...}`，其餘直接使用內容
pub(crate) fn server_error(status: u16, body: &str) -> PredictionError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|error| match error.detail {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        })
        .unwrap_or_else(|| body.trim().to_string());

    let detail = if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        detail
    };

    PredictionError::Server { status, detail }
}

fn parse_body<B: DeserializeOwned>(body: &str) -> Result<B, PredictionError> {
    serde_json::from_str(body)
        .map_err(|e| PredictionError::MalformedResponse(format!("invalid JSON: {e}")))
}

fn parse_label(value: &str) -> Result<Label, PredictionError> {
    Label::parse(value).ok_or_else(|| {
        PredictionError::MalformedResponse(format!("unknown prediction label `{value}`"))
    })
}

fn interpret_image(asset_id: Uuid, body: &str) -> Result<DetectionResult, PredictionError> {
    let body: ImageBody = parse_body(body)?;
    let verdict = body.result.ok_or_else(|| PredictionError::malformed("result"))?;

    let prediction = verdict
        .prediction
        .ok_or_else(|| PredictionError::malformed("result.prediction"))?;
    let is_fake = verdict
        .is_fake
        .ok_or_else(|| PredictionError::malformed("result.is_fake"))?;
    let confidence = verdict
        .confidence
        .ok_or_else(|| PredictionError::malformed("result.confidence"))?;

    let label = parse_label(&prediction)?;
    if label.is_fake() != is_fake {
        return Err(PredictionError::MalformedResponse(format!(
            "prediction `{prediction}` contradicts is_fake={is_fake}"
        )));
    }

    Ok(DetectionResult {
        asset_id,
        media_kind: MediaKind::Image,
        model_used: body.model_used,
        overall_label: label,
        confidence: Some(confidence),
        fake_percentage: if is_fake { 100.0 } else { 0.0 },
        total_frames: 1,
        per_frame_annotations: Vec::new(),
        processing_info: None,
        source_filename: body.filename,
        preview_frames: Vec::new(),
    })
}

fn interpret_video(asset_id: Uuid, body: &str) -> Result<DetectionResult, PredictionError> {
    let body: VideoBody = parse_body(body)?;
    let verdict = body.result.ok_or_else(|| PredictionError::malformed("result"))?;

    let overall = verdict
        .overall_prediction
        .ok_or_else(|| PredictionError::malformed("result.overall_prediction"))?;
    let overall_label = parse_label(&overall)?;
    let fake_percentage = verdict
        .fake_percentage
        .ok_or_else(|| PredictionError::malformed("result.fake_percentage"))?;
    let total_frames = verdict
        .total_frames
        .or_else(|| body.processing_info.as_ref().map(|p| p.frames_extracted))
        .ok_or_else(|| PredictionError::malformed("result.total_frames"))?;

    let mut per_frame_annotations = body
        .fake_frames
        .into_iter()
        .map(|entry| {
            Ok(FrameAnnotation {
                frame_index: entry.frame_index,
                label: parse_label(&entry.prediction)?,
                confidence: entry.confidence,
                image_encoding: entry.image_base64,
            })
        })
        .collect::<Result<Vec<_>, PredictionError>>()?;
    per_frame_annotations.sort_by_key(|annotation| annotation.frame_index);

    Ok(DetectionResult {
        asset_id,
        media_kind: MediaKind::Video,
        model_used: body.model_used,
        overall_label,
        confidence: None,
        fake_percentage,
        total_frames,
        per_frame_annotations,
        processing_info: body.processing_info,
        source_filename: body.filename,
        preview_frames: Vec::new(),
    })
}
