use crate::error::ValidationError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const MAX_RECENT_PATHS: usize = 10;

/// 服務端接受的上傳上限（100 MiB）
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

pub const MAX_FRAME_RATE: f64 = 60.0;
pub const MAX_FRAMES_LIMIT: u32 = 100;
/// 客戶端取樣張數上限
pub const MAX_SAMPLE_COUNT: usize = 60;

/// 媒體類型表：副檔名（含點、小寫）對應 MIME 類型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaTypeTable {
    #[serde(rename = "IMAGE_FILE")]
    pub image_file: BTreeMap<String, String>,
    #[serde(rename = "VIDEO_FILE")]
    pub video_file: BTreeMap<String, String>,
}

impl MediaTypeTable {
    fn entries(&self, kind: MediaKind) -> &BTreeMap<String, String> {
        match kind {
            MediaKind::Image => &self.image_file,
            MediaKind::Video => &self.video_file,
        }
    }

    /// 檢查副檔名是否在指定類別的允許清單內
    #[must_use]
    pub fn is_allowed(&self, kind: MediaKind, path: &Path) -> bool {
        extension_key(path).is_some_and(|ext| self.entries(kind).contains_key(&ext))
    }

    /// 依副檔名推斷 MIME 類型（兩個類別都查）
    #[must_use]
    pub fn guess_mime(&self, path: &Path) -> Option<&str> {
        let ext = extension_key(path)?;
        self.image_file
            .get(&ext)
            .or_else(|| self.video_file.get(&ext))
            .map(String::as_str)
    }

    #[must_use]
    pub fn extensions(&self, kind: MediaKind) -> Vec<&str> {
        self.entries(kind).keys().map(String::as_str).collect()
    }
}

fn extension_key(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    #[must_use]
    pub const fn mime_prefix(self) -> &'static str {
        match self {
            Self::Image => "image/",
            Self::Video => "video/",
        }
    }

    /// 對應的偵測端點路徑片段
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Linear,
    Svm,
    #[default]
    Knn,
}

impl ModelVariant {
    pub const ALL: [Self; 3] = [Self::Linear, Self::Svm, Self::Knn];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Svm => "svm",
            Self::Knn => "knn",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 偵測參數，送出前皆可修改
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub model_variant: ModelVariant,
    /// `None` 代表交給服務端自行決定（adaptive）
    pub frame_rate: Option<f64>,
    pub max_frames: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_variant: ModelVariant::default(),
            frame_rate: Some(15.0),
            max_frames: 30,
        }
    }
}

impl DetectionConfig {
    pub fn set_frame_rate(&mut self, frame_rate: Option<f64>) -> Result<(), ValidationError> {
        if let Some(rate) = frame_rate
            && !(rate.is_finite() && rate > 0.0 && rate <= MAX_FRAME_RATE)
        {
            return Err(ValidationError::InvalidParameter {
                name: "frame_rate",
                reason: format!("{rate} is outside (0, {MAX_FRAME_RATE}]"),
            });
        }
        self.frame_rate = frame_rate;
        Ok(())
    }

    pub fn set_max_frames(&mut self, max_frames: u32) -> Result<(), ValidationError> {
        if max_frames == 0 || max_frames > MAX_FRAMES_LIMIT {
            return Err(ValidationError::InvalidParameter {
                name: "max_frames",
                reason: format!("{max_frames} is outside 1..={MAX_FRAMES_LIMIT}"),
            });
        }
        self.max_frames = max_frames;
        Ok(())
    }

    /// 逐欄檢查，超出範圍的欄位改回預設值
    #[must_use]
    pub fn sanitized(self) -> Self {
        let mut checked = Self {
            model_variant: self.model_variant,
            ..Self::default()
        };
        if let Err(e) = checked.set_frame_rate(self.frame_rate) {
            warn!("設定檔的偵測參數無效，改用預設值: {e}");
        }
        if let Err(e) = checked.set_max_frames(self.max_frames) {
            warn!("設定檔的偵測參數無效，改用預設值: {e}");
        }
        checked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// 客戶端取樣張數，0 代表不取樣
    pub frame_count: usize,
    pub jpeg_quality: u8,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            frame_count: 9,
            jpeg_quality: 85,
        }
    }
}

impl SamplingSettings {
    pub fn check_frame_count(frame_count: usize) -> Result<usize, ValidationError> {
        if frame_count > MAX_SAMPLE_COUNT {
            return Err(ValidationError::InvalidParameter {
                name: "frame_count",
                reason: format!("{frame_count} is outside 0..={MAX_SAMPLE_COUNT}"),
            });
        }
        Ok(frame_count)
    }

    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let frame_count = Self::check_frame_count(self.frame_count).unwrap_or_else(|e| {
            warn!("設定檔的取樣張數無效，改用預設值: {e}");
            defaults.frame_count
        });
        Self {
            frame_count,
            jpeg_quality: self.jpeg_quality.clamp(1, 100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: String,
    /// 處理後影片的靜態檔案位置，未設定時為 `<base_url>/static`
    pub static_base: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            static_base: None,
            timeout_secs: 120,
        }
    }
}

impl ServiceSettings {
    #[must_use]
    pub fn static_base(&self) -> String {
        self.static_base.as_ref().map_or_else(
            || format!("{}/static", self.base_url.trim_end_matches('/')),
            |base| base.trim_end_matches('/').to_string(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub detection: DetectionConfig,
    pub sampling: SamplingSettings,
    pub service: ServiceSettings,
    /// 成功後是否把預覽交給結果畫面保管
    pub retain_preview: bool,
    pub recent_paths: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            language: Language::default(),
            detection: DetectionConfig::default(),
            sampling: SamplingSettings::default(),
            service: ServiceSettings::default(),
            retain_preview: true,
            recent_paths: Vec::new(),
        }
    }
}

impl UserSettings {
    /// 從設定檔讀入後套用與選單相同的範圍檢查
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            detection: self.detection.sanitized(),
            sampling: self.sampling.sanitized(),
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub media_type_table: MediaTypeTable,
    pub settings: UserSettings,
}
