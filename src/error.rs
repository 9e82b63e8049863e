//! 錯誤分類
//!
//! - `ValidationError`：檔案或參數不合法，該次選取直接結束
//! - `SamplingError`：seek / 解碼失敗，降級為較少（或零）張影格後繼續
//! - `PredictionError`：送出請求後的失敗，一律讓狀態機進入 Failed

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 宣告的 MIME 類型或副檔名不在允許清單內
    #[error("invalid file type: {file_name} ({declared_type})")]
    InvalidFileType {
        file_name: String,
        declared_type: String,
    },

    #[error("file is empty: {0}")]
    Empty(String),

    #[error("file too large: {size_bytes} bytes (limit {limit_bytes})")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("cannot read file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("cannot open media for decoding: {0}")]
    Open(String),

    #[error("seek to {timestamp:.3}s failed: {message}")]
    Seek { timestamp: f64, message: String },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("frame encoding failed: {0}")]
    Encode(String),

    #[error("decode surface already released")]
    SurfaceReleased,

    #[error("decode surface closed before the seek settled")]
    SurfaceClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    /// 連線失敗或逾時
    #[error("network error: {0}")]
    Network(String),

    /// 非 2xx 回應，附帶服務端提供的說明
    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// 2xx 回應但內容不符合格式
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// 送出前無法讀取原始媒體檔
    #[error("media unavailable: {0}")]
    MediaUnavailable(String),
}

impl PredictionError {
    #[must_use]
    pub fn malformed(field: &str) -> Self {
        Self::MalformedResponse(format!("missing required field `{field}`"))
    }
}
