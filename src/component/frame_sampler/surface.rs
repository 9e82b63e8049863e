use crate::component::media_ingestion::AssetInfo;
use crate::error::SamplingError;
use crate::tools::RasterFrame;
use std::future::Future;

/// 一次 seek 請求；`seek_id` 用來辨識對應的完成通知
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekRequest {
    pub seek_id: u64,
    pub timestamp: f64,
}

/// 解碼面發出的 seek 通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeekEvent {
    Settled { seek_id: u64 },
    Failed { seek_id: u64, message: String },
}

impl SeekEvent {
    #[must_use]
    pub const fn seek_id(&self) -> u64 {
        match self {
            Self::Settled { seek_id } | Self::Failed { seek_id, .. } => *seek_id,
        }
    }
}

/// 非同步的解碼面
///
/// 協定：`seek` 只是發出請求，結果以 `next_event` 回報。
/// 同一時間只會有一個有效的 seek；被取代的 seek 仍可能送出通知，
/// 呼叫端必須依 `seek_id` 忽略它們。`Settled` 之後 `capture`
/// 取得目前解碼出的畫面。
pub trait DecodeSurface: Send {
    fn duration(&self) -> f64;

    fn dimensions(&self) -> (u32, u32);

    fn seek(&mut self, request: SeekRequest) -> Result<(), SamplingError>;

    /// 下一個通知；解碼面關閉時回傳 `None`
    fn next_event(&mut self) -> impl Future<Output = Option<SeekEvent>> + Send;

    fn capture(&mut self) -> Result<RasterFrame, SamplingError>;

    /// 釋放暫時資源；每個解碼面只會被呼叫一次
    fn release(&mut self);
}

/// 為媒體開啟解碼面
pub trait SurfaceOpener: Send + Sync {
    type Surface: DecodeSurface;

    fn open(
        &self,
        asset: &AssetInfo,
    ) -> impl Future<Output = Result<Self::Surface, SamplingError>> + Send;
}

/// 確保解碼面恰好釋放一次：正常結束時明確 `finish`，
/// 取樣 future 被中途丟棄時由 `Drop` 補上
pub(crate) struct SurfaceGuard<S: DecodeSurface> {
    surface: S,
    released: bool,
}

impl<S: DecodeSurface> SurfaceGuard<S> {
    pub(crate) const fn new(surface: S) -> Self {
        Self {
            surface,
            released: false,
        }
    }

    pub(crate) fn surface(&mut self) -> &mut S {
        &mut self.surface
    }

    pub(crate) fn finish(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.surface.release();
        }
    }
}

impl<S: DecodeSurface> Drop for SurfaceGuard<S> {
    fn drop(&mut self) {
        self.release_once();
    }
}
