use super::surface::{DecodeSurface, SeekEvent, SeekRequest, SurfaceGuard, SurfaceOpener};
use super::timestamp_plan::plan_timestamps;
use crate::component::media_ingestion::AssetInfo;
use crate::config::MediaKind;
use crate::error::SamplingError;
use crate::tools::{FrameEncoder, GenerationToken};
use log::{debug, info, warn};
use serde::Serialize;

/// 取樣得到的一張靜態畫面，產生後不再改變
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleFrame {
    pub index: usize,
    pub timestamp_seconds: f64,
    /// base64 編碼的 JPEG
    pub image_encoding: String,
    pub width: u32,
    pub height: u32,
}

/// 取樣結果
///
/// 失敗時 `frames` 保留失敗前已擷取的部分；被取代時 `frames` 一律為空。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingOutcome {
    pub frames: Vec<SampleFrame>,
    pub failure: Option<SamplingError>,
    pub cancelled: bool,
}

impl SamplingOutcome {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    fn failed(failure: SamplingError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

enum Settle {
    Ready,
    Failed(SamplingError),
    Cancelled,
}

/// 在解碼面上依序 seek 並擷取畫面
///
/// 嚴格單一槽位：上一個 seek 完成並擷取之前不會發出下一個 seek。
/// 解碼面在回傳前恰好釋放一次；future 被中途丟棄時由 guard 釋放。
pub async fn extract_frames<S: DecodeSurface>(
    surface: S,
    count: usize,
    token: &GenerationToken,
    encoder: &FrameEncoder,
) -> SamplingOutcome {
    let mut guard = SurfaceGuard::new(surface);
    let outcome = run_pipeline(guard.surface(), count, token.clone(), encoder).await;
    guard.finish();
    outcome
}

async fn run_pipeline<S: DecodeSurface>(
    surface: &mut S,
    count: usize,
    mut token: GenerationToken,
    encoder: &FrameEncoder,
) -> SamplingOutcome {
    let duration = surface.duration();
    let timestamps = plan_timestamps(duration, count);
    debug!(
        "取樣計畫: {duration:.2}s 內 {} 個時間點（要求 {count}）",
        timestamps.len()
    );

    let mut outcome = SamplingOutcome::default();

    for (index, timestamp) in timestamps.into_iter().enumerate() {
        if !token.is_current() {
            return SamplingOutcome::cancelled();
        }

        let seek_id = index as u64 + 1;
        if let Err(e) = surface.seek(SeekRequest { seek_id, timestamp }) {
            outcome.failure = Some(e);
            break;
        }

        match await_settled(surface, seek_id, timestamp, &mut token).await {
            Settle::Ready => {}
            Settle::Cancelled => return SamplingOutcome::cancelled(),
            Settle::Failed(e) => {
                outcome.failure = Some(e);
                break;
            }
        }

        let frame = capture_frame(surface, encoder).map(|(width, height, image_encoding)| {
            SampleFrame {
                index,
                timestamp_seconds: timestamp,
                image_encoding,
                width,
                height,
            }
        });

        // 擷取期間媒體可能已被替換
        if !token.is_current() {
            return SamplingOutcome::cancelled();
        }

        match frame {
            Ok(frame) => outcome.frames.push(frame),
            Err(e) => {
                outcome.failure = Some(e);
                break;
            }
        }
    }

    if let Some(failure) = &outcome.failure {
        warn!(
            "取樣中止，保留 {} 張畫面: {failure}",
            outcome.frames.len()
        );
    } else {
        info!("取樣完成: {} 張畫面", outcome.frames.len());
    }

    outcome
}

/// 等待指定 seek 的完成通知，忽略被取代的 seek 送來的通知
async fn await_settled<S: DecodeSurface>(
    surface: &mut S,
    seek_id: u64,
    timestamp: f64,
    token: &mut GenerationToken,
) -> Settle {
    loop {
        let event = tokio::select! {
            biased;
            () = token.superseded() => return Settle::Cancelled,
            event = surface.next_event() => event,
        };

        match event {
            None => return Settle::Failed(SamplingError::SurfaceClosed),
            Some(event) if event.seek_id() != seek_id => {
                debug!("忽略過期的 seek 通知 #{}", event.seek_id());
            }
            Some(SeekEvent::Settled { .. }) => return Settle::Ready,
            Some(SeekEvent::Failed { message, .. }) => {
                return Settle::Failed(SamplingError::Seek { timestamp, message });
            }
        }
    }
}

fn capture_frame<S: DecodeSurface>(
    surface: &mut S,
    encoder: &FrameEncoder,
) -> Result<(u32, u32, String), SamplingError> {
    let (width, height) = surface.dimensions();
    let raster = surface.capture()?;
    if (raster.width, raster.height) != (width, height) {
        return Err(SamplingError::Decode(format!(
            "raster is {}x{}, source is {width}x{height}",
            raster.width, raster.height
        )));
    }
    let encoded = encoder.encode(&raster)?;
    Ok((width, height, encoded))
}

/// 從媒體開啟解碼面並取樣
pub struct FrameSampler<O: SurfaceOpener> {
    opener: O,
    encoder: FrameEncoder,
}

impl<O: SurfaceOpener> FrameSampler<O> {
    #[must_use]
    pub const fn new(opener: O, encoder: FrameEncoder) -> Self {
        Self { opener, encoder }
    }

    /// 圖片或 `count == 0` 直接回傳空結果；開啟失敗視為降級而非錯誤
    pub async fn extract_frames(
        &self,
        asset: &AssetInfo,
        count: usize,
        token: &GenerationToken,
    ) -> SamplingOutcome {
        if count == 0 || asset.kind != MediaKind::Video {
            return SamplingOutcome::default();
        }

        let mut watcher = token.clone();
        let opened = tokio::select! {
            biased;
            () = watcher.superseded() => return SamplingOutcome::cancelled(),
            opened = self.opener.open(asset) => opened,
        };

        match opened {
            Ok(surface) => extract_frames(surface, count, token, &self.encoder).await,
            Err(e) => {
                warn!("無法開啟 {} 進行取樣: {e}", asset.file_name);
                SamplingOutcome::failed(e)
            }
        }
    }
}
