use super::surface::{DecodeSurface, SeekEvent, SeekRequest, SurfaceOpener};
use crate::component::media_ingestion::AssetInfo;
use crate::error::SamplingError;
use crate::tools::{RasterFrame, VideoInfo, get_video_info};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 兩段式 seek 的前置緩衝時間（秒）
const SEEK_MARGIN: f64 = 2.0;

enum DecodeMessage {
    Settled { seek_id: u64, pixels: Vec<u8> },
    Failed { seek_id: u64, message: String },
}

/// 以 ffmpeg 實作的解碼面
///
/// 每次 seek 在背景啟動一個 ffmpeg，把目標時間點的畫面以 rgb24
/// 原始格式輸出；完成後透過 channel 回報。新的 seek 會中止舊的程序。
pub struct FfmpegSurface {
    video_path: PathBuf,
    info: VideoInfo,
    events_tx: mpsc::UnboundedSender<DecodeMessage>,
    events_rx: mpsc::UnboundedReceiver<DecodeMessage>,
    latest_seek: Option<u64>,
    in_flight: Option<JoinHandle<()>>,
    decoded: Option<Vec<u8>>,
    released: bool,
}

impl FfmpegSurface {
    #[must_use]
    pub fn new(video_path: &Path, info: VideoInfo) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            video_path: video_path.to_path_buf(),
            info,
            events_tx,
            events_rx,
            latest_seek: None,
            in_flight: None,
            decoded: None,
            released: false,
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

impl DecodeSurface for FfmpegSurface {
    fn duration(&self) -> f64 {
        self.info.duration_seconds
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn seek(&mut self, request: SeekRequest) -> Result<(), SamplingError> {
        if self.released {
            return Err(SamplingError::SurfaceReleased);
        }

        // 舊的 seek 被取代；它若已送出通知，會因 seek_id 不符而被忽略
        self.abort_in_flight();
        self.latest_seek = Some(request.seek_id);
        self.decoded = None;

        let video_path = self.video_path.clone();
        let (width, height) = self.dimensions();
        let events_tx = self.events_tx.clone();

        self.in_flight = Some(tokio::spawn(async move {
            let message = match decode_picture(&video_path, request.timestamp, width, height).await
            {
                Ok(pixels) => DecodeMessage::Settled {
                    seek_id: request.seek_id,
                    pixels,
                },
                Err(message) => DecodeMessage::Failed {
                    seek_id: request.seek_id,
                    message,
                },
            };
            // 接收端已關閉代表解碼面已釋放
            let _ = events_tx.send(message);
        }));

        Ok(())
    }

    async fn next_event(&mut self) -> Option<SeekEvent> {
        let message = self.events_rx.recv().await?;
        Some(match message {
            DecodeMessage::Settled { seek_id, pixels } => {
                if self.latest_seek == Some(seek_id) {
                    self.decoded = Some(pixels);
                }
                SeekEvent::Settled { seek_id }
            }
            DecodeMessage::Failed { seek_id, message } => SeekEvent::Failed { seek_id, message },
        })
    }

    fn capture(&mut self) -> Result<RasterFrame, SamplingError> {
        let pixels = self
            .decoded
            .take()
            .ok_or_else(|| SamplingError::Decode("no decoded picture to capture".to_string()))?;

        Ok(RasterFrame {
            width: self.info.width,
            height: self.info.height,
            pixels,
        })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.abort_in_flight();
        self.events_rx.close();
        self.decoded = None;
        debug!("已釋放解碼面: {}", self.video_path.display());
    }
}

/// 擷取單一畫面（使用兩段式 seek 加速）
///
/// 1. `-ss` 在 `-i` 前：快速跳轉到最近的關鍵幀
/// 2. `-ss` 在 `-i` 後：精準解碼到目標時間點
///
/// 不縮放，輸出尺寸必須等於原生解析度。
async fn decode_picture(
    video_path: &Path,
    timestamp: f64,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, String> {
    let args = build_decode_args(video_path, timestamp);
    debug!("擷取畫面: timestamp={timestamp:.3}s");

    let output = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("無法執行 ffmpeg: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("ffmpeg 擷取畫面失敗: {}", stderr.trim()));
    }

    let expected = RasterFrame::expected_len(width, height);
    if output.stdout.len() != expected {
        return Err(format!(
            "畫面大小不符: 取得 {} bytes，預期 {expected} bytes（{width}x{height}）",
            output.stdout.len()
        ));
    }

    Ok(output.stdout)
}

fn build_decode_args(video_path: &Path, timestamp: f64) -> Vec<String> {
    let t0 = (timestamp - SEEK_MARGIN).max(0.0);
    let delta = timestamp - t0;

    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-noautorotate".to_string(),
    ];

    if t0 > 0.0 {
        args.push("-ss".to_string());
        args.push(format!("{t0:.3}"));
    }

    args.push("-i".to_string());
    args.push(video_path.to_string_lossy().to_string());

    if delta > 0.0 {
        args.push("-ss".to_string());
        args.push(format!("{delta:.3}"));
    }

    args.extend(
        [
            "-frames:v",
            "1",
            "-an",
            "-sn",
            "-dn",
            "-threads",
            "1",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "pipe:1",
        ]
        .map(String::from),
    );

    args
}

/// 以 ffprobe 取得長度與解析度後開啟 `FfmpegSurface`
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl SurfaceOpener for FfmpegOpener {
    type Surface = FfmpegSurface;

    async fn open(&self, asset: &AssetInfo) -> Result<FfmpegSurface, SamplingError> {
        let info = get_video_info(&asset.path)
            .await
            .map_err(|e| SamplingError::Open(format!("{e:#}")))?;

        debug!(
            "開啟解碼面 {}: {:.2}s, {}x{}, {:.2} fps",
            asset.file_name, info.duration_seconds, info.width, info.height, info.frame_rate
        );

        Ok(FfmpegSurface::new(&asset.path, info))
    }
}
