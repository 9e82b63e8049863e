use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

#[derive(Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// 以 ffprobe 讀取第一條視訊串流的長度、原始解析度與幀率
///
/// 解碼端以 `-noautorotate` 輸出，因此這裡回報的是未旋轉的尺寸。
pub async fn get_video_info(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-of", "json"])
        .args([
            "-show_entries",
            "stream=width,height,r_frame_rate,duration:format=duration",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe 無法讀取 {}: {}", path.display(), stderr.trim());
    }

    parse_probe_report(&output.stdout)
        .with_context(|| format!("無法解析影片資訊: {}", path.display()))
}

fn parse_probe_report(stdout: &[u8]) -> Result<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(stdout).context("ffprobe 輸出不是 JSON")?;

    let Some(stream) = report.streams.first() else {
        bail!("沒有視訊串流");
    };
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        bail!("視訊串流缺少解析度");
    };
    if width == 0 || height == 0 {
        bail!("解析度不合法: {width}x{height}");
    }

    // 容器長度優先；都沒有時視為 0，取樣端會回傳空結果
    let duration_seconds = report
        .format
        .and_then(|format| format.duration)
        .or_else(|| stream.duration.clone())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration_seconds,
        width,
        height,
        frame_rate,
    })
}

/// `30000/1001` 這類分數或純數字；`0/0` 視為未知
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num.parse::<f64>().ok()? / den
        }
        None => rate.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}
