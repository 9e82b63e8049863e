use crate::component::prediction_orchestrator::DetectionResult;
use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "result.json";

/// 匯出結果
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub annotations: usize,
    pub samples: usize,
    pub skipped: usize,
}

/// 把偽造影格與取樣預覽解碼成 JPEG，並寫出結果摘要
///
/// 無法解碼的單張影格只記錄警告並跳過。
pub fn export_annotations(result: &DetectionResult, output_dir: &Path) -> Result<ExportSummary> {
    prepare_output_dir(output_dir)?;

    let mut summary = ExportSummary::default();

    for annotation in &result.per_frame_annotations {
        let path = output_dir.join(format!("fake_frame_{:04}.jpg", annotation.frame_index));
        if write_encoded(&annotation.image_encoding, &path)? {
            summary.annotations += 1;
            summary.files.push(path);
        } else {
            summary.skipped += 1;
        }
    }

    for frame in &result.preview_frames {
        let path = output_dir.join(format!(
            "sample_{:02}_{:.2}s.jpg",
            frame.index, frame.timestamp_seconds
        ));
        if write_encoded(&frame.image_encoding, &path)? {
            summary.samples += 1;
            summary.files.push(path);
        } else {
            summary.skipped += 1;
        }
    }

    let summary_path = output_dir.join(SUMMARY_FILE);
    let content = serde_json::to_string_pretty(result).context("無法序列化偵測結果")?;
    fs::write(&summary_path, content)
        .with_context(|| format!("無法寫入 {}", summary_path.display()))?;
    summary.files.push(summary_path);

    info!(
        "匯出完成: {} 個偽造影格, {} 張取樣, 跳過 {}",
        summary.annotations, summary.samples, summary.skipped
    );

    Ok(summary)
}

/// 匯出資料夾不存在時建立；已存在但不是資料夾時失敗
fn prepare_output_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        bail!("匯出路徑不是資料夾: {}", path.display());
    }
    fs::create_dir_all(path).with_context(|| format!("無法建立 {}", path.display()))
}

fn write_encoded(encoded: &str, path: &Path) -> Result<bool> {
    let bytes = match STANDARD.decode(encoded.trim()) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => {
            warn!("影格內容為空，跳過 {}", path.display());
            return Ok(false);
        }
        Err(e) => {
            warn!("無法解碼影格 {}: {e}", path.display());
            return Ok(false);
        }
    };

    fs::write(path, bytes).with_context(|| format!("無法寫入 {}", path.display()))?;
    Ok(true)
}
