use crate::component::frame_sampler::SurfaceOpener;
use crate::component::prediction_orchestrator::{
    DetectionResult, DetectionTransport, Label, PredictionOrchestrator,
};
use crate::config::{MediaKind, ServiceSettings};
use console::style;
use rust_i18n::t;

/// 偵測結果畫面
///
/// 只讀取協調器的輸出；`restart` 是唯一回傳給協調器的操作。
#[derive(Debug, Clone)]
pub struct ResultPresenter {
    static_base: String,
}

impl ResultPresenter {
    #[must_use]
    pub fn new(service: &ServiceSettings) -> Self {
        Self {
            static_base: service.static_base(),
        }
    }

    /// 處理後影片在靜態檔案伺服器上的位置
    #[must_use]
    pub fn artifact_url(&self, filename: &str) -> String {
        format!("{}/{}", self.static_base, filename.trim_start_matches('/'))
    }

    /// 產生結果畫面文字，標籤依目前語系
    #[must_use]
    pub fn render(&self, result: &DetectionResult, preview_uri: Option<&str>) -> String {
        let mut lines = vec![style(t!("result.view.title")).cyan().bold().to_string()];

        if let Some(filename) = &result.source_filename {
            lines.push(format!("{} {filename}", t!("result.view.file")));
        }
        if let Some(model) = &result.model_used {
            lines.push(format!("{} {model}", t!("result.view.model")));
        }

        let verdict = match result.overall_label {
            Label::Fake => style("FAKE").red().bold(),
            Label::Real => style("REAL").green().bold(),
        };
        lines.push(format!("{} {verdict}", t!("result.view.verdict")));

        if let Some(confidence) = result.confidence {
            lines.push(format!(
                "{} {:.1}%",
                t!("result.view.confidence"),
                confidence * 100.0
            ));
        }

        if result.media_kind == MediaKind::Video {
            lines.extend(self.video_lines(result));
        }

        if let Some(uri) = preview_uri {
            lines.push(style(t!("result.view.preview", uri = uri)).dim().to_string());
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn video_lines(&self, result: &DetectionResult) -> Vec<String> {
        let mut lines = vec![
            t!(
                "result.view.fake_share",
                percent = format!("{:.1}", result.fake_percentage),
                frames = result.total_frames
            )
            .to_string(),
        ];

        if let Some(info) = &result.processing_info {
            let rate = info.frame_rate_used.map_or_else(
                || t!("result.view.adaptive").to_string(),
                |rate| format!("{rate} fps"),
            );
            lines.push(
                t!(
                    "result.view.processing",
                    frames = info.frames_extracted,
                    rate = rate,
                    limit = info.max_frames_limit
                )
                .to_string(),
            );
        }

        if !result.per_frame_annotations.is_empty() {
            lines.push(t!("result.view.flagged_frames").to_string());
            lines.extend(result.per_frame_annotations.iter().map(|annotation| {
                format!(
                    "  #{} {} ({:.1}%)",
                    annotation.frame_index,
                    annotation.label,
                    annotation.confidence * 100.0
                )
            }));
        }

        if !result.preview_frames.is_empty() {
            let timestamps: Vec<String> = result
                .preview_frames
                .iter()
                .map(|frame| format!("{:.2}s", frame.timestamp_seconds))
                .collect();
            lines.push(
                t!(
                    "result.view.samples",
                    count = result.preview_frames.len(),
                    timestamps = timestamps.join(", ")
                )
                .to_string(),
            );
        }

        if let Some(filename) = &result.source_filename {
            lines.push(format!(
                "{} {}",
                t!("result.view.artifact"),
                self.artifact_url(filename)
            ));
        }

        lines
    }

    /// 「重新開始」：轉交給協調器的 `reset()`
    pub fn restart<O: SurfaceOpener, T: DetectionTransport>(
        &self,
        orchestrator: &PredictionOrchestrator<O, T>,
    ) {
        orchestrator.reset();
    }
}
