//! 測試用的假解碼面與假傳輸層

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deepfake_probe::component::frame_sampler::{
    DecodeSurface, FrameSampler, SeekEvent, SeekRequest, SurfaceOpener,
};
use deepfake_probe::component::media_ingestion::{AssetInfo, MediaValidator, PreviewRegistry};
use deepfake_probe::component::prediction_orchestrator::{
    DetectionRequest, DetectionTransport, OrchestrationState, OrchestratorOptions,
    PredictionOrchestrator, RawResponse,
};
use deepfake_probe::config::Config;
use deepfake_probe::error::{PredictionError, SamplingError};
use deepfake_probe::tools::{FrameEncoder, RasterFrame};
use tempfile::TempDir;
use tokio::sync::{Notify, watch};

/// 假媒體的行為
#[derive(Debug, Clone, Copy, Default)]
pub struct StubMedia {
    pub duration: f64,
    /// 這個 seek 永遠不會完成
    pub block_at_seek: Option<u64>,
    pub fail_at_seek: Option<u64>,
}

impl StubMedia {
    pub fn video(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }
}

pub struct StubSurface {
    media: StubMedia,
    queue: VecDeque<SeekEvent>,
    current: Option<u64>,
    releases: Arc<AtomicUsize>,
}

impl DecodeSurface for StubSurface {
    fn duration(&self) -> f64 {
        self.media.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        (4, 2)
    }

    fn seek(&mut self, request: SeekRequest) -> Result<(), SamplingError> {
        let id = request.seek_id;
        self.current = Some(id);
        if self.media.block_at_seek == Some(id) {
            return Ok(());
        }
        if self.media.fail_at_seek == Some(id) {
            self.queue.push_back(SeekEvent::Failed {
                seek_id: id,
                message: "corrupt packet".to_string(),
            });
        } else {
            self.queue.push_back(SeekEvent::Settled { seek_id: id });
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<SeekEvent> {
        match self.queue.pop_front() {
            Some(event) => Some(event),
            None => std::future::pending().await,
        }
    }

    fn capture(&mut self) -> Result<RasterFrame, SamplingError> {
        Ok(RasterFrame {
            width: 4,
            height: 2,
            pixels: vec![self.current.unwrap_or(0) as u8; RasterFrame::expected_len(4, 2)],
        })
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// 依檔名決定假媒體行為的 opener
#[derive(Default)]
pub struct StubOpener {
    media: HashMap<String, StubMedia>,
    pub opened: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl StubOpener {
    pub fn new(media: &[(&str, StubMedia)]) -> Self {
        Self {
            media: media
                .iter()
                .map(|(name, media)| ((*name).to_string(), *media))
                .collect(),
            ..Self::default()
        }
    }
}

impl SurfaceOpener for StubOpener {
    type Surface = StubSurface;

    async fn open(&self, asset: &AssetInfo) -> Result<StubSurface, SamplingError> {
        let media = self
            .media
            .get(&asset.file_name)
            .copied()
            .ok_or_else(|| SamplingError::Open(format!("unknown media {}", asset.file_name)))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(StubSurface {
            media,
            queue: VecDeque::new(),
            current: None,
            releases: Arc::clone(&self.releases),
        })
    }
}

/// 依序回傳預先準備的回應，並記錄收到的請求
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<RawResponse, PredictionError>>>,
    gate: Option<Arc<Notify>>,
    pub requests: Arc<Mutex<Vec<DetectionRequest>>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<RawResponse, PredictionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// 每個請求都要等 `gate` 通知後才回應
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl DetectionTransport for ScriptedTransport {
    async fn send(&self, request: DetectionRequest) -> Result<RawResponse, PredictionError> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(PredictionError::Network("no scripted response".to_string())))
    }
}

pub type TestOrchestrator = PredictionOrchestrator<StubOpener, ScriptedTransport>;

pub struct Harness {
    pub orchestrator: Arc<TestOrchestrator>,
    pub previews: Arc<PreviewRegistry>,
    pub requests: Arc<Mutex<Vec<DetectionRequest>>>,
    pub surfaces_opened: Arc<AtomicUsize>,
    pub surface_releases: Arc<AtomicUsize>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(opener: StubOpener, transport: ScriptedTransport) -> Self {
        Self::with_options(
            opener,
            transport,
            OrchestratorOptions {
                sample_count: 3,
                ..OrchestratorOptions::default()
            },
        )
    }

    pub fn with_options(
        opener: StubOpener,
        transport: ScriptedTransport,
        options: OrchestratorOptions,
    ) -> Self {
        let table = Config::load_embedded_media_type_table().unwrap();
        let previews = PreviewRegistry::new();
        let validator = MediaValidator::new(table, Arc::clone(&previews));
        let surfaces_opened = Arc::clone(&opener.opened);
        let surface_releases = Arc::clone(&opener.releases);
        let requests = Arc::clone(&transport.requests);
        let sampler = FrameSampler::new(opener, FrameEncoder::default());

        Self {
            orchestrator: Arc::new(PredictionOrchestrator::new(
                validator, sampler, transport, options,
            )),
            previews,
            requests,
            surfaces_opened,
            surface_releases,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// 在暫存資料夾建立一個非空的媒體檔
    pub fn media(&self, name: &str) -> PathBuf {
        write_media(self.dir.path(), name)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn write_media(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"media-bytes").unwrap();
    path
}

/// 等待狀態機進入指定狀態
pub async fn wait_for_state(
    states: &mut watch::Receiver<OrchestrationState>,
    target: OrchestrationState,
) {
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| *s == target))
        .await
        .expect("等待狀態逾時")
        .expect("狀態通道已關閉");
}

pub fn ok(body: &str) -> Result<RawResponse, PredictionError> {
    Ok(RawResponse::new(200, body))
}

pub const IMAGE_FAKE: &str =
    r#"{"result":{"prediction":"fake","is_fake":true,"confidence":0.93},"model_used":"knn"}"#;

pub const VIDEO_REAL: &str = r#"{
    "filename": "clip.mp4",
    "model_used": "knn",
    "processing_info": {"frames_extracted": 10, "frame_rate_used": 15.0, "max_frames_limit": 30},
    "result": {"overall_prediction": "Real", "fake_percentage": 10.0, "total_frames": 10}
}"#;
