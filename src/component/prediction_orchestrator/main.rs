use super::client::{DetectionTransport, HttpDetectionClient};
use super::request::DetectionRequest;
use super::response::{DetectionResult, interpret};
use super::state::{Event, OrchestrationState};
use crate::component::frame_sampler::{FfmpegOpener, FrameSampler, SampleFrame, SurfaceOpener};
use crate::component::media_ingestion::{
    AssetInfo, MediaAsset, MediaFile, MediaValidator, PreviewRegistry, RetainedPreview,
};
use crate::config::{DetectionConfig, MediaKind, ModelVariant, SamplingSettings};
use crate::error::{PredictionError, SamplingError, ValidationError};
use crate::tools::{GenerationCounter, GenerationToken};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

/// 命令列介面使用的協調器
pub type CliOrchestrator = PredictionOrchestrator<FfmpegOpener, HttpDetectionClient>;

/// `predict()` 的結果
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    Succeeded,
    Failed(PredictionError),
    /// 執行期間媒體被替換或重設，結果已丟棄
    Superseded,
    /// 已有進行中的預測，這次呼叫不做任何事
    AlreadyRunning,
    NoAsset,
    /// 目前結果已成功，需選擇新媒體或重設
    Ignored,
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    pub config: DetectionConfig,
    /// 客戶端取樣張數，0 代表不取樣
    pub sample_count: usize,
    pub retain_preview: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            config: DetectionConfig::default(),
            sample_count: 9,
            retain_preview: true,
        }
    }
}

struct Inner {
    state: OrchestrationState,
    asset: Option<MediaAsset>,
    options: OrchestratorOptions,
    result: Option<DetectionResult>,
    retained: Option<RetainedPreview>,
    last_error: Option<PredictionError>,
    sampling_warning: Option<SamplingError>,
}

/// 預測流程協調器
///
/// 以狀態機串接取樣與遠端請求：
/// AwaitingFile → Sampling → Submitting → Succeeded / Failed
///
/// 狀態只在內部鎖內修改；每個非同步步驟都帶著開始時的媒體世代，
/// 完成時世代不符就丟棄結果。
pub struct PredictionOrchestrator<O: SurfaceOpener, T: DetectionTransport> {
    validator: MediaValidator,
    sampler: FrameSampler<O>,
    transport: T,
    generations: GenerationCounter,
    state_tx: watch::Sender<OrchestrationState>,
    inner: Mutex<Inner>,
}

impl<O: SurfaceOpener, T: DetectionTransport> PredictionOrchestrator<O, T> {
    pub fn new(
        validator: MediaValidator,
        sampler: FrameSampler<O>,
        transport: T,
        options: OrchestratorOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(OrchestrationState::Idle);
        let options = OrchestratorOptions {
            config: options.config.sanitized(),
            sample_count: SamplingSettings::check_frame_count(options.sample_count)
                .unwrap_or_else(|e| {
                    warn!("取樣張數無效，改用預設值: {e}");
                    OrchestratorOptions::default().sample_count
                }),
            ..options
        };
        Self {
            validator,
            sampler,
            transport,
            generations: GenerationCounter::new(),
            state_tx,
            inner: Mutex::new(Inner {
                state: OrchestrationState::Idle,
                asset: None,
                options,
                result: None,
                retained: None,
                last_error: None,
                sampling_warning: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, inner: &mut Inner, event: Event) -> bool {
        let Some(next) = inner.state.next(event) else {
            warn!("忽略不合法的狀態轉換: {} + {event:?}", inner.state);
            return false;
        };
        debug!("狀態 {} -> {next} ({event:?})", inner.state);
        inner.state = next;
        self.state_tx.send_replace(next);
        true
    }

    /// 釋放目前媒體與結果畫面持有的預覽，清除結果與錯誤
    fn clear(inner: &mut Inner) {
        if let Some(preview) = inner.asset.as_mut().and_then(MediaAsset::take_preview) {
            preview.release();
        }
        inner.asset = None;
        if let Some(retained) = inner.retained.take() {
            retained.release();
        }
        inner.result = None;
        inner.last_error = None;
        inner.sampling_warning = None;
    }

    /// 驗證並設定新媒體
    ///
    /// 驗證失敗時目前狀態不變。成功時取代任何進行中的工作，
    /// 舊媒體的預覽先釋放，再設定新媒體。
    pub fn select_file(
        &self,
        file: &MediaFile,
        kind: MediaKind,
    ) -> Result<AssetInfo, ValidationError> {
        let asset = self.validator.validate(file, kind)?;
        let info = asset.info().clone();

        let mut inner = self.lock();
        let superseded = self.generations.advance();
        if inner.state.is_in_flight() {
            info!("新媒體取代進行中的預測（世代 {superseded}）");
        }
        Self::clear(&mut inner);
        inner.asset = Some(asset);
        self.apply(&mut inner, Event::AssetValidated);

        Ok(info)
    }

    pub fn select_model(&self, model_variant: ModelVariant) {
        self.lock().options.config.model_variant = model_variant;
    }

    pub fn select_frame_rate(&self, frame_rate: Option<f64>) -> Result<(), ValidationError> {
        self.lock().options.config.set_frame_rate(frame_rate)
    }

    pub fn select_max_frames(&self, max_frames: u32) -> Result<(), ValidationError> {
        self.lock().options.config.set_max_frames(max_frames)
    }

    pub fn set_sample_count(&self, sample_count: usize) -> Result<(), ValidationError> {
        self.lock().options.sample_count = SamplingSettings::check_frame_count(sample_count)?;
        Ok(())
    }

    pub fn set_retain_preview(&self, retain_preview: bool) {
        self.lock().options.retain_preview = retain_preview;
    }

    /// 執行一次預測：取樣、送出、檢查回應
    ///
    /// 進行中再次呼叫不會發出第二個請求。重試一律由使用者觸發。
    pub async fn predict(&self) -> PredictOutcome {
        let (info, options, token) = {
            let mut inner = self.lock();
            match inner.state {
                OrchestrationState::Sampling | OrchestrationState::Submitting => {
                    debug!("預測進行中，忽略 predict()");
                    return PredictOutcome::AlreadyRunning;
                }
                OrchestrationState::Idle => return PredictOutcome::NoAsset,
                OrchestrationState::Succeeded => return PredictOutcome::Ignored,
                OrchestrationState::AwaitingFile | OrchestrationState::Failed => {}
            }
            let Some(info) = inner.asset.as_ref().map(|asset| asset.info().clone()) else {
                return PredictOutcome::NoAsset;
            };

            inner.result = None;
            inner.last_error = None;
            inner.sampling_warning = None;
            self.apply(&mut inner, Event::Predict);
            (info, inner.options, self.generations.token())
        };

        let sampling = self
            .sampler
            .extract_frames(&info, options.sample_count, &token)
            .await;
        if sampling.cancelled {
            debug!("取樣已被取代: {}", info.file_name);
            return PredictOutcome::Superseded;
        }

        {
            let mut inner = self.lock();
            if !token.is_current() {
                return PredictOutcome::Superseded;
            }
            inner.sampling_warning = sampling.failure;
            self.apply(&mut inner, Event::SamplingSettled);
        }

        let request = DetectionRequest::new(&info, options.config);
        let mut watcher = token.clone();
        let response = tokio::select! {
            biased;
            () = watcher.superseded() => {
                debug!("請求已被取代: {}", info.file_name);
                return PredictOutcome::Superseded;
            }
            response = self.transport.send(request) => response,
        };

        let verdict = response.and_then(|raw| interpret(&info, &raw));
        self.settle(&token, verdict, sampling.frames)
    }

    fn settle(
        &self,
        token: &GenerationToken,
        verdict: Result<DetectionResult, PredictionError>,
        frames: Vec<SampleFrame>,
    ) -> PredictOutcome {
        let mut inner = self.lock();
        if !token.is_current() {
            debug!("丟棄過期的回應（世代 {}）", token.generation());
            return PredictOutcome::Superseded;
        }

        let preview = inner.asset.as_mut().and_then(MediaAsset::take_preview);

        match verdict {
            Ok(mut result) => {
                result.preview_frames = frames;
                inner.retained = match preview {
                    Some(preview) if inner.options.retain_preview => Some(preview.retain()),
                    Some(preview) => {
                        preview.release();
                        None
                    }
                    None => None,
                };
                info!(
                    "預測完成: {} ({:.1}% fake, {} frames)",
                    result.overall_label, result.fake_percentage, result.total_frames
                );
                inner.result = Some(result);
                self.apply(&mut inner, Event::ResponseAccepted);
                PredictOutcome::Succeeded
            }
            Err(error) => {
                if let Some(preview) = preview {
                    preview.release();
                }
                warn!("預測失敗: {error}");
                inner.last_error = Some(error.clone());
                self.apply(&mut inner, Event::ResponseRejected);
                PredictOutcome::Failed(error)
            }
        }
    }

    /// 回到 Idle，釋放所有資源並讓進行中的工作失效
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.generations.advance();
        Self::clear(&mut inner);
        self.apply(&mut inner, Event::Reset);
    }

    /// 只在預測進行中時重設；回傳是否有中止
    pub fn abandon(&self) -> bool {
        let mut inner = self.lock();
        if !inner.state.is_in_flight() {
            return false;
        }
        warn!("中止進行中的預測");
        self.generations.advance();
        Self::clear(&mut inner);
        self.apply(&mut inner, Event::Reset);
        true
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrchestrationState> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> OrchestrationState {
        self.lock().state
    }

    #[must_use]
    pub fn asset(&self) -> Option<AssetInfo> {
        self.lock().asset.as_ref().map(|asset| asset.info().clone())
    }

    #[must_use]
    pub fn config(&self) -> DetectionConfig {
        self.lock().options.config
    }

    #[must_use]
    pub fn options(&self) -> OrchestratorOptions {
        self.lock().options
    }

    #[must_use]
    pub fn result(&self) -> Option<DetectionResult> {
        self.lock().result.clone()
    }

    #[must_use]
    pub fn retained_preview_uri(&self) -> Option<String> {
        self.lock()
            .retained
            .as_ref()
            .map(|preview| preview.uri().to_string())
    }

    /// 目前媒體的預覽 id；成功並保留後為結果畫面持有的 id
    #[must_use]
    pub fn preview_id(&self) -> Option<Uuid> {
        let inner = self.lock();
        inner
            .asset
            .as_ref()
            .and_then(MediaAsset::preview_id)
            .or_else(|| inner.retained.as_ref().map(RetainedPreview::id))
    }

    #[must_use]
    pub fn last_error(&self) -> Option<PredictionError> {
        self.lock().last_error.clone()
    }

    #[must_use]
    pub fn sampling_warning(&self) -> Option<SamplingError> {
        self.lock().sampling_warning.clone()
    }

    #[must_use]
    pub fn previews(&self) -> Arc<PreviewRegistry> {
        Arc::clone(self.validator.previews())
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generations.current()
    }
}
