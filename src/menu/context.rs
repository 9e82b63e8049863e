use crate::component::frame_sampler::FfmpegOpener;
use crate::component::media_ingestion::PreviewRegistry;
use crate::component::prediction_orchestrator::{HttpDetectionClient, OrchestratorOptions};
use crate::component::{CliOrchestrator, FrameSampler, MediaValidator, ResultPresenter};
use crate::config::Config;
use crate::tools::FrameEncoder;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// 選單共用的執行環境
///
/// 選單本身是同步的，非同步工作一律透過 `runtime.block_on` 執行。
pub struct AppContext {
    pub runtime: Runtime,
    pub orchestrator: Arc<CliOrchestrator>,
    pub client: HttpDetectionClient,
    pub presenter: ResultPresenter,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("無法建立 tokio runtime")?;

        let settings = &config.settings;
        let client = HttpDetectionClient::new(&settings.service)
            .context("無法建立偵測服務 client")?;

        let validator = MediaValidator::new(config.media_type_table.clone(), PreviewRegistry::new());
        let sampler = FrameSampler::new(
            FfmpegOpener,
            FrameEncoder::new(settings.sampling.jpeg_quality),
        );
        let options = OrchestratorOptions {
            config: settings.detection,
            sample_count: settings.sampling.frame_count,
            retain_preview: settings.retain_preview,
        };

        let orchestrator = Arc::new(CliOrchestrator::new(
            validator,
            sampler,
            client.clone(),
            options,
        ));

        Ok(Self {
            runtime,
            orchestrator,
            client,
            presenter: ResultPresenter::new(&settings.service),
        })
    }
}
