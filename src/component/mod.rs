//! 功能元件模組
//!
//! 媒體匯入 → 影格取樣（由協調器呼叫）→ 遠端偵測 → 結果呈現

pub mod frame_sampler;
pub mod media_ingestion;
pub mod prediction_orchestrator;
pub mod result_presenter;

pub use frame_sampler::FrameSampler;
pub use media_ingestion::MediaValidator;
pub use prediction_orchestrator::{CliOrchestrator, PredictionOrchestrator};
pub use result_presenter::ResultPresenter;
