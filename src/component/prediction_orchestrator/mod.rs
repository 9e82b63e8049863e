//! 預測流程協調元件
//!
//! 以明確的狀態機串接：
//! A. 影格取樣（僅影片）
//! B. 組成 multipart 請求並送出
//! C. 檢查回應欄位，產生 `DetectionResult`

mod client;
mod main;
mod request;
mod response;
mod state;

pub use client::{
    DetectionTransport, HttpDetectionClient, ModelCatalog, ModelDescriptor, ServiceHealth,
};
pub use main::{CliOrchestrator, OrchestratorOptions, PredictOutcome, PredictionOrchestrator};
pub use request::DetectionRequest;
pub use response::{DetectionResult, FrameAnnotation, Label, ProcessingInfo, RawResponse, interpret};
pub use state::{Event, OrchestrationState};
