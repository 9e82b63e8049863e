//! 偵測結果呈現元件
//!
//! 顯示 `DetectionResult`、匯出偽造影格，並提供「重新開始」操作

mod exporter;
mod main;

pub use exporter::{ExportSummary, SUMMARY_FILE, export_annotations};
pub use main::ResultPresenter;
