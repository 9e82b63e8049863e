//! 媒體匯入元件
//!
//! 驗證使用者選取的檔案，並為通過驗證的媒體建立受管理的預覽 handle

mod preview;
mod validator;

pub use preview::{PreviewHandle, PreviewRegistry, RetainedPreview};
pub use validator::{AssetInfo, MediaAsset, MediaFile, MediaValidator};
