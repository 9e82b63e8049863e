use super::preview::{PreviewHandle, PreviewRegistry};
use crate::config::{MAX_UPLOAD_BYTES, MediaKind, MediaTypeTable};
use crate::error::ValidationError;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// 使用者提供的檔案
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    /// 呼叫端宣告的 MIME 類型；沒有時依副檔名推斷
    pub declared_type: Option<String>,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            declared_type: None,
        }
    }

    #[must_use]
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    fn file_name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |name| name.to_string_lossy().to_string(),
        )
    }
}

/// 媒體資訊（不含預覽，可自由複製）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub id: Uuid,
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub kind: MediaKind,
}

/// 目前作用中的媒體，擁有自己的預覽 handle
#[derive(Debug)]
pub struct MediaAsset {
    info: AssetInfo,
    preview: Option<PreviewHandle>,
}

impl MediaAsset {
    #[must_use]
    pub const fn info(&self) -> &AssetInfo {
        &self.info
    }

    #[must_use]
    pub fn preview_uri(&self) -> Option<&str> {
        self.preview.as_ref().map(PreviewHandle::uri)
    }

    #[must_use]
    pub fn preview_id(&self) -> Option<Uuid> {
        self.preview.as_ref().map(PreviewHandle::id)
    }

    /// 取出預覽，交由呼叫端釋放或轉交
    pub fn take_preview(&mut self) -> Option<PreviewHandle> {
        self.preview.take()
    }
}

pub struct MediaValidator {
    media_type_table: MediaTypeTable,
    previews: Arc<PreviewRegistry>,
    max_size_bytes: u64,
}

impl MediaValidator {
    #[must_use]
    pub const fn new(media_type_table: MediaTypeTable, previews: Arc<PreviewRegistry>) -> Self {
        Self {
            media_type_table,
            previews,
            max_size_bytes: MAX_UPLOAD_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    #[must_use]
    pub const fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.previews
    }

    #[must_use]
    pub const fn media_type_table(&self) -> &MediaTypeTable {
        &self.media_type_table
    }

    /// 驗證檔案並建立 `MediaAsset`
    ///
    /// 宣告類型必須屬於 `expected` 類別，且副檔名在允許清單內。
    /// 驗證通過才會發出預覽 handle。
    pub fn validate(
        &self,
        file: &MediaFile,
        expected: MediaKind,
    ) -> Result<MediaAsset, ValidationError> {
        let file_name = file.file_name();
        let declared_type = file
            .declared_type
            .clone()
            .or_else(|| {
                self.media_type_table
                    .guess_mime(&file.path)
                    .map(str::to_string)
            })
            .unwrap_or_default()
            .to_lowercase();

        if !declared_type.starts_with(expected.mime_prefix())
            || !self.media_type_table.is_allowed(expected, &file.path)
        {
            debug!("拒絕檔案 {file_name}: 類型 {declared_type:?}，預期 {expected}");
            return Err(ValidationError::InvalidFileType {
                file_name,
                declared_type,
            });
        }

        let size_bytes = read_size(&file.path)?;
        if size_bytes == 0 {
            return Err(ValidationError::Empty(file_name));
        }
        if size_bytes > self.max_size_bytes {
            return Err(ValidationError::TooLarge {
                size_bytes,
                limit_bytes: self.max_size_bytes,
            });
        }

        let preview = self.previews.issue(&file.path);
        let info = AssetInfo {
            id: Uuid::new_v4(),
            path: file.path.clone(),
            file_name,
            mime_type: declared_type,
            size_bytes,
            kind: expected,
        };
        info!(
            "媒體已驗證 {} ({}, {} bytes)",
            info.file_name, info.mime_type, info.size_bytes
        );

        Ok(MediaAsset {
            info,
            preview: Some(preview),
        })
    }
}

fn read_size(path: &Path) -> Result<u64, ValidationError> {
    let unreadable = |reason: String| ValidationError::Unreadable {
        path: path.display().to_string(),
        reason,
    };

    let metadata = fs::metadata(path).map_err(|e| unreadable(e.to_string()))?;
    if !metadata.is_file() {
        return Err(unreadable("not a regular file".to_string()));
    }
    Ok(metadata.len())
}
