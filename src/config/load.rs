use crate::config::types::{Config, MediaTypeTable, UserSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 編譯時嵌入的媒體類型表（不需要外部檔案）
const MEDIA_TYPE_TABLE_JSON: &str = include_str!("../data/media_type_table.json");

pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    pub fn new() -> Result<Self> {
        let media_type_table = Self::load_embedded_media_type_table()?;
        let settings = Self::load_settings(Path::new(SETTINGS_FILE)).unwrap_or_default();

        Ok(Self {
            media_type_table,
            settings,
        })
    }

    pub fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: UserSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        Ok(settings.sanitized())
    }

    /// 從編譯時嵌入的 JSON 載入媒體類型表
    pub fn load_embedded_media_type_table() -> Result<MediaTypeTable> {
        serde_json::from_str(MEDIA_TYPE_TABLE_JSON).context("無法解析嵌入的媒體類型設定")
    }
}
