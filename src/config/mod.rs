pub mod load;
pub mod save;
pub mod types;

pub use types::{
    Config, DetectionConfig, Language, MAX_FRAME_RATE, MAX_FRAMES_LIMIT, MAX_RECENT_PATHS,
    MAX_SAMPLE_COUNT, MAX_UPLOAD_BYTES, MediaKind, MediaTypeTable, ModelVariant,
    SamplingSettings, ServiceSettings, UserSettings,
};
