mod ffprobe_info;
mod frame_encoder;
mod generation;

pub use ffprobe_info::{VideoInfo, get_video_info};
pub use frame_encoder::{FrameEncoder, RasterFrame};
pub use generation::{GenerationCounter, GenerationToken};
