mod ffmpeg_surface;
mod sampler;
mod surface;
mod timestamp_plan;

pub use ffmpeg_surface::{FfmpegOpener, FfmpegSurface};
pub use sampler::{FrameSampler, SampleFrame, SamplingOutcome, extract_frames};
pub use surface::{DecodeSurface, SeekEvent, SeekRequest, SurfaceOpener};
pub use timestamp_plan::plan_timestamps;
