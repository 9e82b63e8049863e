use crate::error::SamplingError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

/// 擷取到的 RGB24 畫面，尺寸即來源影片的原生解析度
#[derive(Debug, Clone)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterFrame {
    #[must_use]
    pub const fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}

/// JPEG 編碼後轉為 base64，方便傳輸與顯示
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self { quality: 85 }
    }
}

impl FrameEncoder {
    #[must_use]
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn encode(&self, raster: &RasterFrame) -> Result<String, SamplingError> {
        if raster.width == 0 || raster.height == 0 {
            return Err(SamplingError::Encode("empty raster".to_string()));
        }
        if raster.pixels.len() != RasterFrame::expected_len(raster.width, raster.height) {
            return Err(SamplingError::Encode(format!(
                "raster is {} bytes, expected {} for {}x{}",
                raster.pixels.len(),
                RasterFrame::expected_len(raster.width, raster.height),
                raster.width,
                raster.height
            )));
        }

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode(
                &raster.pixels,
                raster.width,
                raster.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| SamplingError::Encode(e.to_string()))?;

        Ok(STANDARD.encode(buffer))
    }
}
