use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::error::{RefineError, Result};

/// Decode compressed raster bytes into RGBA
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| RefineError::DecodeFailure(e.to_string()))
}

/// Read and decode an image file into RGBA
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let bytes = std::fs::read(path)?;
    decode_rgba(&bytes)
}

/// Encode as PNG, keeping the alpha channel
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(RefineError::Encode)?;
    Ok(buffer.into_inner())
}

pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    std::fs::write(path, encode_png(image)?)?;
    Ok(())
}
