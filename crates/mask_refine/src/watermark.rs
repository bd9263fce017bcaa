//! Watermark stamping with an explicitly owned, lazily decoded asset.

use std::sync::OnceLock;

use image::{imageops, imageops::FilterType, Rgba, RgbaImage};
use tracing::debug;

use crate::{
    error::{RefineError, Result},
    io::decode_rgba,
};

/// Encoded watermark asset, decoded on first use and then reused.
///
/// Callers own the cache and pass it to every `Watermark::apply`, so several
/// runs (or threads) can share one decode.
#[derive(Debug)]
pub struct WatermarkCache {
    encoded: Vec<u8>,
    decoded: OnceLock<std::result::Result<RgbaImage, String>>,
}

impl WatermarkCache {
    pub fn new(encoded: Vec<u8>) -> Self {
        Self {
            encoded,
            decoded: OnceLock::new(),
        }
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    pub fn asset(&self) -> Result<&RgbaImage> {
        self.decoded
            .get_or_init(|| {
                debug!(bytes = self.encoded.len(), "decoding watermark asset");
                decode_rgba(&self.encoded).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| RefineError::DecodeFailure(e.clone()))
    }
}

/// Placement of the asset in the bottom-right corner
#[derive(Debug, Clone)]
pub struct Watermark {
    pub opacity: f32,
    pub margin: u32,
    /// The asset is scaled down to at most this fraction of the target width
    pub max_width_fraction: f32,
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            opacity: 0.6,
            margin: 16,
            max_width_fraction: 0.25,
        }
    }
}

impl Watermark {
    pub fn apply(&self, image: &RgbaImage, cache: &WatermarkCache) -> Result<RgbaImage> {
        let asset = cache.asset()?;
        let mut out = image.clone();
        if asset.width() == 0 || asset.height() == 0 {
            return Ok(out);
        }

        let max_width = ((image.width() as f32 * self.max_width_fraction) as u32).max(1);
        let scaled;
        let stamp = if asset.width() > max_width {
            let height = (asset.height() as u64 * max_width as u64 / asset.width() as u64).max(1) as u32;
            scaled = imageops::resize(asset, max_width, height, FilterType::Triangle);
            &scaled
        } else {
            asset
        };

        let x0 = i64::from(image.width()) - i64::from(stamp.width()) - i64::from(self.margin);
        let y0 = i64::from(image.height()) - i64::from(stamp.height()) - i64::from(self.margin);
        let opacity = self.opacity.clamp(0.0, 1.0);

        for (sx, sy, src) in stamp.enumerate_pixels() {
            let (x, y) = (x0 + i64::from(sx), y0 + i64::from(sy));
            if x < 0 || y < 0 || x >= i64::from(out.width()) || y >= i64::from(out.height()) {
                continue;
            }
            let dst = out.get_pixel_mut(x as u32, y as u32);
            *dst = blend(*dst, *src, opacity);
        }
        Ok(out)
    }
}

/// Source-over blend of `src` scaled by `opacity`
fn blend(dst: Rgba<u8>, src: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0 * opacity;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let c = (f32::from(src[i]) * sa + f32::from(dst[i]) * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([channel(0), channel(1), channel(2), (out_a * 255.0).round() as u8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::encode_png;

    fn asset_cache() -> WatermarkCache {
        let asset = RgbaImage::from_pixel(10, 5, Rgba([255, 255, 255, 255]));
        WatermarkCache::new(encode_png(&asset).unwrap())
    }

    #[test]
    fn test_decoded_once_and_reused() {
        let cache = asset_cache();
        assert!(!cache.is_decoded());
        let first = cache.asset().unwrap() as *const RgbaImage;
        let second = cache.asset().unwrap() as *const RgbaImage;
        assert!(cache.is_decoded());
        assert_eq!(first, second);
    }

    #[test]
    fn test_stamp_lands_bottom_right() {
        let image = RgbaImage::from_pixel(100, 50, Rgba([0, 0, 0, 255]));
        let mark = Watermark { opacity: 1.0, margin: 4, max_width_fraction: 0.5 };
        let out = mark.apply(&image, &asset_cache()).unwrap();
        assert_eq!(out.get_pixel(90, 44), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(10, 10), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(99, 49), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_transparent_pixels_stay_partially_transparent() {
        let image = RgbaImage::from_pixel(100, 50, Rgba([0, 0, 0, 0]));
        let out = Watermark { opacity: 0.5, ..Watermark::default() }
            .apply(&image, &asset_cache())
            .unwrap();
        let stamped = out.get_pixel(100 - 16 - 1, 50 - 16 - 1);
        assert_eq!(stamped[3], 128);
        assert_eq!(stamped[0], 255);
    }

    #[test]
    fn test_bad_asset_is_decode_failure() {
        let cache = WatermarkCache::new(b"nope".to_vec());
        let image = RgbaImage::new(8, 8);
        assert!(matches!(
            Watermark::default().apply(&image, &cache),
            Err(RefineError::DecodeFailure(_))
        ));
    }
}
