use image::RgbaImage;
use tracing::debug;

use crate::{
    algorithms::preprocessing::{blur, luma},
    error::{RefineError, Result},
    traits::MaskStage,
    types::{BinaryMask, Stage},
};

/// Turns a noisy raw mask into a pure black/white mask, optionally grown
#[derive(Debug, Clone)]
pub struct Binarizer {
    /// Pixels with luma strictly above this value are foreground
    pub threshold: f32,
    /// Approximate growth of the foreground, in pixels
    pub dilate_px: u32,
    /// Re-threshold cutoff applied after the dilation blur
    pub dilate_cutoff: u8,
}

impl Default for Binarizer {
    fn default() -> Self {
        Self {
            threshold: 128.0,
            dilate_px: 0,
            dilate_cutoff: Dilator::DEFAULT_CUTOFF,
        }
    }
}

impl Binarizer {
    pub fn with_dilation(dilate_px: u32) -> Self {
        Self {
            dilate_px,
            ..Self::default()
        }
    }

    /// Binarize `raw`, which must already be `target` sized
    pub fn binarize(&self, raw: &RgbaImage, target: (u32, u32)) -> Result<BinaryMask> {
        RefineError::check_dimensions(target, raw.dimensions())?;

        let mask = BinaryMask::from_fn(raw.width(), raw.height(), |x, y| {
            let [r, g, b, _] = raw.get_pixel(x, y).0;
            luma(r, g, b) > self.threshold
        });
        debug!(foreground = mask.foreground_count(), "binarized raw mask");

        if self.dilate_px == 0 {
            return Ok(mask);
        }
        Dilator {
            radius: self.dilate_px,
            cutoff: self.dilate_cutoff,
        }
        .apply(&mask)
    }
}

/// Grows the foreground by blurring and keeping anything above a low cutoff
#[derive(Debug, Clone)]
pub struct Dilator {
    pub radius: u32,
    pub cutoff: u8,
}

impl Dilator {
    pub const DEFAULT_CUTOFF: u8 = 16;

    pub fn new(radius: u32) -> Self {
        Self {
            radius,
            cutoff: Self::DEFAULT_CUTOFF,
        }
    }
}

impl MaskStage for Dilator {
    fn stage(&self) -> Stage {
        Stage::Dilate
    }

    fn apply(&self, mask: &BinaryMask) -> Result<BinaryMask> {
        if self.radius == 0 {
            return Ok(mask.clone());
        }
        let blurred = blur(mask.as_gray(), self.radius);
        Ok(BinaryMask::from_gray_at_least(&blurred, self.cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn noisy_mask(width: u32, height: u32) -> RgbaImage {
        // deterministic pseudo-noise over the full 0..=255 range
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 37 + y * 101 + x * y * 7) % 256) as u8;
            Rgba([v, v.wrapping_mul(3), v.wrapping_add(40), (x % 256) as u8])
        })
    }

    fn square_mask(size: u32, from: u32, to: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            if (from..to).contains(&x) && (from..to).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn test_output_is_pure_black_and_white() {
        let raw = noisy_mask(64, 48);
        for dilate_px in [0, 3] {
            let mask = Binarizer::with_dilation(dilate_px)
                .binarize(&raw, (64, 48))
                .expect("Should binarize");
            for p in mask.to_rgba().pixels() {
                let [r, g, b, a] = p.0;
                assert!(r == 0 || r == 255);
                assert_eq!(r, g);
                assert_eq!(g, b);
                assert_eq!(a, 255);
            }
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let raw = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([128, 128, 128, 255]),
            1 => Rgba([129, 129, 129, 255]),
            _ => Rgba([60, 60, 60, 255]),
        });
        let mask = Binarizer::default().binarize(&raw, (3, 1)).unwrap();
        assert!(!mask.is_foreground(0, 0));
        assert!(mask.is_foreground(1, 0));
        assert!(!mask.is_foreground(2, 0));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let raw = square_mask(32, 8, 24);
        let err = Binarizer::default().binarize(&raw, (32, 16)).unwrap_err();
        assert!(matches!(
            err,
            RefineError::InvalidInputDimensions { expected: (32, 16), actual: (32, 32) }
        ));
    }

    #[test]
    fn test_degenerate_inputs_pass_through() {
        let black = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        let white = RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255]));
        for px in [0, 4] {
            let b = Binarizer::with_dilation(px).binarize(&black, (16, 16)).unwrap();
            let w = Binarizer::with_dilation(px).binarize(&white, (16, 16)).unwrap();
            assert_eq!(b.foreground_count(), 0);
            assert_eq!(w.foreground_count(), 256);
        }
    }

    #[test]
    fn test_dilation_is_monotonic() {
        let raw = square_mask(96, 33, 63);
        let mut previous = Binarizer::default().binarize(&raw, (96, 96)).unwrap();
        for px in [1, 2, 4, 6] {
            let grown = Binarizer::with_dilation(px).binarize(&raw, (96, 96)).unwrap();
            for y in 0..96 {
                for x in 0..96 {
                    if previous.is_foreground(x, y) {
                        assert!(grown.is_foreground(x, y), "lost ({x}, {y}) at px={px}");
                    }
                }
            }
            assert!(grown.foreground_count() > previous.foreground_count());
            previous = grown;
        }
    }

    #[test]
    fn test_dilation_grows_by_roughly_radius() {
        let raw = square_mask(96, 33, 63);
        let grown = Binarizer::with_dilation(4).binarize(&raw, (96, 96)).unwrap();
        let (w, h) = grown.stats().bounding_size().unwrap();
        assert!((36..=40).contains(&w), "width {w}");
        assert!((36..=40).contains(&h), "height {h}");
    }
}
