use image::Luma;

use crate::{
    algorithms::preprocessing::blur,
    types::{BinaryMask, SoftMask},
};

/// Turns a hard mask into graded opacity with a slightly regrown, feathered edge
#[derive(Debug, Clone)]
pub struct Softener {
    pub expand_px: u32,
    pub feather_px: u32,
    /// Multiplier applied after the expand blur to bias the ramp toward opaque
    pub expand_gain: f32,
}

impl Default for Softener {
    fn default() -> Self {
        Self {
            expand_px: 1,
            feather_px: 2,
            expand_gain: 1.25,
        }
    }
}

impl Softener {
    pub fn soften(&self, mask: &BinaryMask) -> SoftMask {
        let mut gray = mask.as_gray().clone();

        if self.expand_px > 0 {
            gray = blur(&gray, self.expand_px);
            for p in gray.pixels_mut() {
                let boosted = f32::from(p[0]) * self.expand_gain;
                *p = Luma([boosted.round().clamp(0.0, 255.0) as u8]);
            }
        }
        if self.feather_px > 0 {
            gray = blur(&gray, self.feather_px);
        }

        SoftMask::new(gray)
    }
}
