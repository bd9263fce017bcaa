use image::{Rgba, RgbaImage};

use crate::{
    error::{RefineError, Result},
    types::SoftMask,
};

/// Writes a soft mask into the alpha channel of the source through a linear ramp
#[derive(Debug, Clone)]
pub struct CutoutCompositor {
    /// Mask values at or below this are fully transparent
    pub low: u8,
    /// Mask values at or above this are fully opaque
    pub high: u8,
}

impl Default for CutoutCompositor {
    fn default() -> Self {
        Self { low: 5, high: 200 }
    }
}

impl CutoutCompositor {
    pub fn alpha_for(&self, value: u8) -> u8 {
        if value <= self.low {
            return 0;
        }
        if value >= self.high {
            return 255;
        }
        let span = f32::from(self.high - self.low);
        (f32::from(value - self.low) * 255.0 / span).round() as u8
    }

    pub fn composite(&self, source: &RgbaImage, mask: &SoftMask) -> Result<RgbaImage> {
        RefineError::check_dimensions(source.dimensions(), mask.dimensions())?;

        Ok(RgbaImage::from_fn(source.width(), source.height(), |x, y| {
            let [r, g, b, _] = source.get_pixel(x, y).0;
            Rgba([r, g, b, self.alpha_for(mask.value(x, y))])
        }))
    }
}
