use crate::{
    algorithms::preprocessing::blur,
    error::Result,
    traits::MaskStage,
    types::{BinaryMask, Stage},
};

/// Pulls the foreground boundary inward: blur, then keep only near-solid pixels
#[derive(Debug, Clone)]
pub struct Shrinker {
    pub px: u32,
    pub cutoff: u8,
}

impl Shrinker {
    pub const DEFAULT_CUTOFF: u8 = 240;

    pub fn new(px: u32) -> Self {
        Self {
            px,
            cutoff: Self::DEFAULT_CUTOFF,
        }
    }

    pub fn shrink(&self, mask: &BinaryMask) -> BinaryMask {
        if self.px == 0 {
            return mask.clone();
        }
        let blurred = blur(mask.as_gray(), self.px);
        BinaryMask::from_gray_at_least(&blurred, self.cutoff)
    }
}

impl Default for Shrinker {
    fn default() -> Self {
        Self::new(3)
    }
}

impl MaskStage for Shrinker {
    fn stage(&self) -> Stage {
        Stage::Shrink
    }

    fn apply(&self, mask: &BinaryMask) -> Result<BinaryMask> {
        Ok(self.shrink(mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::binarize::Dilator;

    fn disk(size: u32, radius: f32) -> BinaryMask {
        let c = size as f32 / 2.0;
        BinaryMask::from_fn(size, size, |x, y| {
            let dx = x as f32 + 0.5 - c;
            let dy = y as f32 + 0.5 - c;
            dx * dx + dy * dy <= radius * radius
        })
    }

    #[test]
    fn test_zero_px_is_noop() {
        let mask = disk(64, 20.0);
        assert_eq!(Shrinker::new(0).shrink(&mask), mask);
    }

    #[test]
    fn test_shrink_is_subset() {
        let mask = disk(96, 30.0);
        let shrunk = Shrinker::new(3).shrink(&mask);
        assert!(shrunk.foreground_count() < mask.foreground_count());
        for y in 0..96 {
            for x in 0..96 {
                if shrunk.is_foreground(x, y) {
                    assert!(mask.is_foreground(x, y));
                }
            }
        }
    }

    #[test]
    fn test_square_shrinks_by_roughly_px() {
        let mask = BinaryMask::from_fn(128, 128, |x, y| (14..114).contains(&x) && (14..114).contains(&y));
        let shrunk = Shrinker::new(3).shrink(&mask);
        let (w, h) = shrunk.stats().bounding_size().unwrap();
        assert!((92..=96).contains(&w), "width {w}");
        assert!((92..=96).contains(&h), "height {h}");
        let c = shrunk.stats().centroid;
        assert!((c[0] - 63.5).abs() < 0.5 && (c[1] - 63.5).abs() < 0.5);
    }

    #[test]
    fn test_shrink_then_dilate_recovers_extent() {
        let mask = disk(128, 36.0);
        let (ow, oh) = mask.stats().bounding_size().unwrap();
        for px in [2u32, 3, 4] {
            let shrunk = Shrinker::new(px).shrink(&mask);
            let (sw, _) = shrunk.stats().bounding_size().unwrap();
            assert!(sw.abs_diff(ow - 2 * px) <= 2, "px={px}: shrunk width {sw}");

            let regrown = Dilator::new(px).apply(&shrunk).unwrap();
            let (rw, rh) = regrown.stats().bounding_size().unwrap();
            assert!(rw.abs_diff(ow) <= 2 && rh.abs_diff(oh) <= 2, "px={px}: {ow}x{oh} -> {rw}x{rh}");
            let lost = mask.foreground_count().abs_diff(regrown.foreground_count());
            assert!(lost <= mask.foreground_count() / 50, "px={px}: area changed by {lost}");
        }
    }
}
