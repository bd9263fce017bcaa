use std::collections::VecDeque;

use imageproc::distance_transform::Norm;
use tracing::debug;

use crate::{
    error::Result,
    traits::MaskStage,
    types::{BinaryMask, Stage},
};

/// Closes small boundary gaps, then fills every background region that is
/// not 4-connected to the raster border.
#[derive(Debug, Clone)]
pub struct HoleFiller {
    /// Half-width of the square closing window
    pub closing_radius: u8,
}

impl Default for HoleFiller {
    fn default() -> Self {
        Self { closing_radius: 2 }
    }
}

impl HoleFiller {
    pub fn fill(&self, mask: &BinaryMask) -> BinaryMask {
        let closed = if self.closing_radius == 0 {
            mask.clone()
        } else {
            let gray = imageproc::morphology::close(mask.as_gray(), Norm::LInf, self.closing_radius);
            BinaryMask::from_gray_at_least(&gray, 128)
        };

        let (width, height) = closed.dimensions();
        let outside = exterior_background(&closed);
        let filled = BinaryMask::from_fn(width, height, |x, y| {
            closed.is_foreground(x, y) || !outside[y as usize * width as usize + x as usize]
        });

        debug!(
            before = mask.foreground_count(),
            after = filled.foreground_count(),
            "filled enclosed holes"
        );
        filled
    }
}

/// Background pixels reachable from the border without crossing foreground
fn exterior_background(mask: &BinaryMask) -> Vec<bool> {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut reached = vec![false; w * h];
    let mut queue = VecDeque::new();
    if w == 0 || h == 0 {
        return reached;
    }

    let seed = |x: u32, y: u32, reached: &mut [bool], queue: &mut VecDeque<(u32, u32)>| {
        let idx = y as usize * w + x as usize;
        if !reached[idx] && !mask.is_foreground(x, y) {
            reached[idx] = true;
            queue.push_back((x, y));
        }
    };

    for x in 0..width {
        seed(x, 0, &mut reached, &mut queue);
        seed(x, height.saturating_sub(1), &mut reached, &mut queue);
    }
    for y in 0..height {
        seed(0, y, &mut reached, &mut queue);
        seed(width.saturating_sub(1), y, &mut reached, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        if x > 0 {
            seed(x - 1, y, &mut reached, &mut queue);
        }
        if x + 1 < width {
            seed(x + 1, y, &mut reached, &mut queue);
        }
        if y > 0 {
            seed(x, y - 1, &mut reached, &mut queue);
        }
        if y + 1 < height {
            seed(x, y + 1, &mut reached, &mut queue);
        }
    }

    reached
}

impl MaskStage for HoleFiller {
    fn stage(&self) -> Stage {
        Stage::FillHoles
    }

    fn apply(&self, mask: &BinaryMask) -> Result<BinaryMask> {
        Ok(self.fill(mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_with_hole(size: u32, center: f32, outer: f32, inner: f32) -> BinaryMask {
        BinaryMask::from_fn(size, size, |x, y| {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let d2 = dx * dx + dy * dy;
            d2 <= outer * outer && d2 > inner * inner
        })
    }

    #[test]
    fn test_enclosed_hole_is_filled() {
        let mask = disk_with_hole(120, 60.0, 40.0, 15.0);
        let filled = HoleFiller::default().fill(&mask);

        for y in 0..120u32 {
            for x in 0..120u32 {
                let dx = x as f32 - 60.0;
                let dy = y as f32 - 60.0;
                let d2 = dx * dx + dy * dy;
                if d2 <= 15.0 * 15.0 {
                    assert!(filled.is_foreground(x, y), "hole pixel ({x}, {y}) not filled");
                }
                if !mask.is_foreground(x, y) && d2 > 41.0 * 41.0 {
                    assert!(!filled.is_foreground(x, y), "exterior pixel ({x}, {y}) filled");
                }
            }
        }
    }

    #[test]
    fn test_open_notch_is_not_filled() {
        // a U shape whose opening is wider than the closing window
        let mask = BinaryMask::from_fn(60, 60, |x, y| {
            let in_outer = (10..50).contains(&x) && (10..50).contains(&y);
            let in_notch = (20..40).contains(&x) && y >= 20;
            in_outer && !in_notch
        });
        let filled = HoleFiller::default().fill(&mask);
        assert!(!filled.is_foreground(30, 35));
        assert!(filled.is_foreground(15, 45));
    }

    #[test]
    fn test_small_gap_is_sealed_before_flood() {
        // ring with a 1px break: closing seals it, so the inside counts as a hole
        let mask = BinaryMask::from_fn(60, 60, |x, y| {
            let ring = (10..50).contains(&x)
                && (10..50).contains(&y)
                && !((14..46).contains(&x) && (14..46).contains(&y));
            let gap = x == 30 && (10..14).contains(&y);
            ring && !gap
        });
        let filled = HoleFiller::default().fill(&mask);
        assert!(filled.is_foreground(30, 30));
        assert!(filled.is_foreground(30, 11));
        assert!(!filled.is_foreground(5, 5));
    }

    #[test]
    fn test_without_closing_only_flood_applies() {
        let mask = disk_with_hole(80, 40.0, 30.0, 10.0);
        let filled = HoleFiller { closing_radius: 0 }.fill(&mask);
        assert!(filled.is_foreground(40, 40));
        assert!(!filled.is_foreground(2, 2));
    }

    #[test]
    fn test_foreground_touching_border() {
        let mask = BinaryMask::from_fn(20, 20, |x, _| x < 10);
        let filled = HoleFiller::default().fill(&mask);
        assert_eq!(filled, mask);
    }
}
