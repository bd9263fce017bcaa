use image::RgbaImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::{algorithms::preprocessing::luma_image, types::EdgeMap};

const EPSILON: f32 = 1e-6;

/// Normalised, lightly smoothed Sobel magnitude of `source`.
///
/// The outermost pixel ring has no full 3x3 neighbourhood and is fixed at 0
/// before smoothing.
pub fn edge_map(source: &RgbaImage) -> EdgeMap {
    let (width, height) = source.dimensions();
    let gray = luma_image(source);
    let gx = horizontal_sobel(&gray);
    let gy = vertical_sobel(&gray);

    let mut magnitude = vec![0f32; width as usize * height as usize];
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let h = f32::from(gx.get_pixel(x, y)[0]);
            let v = f32::from(gy.get_pixel(x, y)[0]);
            magnitude[y as usize * width as usize + x as usize] = h.hypot(v);
        }
    }

    normalize(&mut magnitude);
    let mut smoothed = box_blur_3x3(&magnitude, width, height);
    normalize(&mut smoothed);

    EdgeMap::new(width, height, smoothed)
}

fn normalize(values: &mut [f32]) {
    let max = values.iter().copied().fold(0.0, f32::max);
    if max <= EPSILON {
        return;
    }
    for v in values.iter_mut() {
        *v /= max;
    }
}

/// Mean over the in-bounds part of each 3x3 window
fn box_blur_3x3(values: &[f32], width: u32, height: u32) -> Vec<f32> {
    let (w, h) = (width as i64, height as i64);
    let mut out = vec![0f32; values.len()];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            let mut count = 0u32;
            for ny in (y - 1).max(0)..=(y + 1).min(h - 1) {
                for nx in (x - 1).max(0)..=(x + 1).min(w - 1) {
                    sum += values[(ny * w + nx) as usize];
                    count += 1;
                }
            }
            out[(y * w + x) as usize] = sum / count as f32;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn step_image(width: u32, height: u32, split: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| {
            if x < split {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([220, 220, 220, 255])
            }
        })
    }

    #[test]
    fn test_uniform_image_has_no_edges() {
        let img = RgbaImage::from_pixel(32, 32, Rgba([128, 128, 128, 255]));
        let map = edge_map(&img);
        assert!(map.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_values_are_normalized() {
        let map = edge_map(&step_image(40, 30, 20));
        assert!((map.max() - 1.0).abs() < 1e-5);
        assert!(map.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_step_edge_peaks_at_the_step() {
        let map = edge_map(&step_image(40, 30, 20));
        let at_step = map.get(19, 15).max(map.get(20, 15));
        assert!(at_step > 0.9);
        assert_eq!(map.get(5, 15), 0.0);
        assert_eq!(map.get(35, 15), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let img = step_image(24, 24, 9);
        assert_eq!(edge_map(&img), edge_map(&img));
    }

    #[test]
    fn test_tiny_images_do_not_panic() {
        for (w, h) in [(1, 1), (2, 5), (3, 3)] {
            let img = RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]));
            let map = edge_map(&img);
            assert_eq!(map.dimensions(), (w, h));
        }
    }
}
