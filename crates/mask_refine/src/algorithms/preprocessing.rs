use image::{GrayImage, Luma, RgbaImage};

/// Rec. 709 luma of an 8-bit RGB triple
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b)
}

/// Per-pixel luma, rounded to 8 bits. Alpha is ignored.
pub fn luma_image(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b).round().clamp(0.0, 255.0) as u8])
    })
}

/// A hard edge blurred with `sigma = radius / RADIUS_PER_SIGMA` reaches the
/// dilate (16) and shrink (240) cutoffs `radius` pixels from the edge.
const RADIUS_PER_SIGMA: f32 = 1.6;

/// Gaussian blur sized so that thresholding the result moves a binary edge
/// by `radius` pixels. Kernel truncated at 3 sigma, edges replicated.
/// A zero radius returns a copy.
pub fn blur(image: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    let kernel = gaussian_kernel(radius as f32 / RADIUS_PER_SIGMA);
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let src: Vec<f32> = image.as_raw().iter().map(|&v| f32::from(v)).collect();

    let horizontal = convolve_1d(&src, w, h, &kernel, true);
    let vertical = convolve_1d(&horizontal, w, h, &kernel, false);

    let data = vertical
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(width, height, data).unwrap_or_else(|| GrayImage::new(width, height))
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let half = (3.0 * sigma).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

fn convolve_1d(src: &[f32], w: usize, h: usize, kernel: &[f32], along_x: bool) -> Vec<f32> {
    let half = (kernel.len() / 2) as i64;
    let mut out = vec![0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let offset = k as i64 - half;
                let idx = if along_x {
                    let sx = (x as i64 + offset).clamp(0, w as i64 - 1) as usize;
                    y * w + sx
                } else {
                    let sy = (y as i64 + offset).clamp(0, h as i64 - 1) as usize;
                    sy * w + x
                };
                acc += src[idx] * weight;
            }
            out[y * w + x] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_luma_weights() {
        assert!((luma(255, 255, 255) - 255.0).abs() < 1e-3);
        assert!((luma(255, 0, 0) - 54.213).abs() < 1e-3);
        assert!((luma(0, 255, 0) - 182.376).abs() < 1e-3);
        assert_eq!(luma(0, 0, 0), 0.0);
    }

    #[test]
    fn test_luma_image_ignores_alpha() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([60, 60, 60, 0]));
        let gray = luma_image(&img);
        assert!(gray.pixels().all(|p| p[0] == 60));
    }

    #[test]
    fn test_zero_radius_blur_is_identity() {
        let img = GrayImage::from_fn(8, 8, |x, _| Luma([if x < 4 { 0 } else { 255 }]));
        assert_eq!(blur(&img, 0), img);
    }

    #[test]
    fn test_blur_keeps_flat_regions_exact() {
        let img = GrayImage::from_pixel(20, 20, Luma([255]));
        assert!(blur(&img, 3).pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(2.0);
        assert_eq!(kernel.len(), 13);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(kernel[0], kernel[12]);
    }

    #[test]
    fn test_thresholded_step_moves_by_radius() {
        let step = GrayImage::from_fn(64, 4, |x, _| Luma([if x < 32 { 0 } else { 255 }]));
        for radius in 1..=5u32 {
            let blurred = blur(&step, radius);
            let row: Vec<u8> = (0..64).map(|x| blurred.get_pixel(x, 1)[0]).collect();
            let r = radius as usize;
            assert!(row[32 + r] >= 240 && row[31 + r] < 240, "shrink edge at radius {radius}: {row:?}");
            assert!(row[32 - r] >= 16 && row[31 - r] < 16, "dilate edge at radius {radius}: {row:?}");
        }
    }

    #[test]
    fn test_blur_softens_step() {
        let img = GrayImage::from_fn(32, 8, |x, _| Luma([if x < 16 { 0 } else { 255 }]));
        let blurred = blur(&img, 2);
        let edge = blurred.get_pixel(16, 4)[0];
        assert!(edge > 0 && edge < 255);
        assert_eq!(blurred.get_pixel(0, 4)[0], 0);
        assert_eq!(blurred.get_pixel(31, 4)[0], 255);
    }
}
