use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;
use tracing::debug;

use crate::{
    algorithms::edges::edge_map,
    error::{RefineError, Result},
    types::{image_center, AlignmentResult, BinaryMask, BoundaryMap, EdgeMap, Shift, BACKGROUND, FOREGROUND},
};

/// Foreground pixels with at least one in-raster background 4-neighbour
pub fn boundary_map(mask: &BinaryMask) -> BoundaryMap {
    let (width, height) = mask.dimensions();
    let is_bg = |x: i64, y: i64| {
        x >= 0
            && y >= 0
            && x < i64::from(width)
            && y < i64::from(height)
            && !mask.is_foreground(x as u32, y as u32)
    };

    BoundaryMap::new(GrayImage::from_fn(width, height, |x, y| {
        let (xi, yi) = (i64::from(x), i64::from(y));
        let on_edge = mask.is_foreground(x, y)
            && (is_bg(xi - 1, yi) || is_bg(xi + 1, yi) || is_bg(xi, yi - 1) || is_bg(xi, yi + 1));
        Luma([if on_edge { FOREGROUND } else { BACKGROUND }])
    }))
}

/// Registers a mask boundary against the strongest edges of its source image.
///
/// The shift is estimated in two phases, a centroid match followed by a
/// regularised local search, and reported in the `AlignmentResult`. The
/// aligned mask is always produced with a zero applied shift.
#[derive(Debug, Clone)]
pub struct Aligner {
    /// Percentile (0..=1) of edge strength a pixel must reach to count as strong
    pub coarse_top_edge_pct: f32,
    pub fine_radius_px: u32,
    /// Penalty per squared pixel of fine displacement
    pub lambda: f32,
    /// Strong edges further than this (square distance) from the boundary are ignored
    pub band_px: u8,
    pub max_coarse_px: i32,
    /// Sampling step of the banded centroid scan
    pub band_stride: u32,
}

impl Default for Aligner {
    fn default() -> Self {
        Self {
            coarse_top_edge_pct: 0.90,
            fine_radius_px: 8,
            lambda: 0.002,
            band_px: 40,
            max_coarse_px: 12,
            band_stride: 2,
        }
    }
}

impl Aligner {
    /// Largest fine search radius; larger values are clamped
    pub const MAX_FINE_RADIUS_PX: u32 = 64;

    /// Value at the `coarse_top_edge_pct` percentile of all edge strengths
    pub fn edge_threshold(&self, edges: &EdgeMap) -> f32 {
        let mut sorted = edges.values().to_vec();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(f32::total_cmp);
        let pct = self.coarse_top_edge_pct.clamp(0.0, 1.0);
        let idx = ((pct * (sorted.len() - 1) as f32).floor() as usize).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Estimate the shift without producing an aligned mask
    pub fn estimate(&self, source: &RgbaImage, mask: &BinaryMask) -> Result<AlignmentResult> {
        RefineError::check_dimensions(source.dimensions(), mask.dimensions())?;
        let edges = edge_map(source);
        Ok(self.estimate_with_edges(&edges, mask))
    }

    pub fn estimate_with_edges(&self, edges: &EdgeMap, mask: &BinaryMask) -> AlignmentResult {
        let (width, height) = edges.dimensions();
        let threshold = self.edge_threshold(edges);
        let boundary = boundary_map(mask);
        let points = boundary.points();

        let mask_centroid = boundary.centroid();
        let (object_centroid, strong_edge_pixels) = if points.is_empty() {
            (image_center(width, height), 0)
        } else {
            self.banded_edge_centroid(edges, &boundary, threshold)
        };

        let coarse = Shift::new(
            self.clamp_coarse(object_centroid[0] - mask_centroid[0]),
            self.clamp_coarse(object_centroid[1] - mask_centroid[1]),
        );
        let (fine, score) = self.fine_search(edges, &points, coarse);

        debug!(
            threshold,
            boundary_pixels = points.len(),
            strong_edge_pixels,
            ?coarse,
            ?fine,
            score,
            "estimated mask alignment"
        );

        AlignmentResult {
            coarse,
            fine,
            applied: Shift::ZERO,
            score,
            boundary_pixels: points.len(),
            strong_edge_pixels,
        }
    }

    /// Estimate the shift and composite the mask at the applied (zero) offset
    pub fn align(&self, source: &RgbaImage, mask: &BinaryMask) -> Result<(BinaryMask, AlignmentResult)> {
        let result = self.estimate(source, mask)?;
        Ok((shift_mask(mask, result.applied), result))
    }

    fn clamp_coarse(&self, delta: f32) -> i32 {
        let limit = self.max_coarse_px.abs();
        (delta.round() as i32).clamp(-limit, limit)
    }

    fn banded_edge_centroid(
        &self,
        edges: &EdgeMap,
        boundary: &BoundaryMap,
        threshold: f32,
    ) -> ([f32; 2], usize) {
        let (width, height) = edges.dimensions();
        let band = imageproc::morphology::dilate(boundary.as_gray(), Norm::LInf, self.band_px);
        let stride = self.band_stride.max(1) as usize;

        let mut count = 0usize;
        let (mut sx, mut sy) = (0f64, 0f64);
        for y in (0..height).step_by(stride) {
            for x in (0..width).step_by(stride) {
                if band.get_pixel(x, y)[0] != FOREGROUND {
                    continue;
                }
                let v = edges.get(x, y);
                if v > 0.0 && v >= threshold {
                    count += 1;
                    sx += f64::from(x);
                    sy += f64::from(y);
                }
            }
        }

        if count == 0 {
            return (image_center(width, height), 0);
        }
        ([(sx / count as f64) as f32, (sy / count as f64) as f32], count)
    }

    /// Best regularised mean edge strength around `coarse`; ties keep the first hit
    fn fine_search(&self, edges: &EdgeMap, points: &[(u32, u32)], coarse: Shift) -> (Shift, f32) {
        let r = self.fine_radius_px.min(Self::MAX_FINE_RADIUS_PX) as i32;
        let mut best = (Shift::ZERO, f32::NEG_INFINITY);

        for dy in -r..=r {
            for dx in -r..=r {
                let mean = if points.is_empty() {
                    0.0
                } else {
                    let ox = i64::from(coarse.dx + dx);
                    let oy = i64::from(coarse.dy + dy);
                    let sum: f32 = points
                        .iter()
                        .map(|&(x, y)| edges.sample(i64::from(x) + ox, i64::from(y) + oy))
                        .sum();
                    sum / points.len() as f32
                };
                let penalty = (dx as f32).powi(2) + (dy as f32).powi(2);
                let score = mean - self.lambda * penalty;
                if score > best.1 {
                    best = (Shift::new(dx, dy), score);
                }
            }
        }
        best
    }
}

/// Composite `mask` onto a black canvas of the same size at `offset`
pub fn shift_mask(mask: &BinaryMask, offset: Shift) -> BinaryMask {
    let (width, height) = mask.dimensions();
    let mut canvas = GrayImage::new(width, height);
    image::imageops::overlay(&mut canvas, mask.as_gray(), i64::from(offset.dx), i64::from(offset.dy));
    BinaryMask::from_gray_at_least(&canvas, FOREGROUND)
}
