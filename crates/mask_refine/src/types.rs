use image::{GrayImage, Luma, Rgba, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

/// Sample value of a foreground pixel in every single-channel mask
pub const FOREGROUND: u8 = 255;
/// Sample value of a background pixel in every single-channel mask
pub const BACKGROUND: u8 = 0;

/// Stages of the refinement pipeline, in execution order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Binarize,
    Dilate,
    Align,
    FillHoles,
    Shrink,
    Soften,
    Composite,
}

/// A mask whose samples are only ever `BACKGROUND` or `FOREGROUND`.
///
/// Built once from a raw raster and then passed between stages, so no stage
/// has to re-derive which pixels are foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Build a mask from a per-pixel predicate
    pub fn from_fn<F>(width: u32, height: u32, mut is_foreground: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        Self(GrayImage::from_fn(width, height, |x, y| {
            Luma([if is_foreground(x, y) { FOREGROUND } else { BACKGROUND }])
        }))
    }

    /// Keep every sample `>= cutoff` as foreground
    pub fn from_gray_at_least(image: &GrayImage, cutoff: u8) -> Self {
        match cutoff {
            0 => Self::from_fn(image.width(), image.height(), |_, _| true),
            c => Self(imageproc::contrast::threshold(image, c - 1)),
        }
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] == FOREGROUND
    }

    /// Borrow the underlying 0/255 grayscale buffer
    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub fn into_gray(self) -> GrayImage {
        self.0
    }

    /// RGBA rendering: 0 or 255 in every colour channel, always opaque
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            let v = self.0.get_pixel(x, y)[0];
            Rgba([v, v, v, 255])
        })
    }

    pub fn foreground_count(&self) -> u64 {
        self.0.pixels().filter(|p| p[0] == FOREGROUND).count() as u64
    }

    /// Area, bounding box and centroid of the foreground
    pub fn stats(&self) -> MaskStats {
        let mut area = 0u64;
        let (mut sum_x, mut sum_y) = (0f64, 0f64);
        let mut bbox: Option<[u32; 4]> = None;

        for (x, y, p) in self.0.enumerate_pixels() {
            if p[0] != FOREGROUND {
                continue;
            }
            area += 1;
            sum_x += f64::from(x);
            sum_y += f64::from(y);
            bbox = Some(match bbox {
                None => [x, y, x, y],
                Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
            });
        }

        let centroid = if area == 0 {
            image_center(self.width(), self.height())
        } else {
            [(sum_x / area as f64) as f32, (sum_y / area as f64) as f32]
        };

        MaskStats {
            area,
            bounding_box: bbox,
            centroid,
        }
    }
}

/// Foreground summary used for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStats {
    pub area: u64,
    /// Inclusive `[min_x, min_y, max_x, max_y]`, `None` for an empty mask
    pub bounding_box: Option<[u32; 4]>,
    pub centroid: [f32; 2],
}

impl MaskStats {
    pub fn bounding_size(&self) -> Option<(u32, u32)> {
        self.bounding_box
            .map(|[x0, y0, x1, y1]| (x1 - x0 + 1, y1 - y0 + 1))
    }
}

/// Normalised edge strength of a source image, values in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl EdgeMap {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Like `get`, but coordinates outside the raster read as 0
    pub fn sample(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return 0.0;
        }
        self.get(x as u32, y as u32)
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }
}

/// Foreground pixels that touch the background through a 4-neighbour (255 = boundary)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryMap(GrayImage);

impl BoundaryMap {
    pub fn new(image: GrayImage) -> Self {
        Self(image)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub fn is_boundary(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] == FOREGROUND
    }

    pub fn points(&self) -> Vec<(u32, u32)> {
        self.0
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == FOREGROUND)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.0.pixels().filter(|p| p[0] == FOREGROUND).count()
    }

    /// Mean boundary position, or the image center if there is none
    pub fn centroid(&self) -> [f32; 2] {
        let points = self.points();
        if points.is_empty() {
            return image_center(self.0.width(), self.0.height());
        }
        let n = points.len() as f64;
        let (sx, sy) = points.iter().fold((0f64, 0f64), |(sx, sy), &(x, y)| {
            (sx + f64::from(x), sy + f64::from(y))
        });
        [(sx / n) as f32, (sy / n) as f32]
    }
}

/// Graded opacity, 0 (transparent) to 255 (opaque)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftMask(GrayImage);

impl SoftMask {
    pub fn new(image: GrayImage) -> Self {
        Self(image)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel(x, y)[0]
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.0.width(), self.0.height(), |x, y| {
            let v = self.value(x, y);
            Rgba([v, v, v, 255])
        })
    }
}

/// Integer translation in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shift {
    pub dx: i32,
    pub dy: i32,
}

impl Shift {
    pub const ZERO: Shift = Shift { dx: 0, dy: 0 };

    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Outcome of mask-to-edge registration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Centroid-based estimate
    pub coarse: Shift,
    /// Best refinement around the coarse estimate
    pub fine: Shift,
    /// Shift actually used for the aligned mask, always zero
    pub applied: Shift,
    /// Regularised edge score of the fine shift (diagnostic)
    pub score: f32,
    pub boundary_pixels: usize,
    pub strong_edge_pixels: usize,
}

pub(crate) fn image_center(width: u32, height: u32) -> [f32; 2] {
    [width as f32 / 2.0, height as f32 / 2.0]
}
