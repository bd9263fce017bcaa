use crate::{
    algorithms::{Aligner, Binarizer, CutoutCompositor, HoleFiller, Shrinker, Softener},
    config::RefineConfig,
    pipeline::Pipeline,
    traits::MaskStage,
};

/// Builder for refinement pipelines with a fluent API
pub struct PipelineBuilder {
    binarizer: Binarizer,
    aligner: Aligner,
    stages: Vec<Box<dyn MaskStage>>,
    softener: Softener,
    compositor: CutoutCompositor,
    keep_intermediates: bool,
}

impl PipelineBuilder {
    /// Start with default binarizer, aligner, softener and compositor and no mask stages
    pub fn new() -> Self {
        Self {
            binarizer: Binarizer::default(),
            aligner: Aligner::default(),
            stages: Vec::new(),
            softener: Softener::default(),
            compositor: CutoutCompositor::default(),
            keep_intermediates: false,
        }
    }

    /// Seed a builder with every tunable from `config`
    pub fn from_config(config: &RefineConfig) -> Self {
        Self::new()
            .binarizer(Binarizer::with_dilation(config.dilate_px))
            .aligner(Aligner {
                coarse_top_edge_pct: config.coarse_top_edge_pct,
                fine_radius_px: config.fine_radius_px,
                lambda: config.lambda,
                ..Aligner::default()
            })
            .fill_holes(config.hole_closing_radius)
            .shrink(config.shrink_px)
            .softener(Softener {
                expand_px: config.expand_px,
                feather_px: config.feather_px,
                ..Softener::default()
            })
            .compositor(CutoutCompositor {
                low: config.ramp_low,
                high: config.ramp_high,
            })
            .keep_intermediates(config.keep_intermediates)
    }

    pub fn binarizer(mut self, binarizer: Binarizer) -> Self {
        self.binarizer = binarizer;
        self
    }

    /// Grow the binarized mask by roughly `px` pixels
    pub fn dilate(mut self, px: u32) -> Self {
        self.binarizer.dilate_px = px;
        self
    }

    pub fn aligner(mut self, aligner: Aligner) -> Self {
        self.aligner = aligner;
        self
    }

    /// Add a mask stage after alignment
    pub fn add_stage<S>(mut self, stage: S) -> Self
    where
        S: MaskStage + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn fill_holes(self, closing_radius: u8) -> Self {
        self.add_stage(HoleFiller { closing_radius })
    }

    pub fn shrink(self, px: u32) -> Self {
        self.add_stage(Shrinker::new(px))
    }

    pub fn softener(mut self, softener: Softener) -> Self {
        self.softener = softener;
        self
    }

    pub fn feather(mut self, expand_px: u32, feather_px: u32) -> Self {
        self.softener.expand_px = expand_px;
        self.softener.feather_px = feather_px;
        self
    }

    pub fn compositor(mut self, compositor: CutoutCompositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// Keep an RGBA rendering of every stage in the output
    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline::new(
            self.binarizer,
            self.aligner,
            self.stages,
            self.softener,
            self.compositor,
            self.keep_intermediates,
        )
    }

    /// Hole filling followed by a 3px shrink, everything else at defaults
    pub fn build_standard() -> Pipeline {
        Self::from_config(&RefineConfig::default()).build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
