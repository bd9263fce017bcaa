pub mod builder;

use std::path::Path;

use image::RgbaImage;
use tracing::{debug, info, instrument};

use crate::{
    algorithms::{align::Aligner, Binarizer, CutoutCompositor, Softener},
    config::RefineConfig,
    error::{RefineError, Result},
    io,
    traits::MaskStage,
    types::{AlignmentResult, BinaryMask, SoftMask, Stage},
};

/// The full refinement chain from raw mask to alpha cutout
pub struct Pipeline {
    binarizer: Binarizer,
    aligner: Aligner,
    stages: Vec<Box<dyn MaskStage>>,
    softener: Softener,
    compositor: CutoutCompositor,
    keep_intermediates: bool,
}

/// Everything a single run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cutout: RgbaImage,
    pub alignment: AlignmentResult,
    /// Binary mask after the last refinement stage
    pub final_mask: BinaryMask,
    pub soft_mask: SoftMask,
    /// RGBA renderings after each stage, only when requested
    pub intermediates: Vec<(Stage, RgbaImage)>,
}

impl PipelineOutput {
    /// Write every intermediate as `NN_<stage>.png` into `dir`
    pub fn save_intermediates<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for (i, (stage, image)) in self.intermediates.iter().enumerate() {
            io::save_png(image, dir.join(format!("{i:02}_{stage}.png")))?;
        }
        Ok(())
    }
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        binarizer: Binarizer,
        aligner: Aligner,
        stages: Vec<Box<dyn MaskStage>>,
        softener: Softener,
        compositor: CutoutCompositor,
        keep_intermediates: bool,
    ) -> Self {
        Self {
            binarizer,
            aligner,
            stages,
            softener,
            compositor,
            keep_intermediates,
        }
    }

    /// Build a pipeline from validated configuration
    pub fn from_config(config: &RefineConfig) -> Result<Self> {
        config.validate()?;
        Ok(builder::PipelineBuilder::from_config(config).build())
    }

    pub fn binarizer(&self) -> &Binarizer {
        &self.binarizer
    }

    pub fn aligner(&self) -> &Aligner {
        &self.aligner
    }

    /// Run every stage on same-sized decoded inputs
    #[instrument(skip_all)]
    pub fn process(&self, source: &RgbaImage, raw_mask: &RgbaImage) -> Result<PipelineOutput> {
        RefineError::check_dimensions(source.dimensions(), raw_mask.dimensions())?;
        let (width, height) = source.dimensions();
        info!(width, height, "refining mask");

        let mut intermediates = Vec::new();
        let mut record = |stage: Stage, image: &dyn Fn() -> RgbaImage| {
            if self.keep_intermediates {
                intermediates.push((stage, image()));
            }
        };

        let binary = self.binarizer.binarize(raw_mask, (width, height))?;
        record(Stage::Binarize, &|| binary.to_rgba());

        let (mut mask, alignment) = self.aligner.align(source, &binary)?;
        record(Stage::Align, &|| mask.to_rgba());

        for stage in &self.stages {
            mask = stage.apply(&mask)?;
            debug!(stage = %stage.stage(), foreground = mask.foreground_count(), "applied mask stage");
            record(stage.stage(), &|| mask.to_rgba());
        }

        let soft_mask = self.softener.soften(&mask);
        record(Stage::Soften, &|| soft_mask.to_rgba());

        let cutout = self.compositor.composite(source, &soft_mask)?;
        record(Stage::Composite, &|| cutout.clone());

        info!(
            foreground = mask.foreground_count(),
            coarse = ?alignment.coarse,
            fine = ?alignment.fine,
            "mask refined"
        );

        Ok(PipelineOutput {
            cutout,
            alignment,
            final_mask: mask,
            soft_mask,
            intermediates,
        })
    }

    /// Decode both rasters, run the pipeline and return the cutout as PNG bytes
    pub fn process_bytes(&self, source: &[u8], raw_mask: &[u8]) -> Result<Vec<u8>> {
        let source = io::decode_rgba(source)?;
        let raw_mask = io::decode_rgba(raw_mask)?;
        let output = self.process(&source, &raw_mask)?;
        io::encode_png(&output.cutout)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let stages: Vec<String> = self.stages.iter().map(|s| s.stage().to_string()).collect();
        format!(
            "Pipeline: binarize (dilate {}px) -> align -> [{}] -> soften (expand {}px, feather {}px) -> composite ({}..{})",
            self.binarizer.dilate_px,
            stages.join(", "),
            self.softener.expand_px,
            self.softener.feather_px,
            self.compositor.low,
            self.compositor.high,
        )
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        builder::PipelineBuilder::build_standard()
    }
}
