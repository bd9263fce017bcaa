//! # Mask Refinement Library
//!
//! Turns a noisy segmentation mask into a clean alpha cutout of the subject
//! in its source photo.
//!
//! ## Stages
//!
//! - **Binarize / dilate**: luma threshold to pure black and white, optional growth
//! - **Align**: Sobel edge map of the source, centroid match plus a regularised
//!   local search; the estimate is reported but never applied
//! - **Fill holes**: square closing, then a border flood fill over the background
//! - **Shrink**: pull the boundary inward by a few pixels
//! - **Soften**: regrow and feather into graded opacity
//! - **Composite**: map opacity through a linear ramp into the source alpha
//!
//! Every stage allocates a fresh buffer, so runs can execute in parallel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask_refine::{io, Pipeline};
//!
//! let source = io::load_rgba("dish.png")?;
//! let raw_mask = io::load_rgba("dish_mask.png")?;
//!
//! let output = Pipeline::default().process(&source, &raw_mask)?;
//! println!("coarse shift: {:?}", output.alignment.coarse);
//! io::save_png(&output.cutout, "dish_cutout.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use mask_refine::{Pipeline, algorithms::*};
//!
//! let pipeline = Pipeline::builder()
//!     .dilate(2)
//!     .fill_holes(3)
//!     .shrink(4)
//!     .feather(2, 3)
//!     .keep_intermediates(true)
//!     .build();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod config;
pub mod io;
pub mod watermark;

pub use error::{RefineError, Result};
pub use types::{
    AlignmentResult, BinaryMask, BoundaryMap, EdgeMap, MaskStats, Shift, SoftMask, Stage,
};
pub use traits::MaskStage;
pub use pipeline::{Pipeline, PipelineOutput, builder::PipelineBuilder};
pub use config::RefineConfig;
pub use watermark::{Watermark, WatermarkCache};
