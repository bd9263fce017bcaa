use crate::{error::Result, types::{BinaryMask, Stage}};

/// A binary-to-binary refinement step (dilation, hole filling, erosion)
pub trait MaskStage: Send + Sync {
    /// Which pipeline stage this step implements
    fn stage(&self) -> Stage;

    /// Produce a new mask; the input is left untouched
    fn apply(&self, mask: &BinaryMask) -> Result<BinaryMask>;
}
