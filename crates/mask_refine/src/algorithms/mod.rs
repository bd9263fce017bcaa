pub mod preprocessing;
pub mod binarize;
pub mod edges;
pub mod align;
pub mod holes;
pub mod shrink;
pub mod soften;
pub mod composite;

pub use preprocessing::{blur, luma, luma_image};
pub use binarize::{Binarizer, Dilator};
pub use edges::edge_map;
pub use align::{boundary_map, Aligner};
pub use holes::HoleFiller;
pub use shrink::Shrinker;
pub use soften::Softener;
pub use composite::CutoutCompositor;
