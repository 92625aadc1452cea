pub mod layers;
pub mod overlap;

pub use self::layers::{LayerAssignment, LayerConfig, LayerMask, LayerMatrix, LAYER_COUNT};
pub use self::overlap::{overlaps, point_distance, ray_distance};
