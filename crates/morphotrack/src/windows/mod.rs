//! WindowGridBuilder: partitions the interior of a curve into `I` angular
//! sectors × `J` radial layers of pixels.

mod nearest;
mod partition;
mod raster;
mod types;

pub use partition::WindowGridBuilder;
pub use types::{RadialBanding, Window, WindowConfig, WindowGrid, WindowingError};
