//! morphotrack: boundary tracking and morphodynamics of a deforming cell
//! in a time-lapse image sequence.
//!
//! Per frame the pipeline runs:
//!
//! 1. **Segmentation** – discrete boundary of the cell (pluggable
//!    [`Segmenter`], default [`ThresholdSegmenter`]).
//! 2. **Curve fitting** – periodic smoothing cubic spline ([`fit_spline`]).
//! 3. **Origin tracking** – running phase offset of the parametrization so
//!    angular bin `i` names the same part of the cell in every frame
//!    ([`OriginTracker`]).
//! 4. **Correspondence** – start parameters on the previous curve mapped to
//!    end parameters on the current one by a periodic least-squares problem
//!    ([`CorrespondenceSolver`]).
//! 5. **Windowing** – interior split into `I` angular × `J` radial pixel
//!    windows ([`WindowGridBuilder`]).
//! 6. **Sampling** – mean/variance of each signal channel per window
//!    ([`SignalSampler`]) and normal displacement per angular bin
//!    ([`DisplacementProjector`]).
//!
//! [`MorphoAnalyzer`] runs the loop and fills a [`MorphoResult`].

pub mod config;
mod contour;
pub mod correspondence;
mod displacement;
mod error;
mod origin;
mod pipeline;
pub mod segmentation;
mod signal;
pub mod source;
pub mod spline;
pub mod windows;

#[cfg(test)]
pub(crate) mod test_utils;

/// Single-channel 32-bit float image, the pixel format of every frame.
pub type FloatImage = image::ImageBuffer<image::Luma<f32>, Vec<f32>>;

pub use config::{AnalysisConfig, ConfigError, DatasetConfig, DatasetTable, RunDimensions};
pub use contour::DiscreteContour;
pub use correspondence::{
    Correspondence, CorrespondenceConfig, CorrespondenceError, CorrespondenceSolver, ParameterSet,
    RegularizationRatio,
};
pub use displacement::{unit_normal, DisplacementProjector};
pub use error::{FrameError, MorphoError, ShapeMismatchError};
pub use origin::{find_origin, OriginConfig, OriginTracker};
pub use pipeline::{MorphoAnalyzer, MorphoResult, ResultDims};
pub use segmentation::{
    SegmentationConfig, SegmentationError, Segmenter, ThresholdSchedule, ThresholdSegmenter,
};
pub use signal::{ChannelStatistics, SignalSampler, WindowStatistics};
pub use source::{FileSequenceSource, ImageSource, InMemorySource, SourceError};
pub use spline::{fit_spline, InsufficientContourError, SplineCurve, SplineFitConfig};
pub use windows::{RadialBanding, Window, WindowConfig, WindowGrid, WindowGridBuilder, WindowingError};
