//! PipelineOrchestrator: the sequential per-frame analysis loop.
//!
//! Frame `k` depends on the curve and origin of frame `k−1`, so frames run
//! strictly in order. Frame 0 has no correspondence, displacement or origin
//! estimate (its origin is 0). Within a frame, signal channels are sampled in
//! parallel.

mod result;
mod run;

pub use result::{MorphoResult, ResultDims};
pub use run::MorphoAnalyzer;
