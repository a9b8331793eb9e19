//! Run-level error kinds.
//!
//! Each component has its own error enum; [`MorphoError`] collects them so
//! the orchestrator can report any failure together with the frame index
//! ([`FrameError`]).

use crate::config::ConfigError;
use crate::correspondence::CorrespondenceError;
use crate::segmentation::SegmentationError;
use crate::source::SourceError;
use crate::spline::InsufficientContourError;
use crate::windows::WindowingError;

/// An image whose shape differs from the run's declared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatchError {
    /// Declared `[width, height]`.
    pub expected: [u32; 2],
    /// Observed `[width, height]`.
    pub got: [u32; 2],
    /// Signal channel, or `None` for the morphology image.
    pub channel: Option<usize>,
    pub frame: usize,
}

impl std::fmt::Display for ShapeMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let which = match self.channel {
            Some(c) => format!("signal channel {c}"),
            None => "morphology image".to_string(),
        };
        write!(
            f,
            "{} of frame {} is {}x{}, expected {}x{}",
            which, self.frame, self.got[0], self.got[1], self.expected[0], self.expected[1]
        )
    }
}

impl std::error::Error for ShapeMismatchError {}

/// Any failure of the analysis core or its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum MorphoError {
    Contour(InsufficientContourError),
    Correspondence(CorrespondenceError),
    Windowing(WindowingError),
    Shape(ShapeMismatchError),
    Segmentation(SegmentationError),
    Source(SourceError),
    Config(ConfigError),
}

impl MorphoError {
    /// Short name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Contour(_) => "InsufficientContourError",
            Self::Correspondence(_) => "CorrespondenceError",
            Self::Windowing(_) => "WindowingError",
            Self::Shape(_) => "ShapeMismatchError",
            Self::Segmentation(_) => "SegmentationError",
            Self::Source(_) => "SourceError",
            Self::Config(_) => "ConfigError",
        }
    }
}

impl std::fmt::Display for MorphoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contour(e) => write!(f, "contour: {e}"),
            Self::Correspondence(e) => write!(f, "correspondence: {e}"),
            Self::Windowing(e) => write!(f, "windowing: {e}"),
            Self::Shape(e) => write!(f, "shape: {e}"),
            Self::Segmentation(e) => write!(f, "segmentation: {e}"),
            Self::Source(e) => write!(f, "image source: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for MorphoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Contour(e) => Some(e),
            Self::Correspondence(e) => Some(e),
            Self::Windowing(e) => Some(e),
            Self::Shape(e) => Some(e),
            Self::Segmentation(e) => Some(e),
            Self::Source(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for MorphoError {
            fn from(e: $ty) -> Self {
                Self::$variant(e)
            }
        }
    };
}

impl_from!(Contour, InsufficientContourError);
impl_from!(Correspondence, CorrespondenceError);
impl_from!(Windowing, WindowingError);
impl_from!(Shape, ShapeMismatchError);
impl_from!(Segmentation, SegmentationError);
impl_from!(Source, SourceError);
impl_from!(Config, ConfigError);

/// A run aborted at `frame`.
///
/// Results of frames `0..frame` remain valid in the caller's result record.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameError {
    pub frame: usize,
    pub error: MorphoError,
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame {} failed ({}): {}", self.frame, self.error.kind(), self.error)
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
