//! Threshold segmentation: the default producer of per-frame contours.
//!
//! Smooth, binarise, follow borders, keep the longest outer border. Any
//! other segmentation can be plugged into the pipeline through the
//! [`Segmenter`] trait.

use std::cmp::Ordering;

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use serde::{Deserialize, Serialize};

use crate::contour::DiscreteContour;
use crate::FloatImage;

// ── Error type ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationError {
    /// No foreground border was found at this threshold.
    NoContour { threshold: f64 },
    /// The image has no pixels.
    EmptyImage,
}

impl std::fmt::Display for SegmentationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoContour { threshold } => {
                write!(f, "no contour found at threshold {}", threshold)
            }
            Self::EmptyImage => write!(f, "image is empty"),
        }
    }
}

impl std::error::Error for SegmentationError {}

// ── Configuration ──────────────────────────────────────────────────────────

/// Threshold applied to the smoothed morphology image of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSchedule {
    /// Same threshold for every frame.
    Fixed(f64),
    /// One threshold per frame; frames past the end reuse the last entry.
    PerFrame(Vec<f64>),
    /// Otsu's threshold of each frame.
    Otsu,
}

impl ThresholdSchedule {
    /// Threshold for `frame`, or `None` if it must be computed from the image.
    pub fn for_frame(&self, frame: usize) -> Option<f64> {
        match self {
            Self::Fixed(t) => Some(*t),
            Self::PerFrame(ts) => ts.get(frame).or_else(|| ts.last()).copied(),
            Self::Otsu => None,
        }
    }
}

/// Segmentation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Gaussian smoothing σ in pixels; 0 disables smoothing.
    pub sigma: f64,
    pub threshold: ThresholdSchedule,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            threshold: ThresholdSchedule::Otsu,
        }
    }
}

// ── Segmenters ─────────────────────────────────────────────────────────────

/// Produces the discrete cell contour of one frame.
pub trait Segmenter {
    fn segment(&self, image: &FloatImage, frame: usize) -> Result<DiscreteContour, SegmentationError>;
}

/// Smoothing + global threshold segmenter.
#[derive(Debug, Clone, Default)]
pub struct ThresholdSegmenter {
    config: SegmentationConfig,
}

impl ThresholdSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }
}

impl Segmenter for ThresholdSegmenter {
    fn segment(&self, image: &FloatImage, frame: usize) -> Result<DiscreteContour, SegmentationError> {
        segment(image, self.config.sigma, self.config.threshold.for_frame(frame))
    }
}

/// Contour of the brightest connected region of `image`.
///
/// Pixels strictly above `threshold` are foreground; `None` selects Otsu's
/// threshold on the smoothed image.
pub fn segment(
    image: &FloatImage,
    sigma: f64,
    threshold: Option<f64>,
) -> Result<DiscreteContour, SegmentationError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(SegmentationError::EmptyImage);
    }

    let smoothed = if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(image, sigma as f32)
    } else {
        image.clone()
    };

    let threshold = match threshold {
        Some(t) => t,
        None => otsu_threshold(&smoothed),
    };

    let binary = GrayImage::from_fn(w, h, |x, y| {
        if smoothed.get_pixel(x, y).0[0] as f64 > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let outer: Vec<_> = find_contours::<i32>(&binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .collect();
    if outer.len() > 1 {
        tracing::warn!(
            candidates = outer.len(),
            threshold,
            "several foreground regions; keeping the longest border"
        );
    }
    let best = outer
        .into_iter()
        .max_by_key(|c| c.points.len())
        .filter(|c| c.points.len() >= 3)
        .ok_or(SegmentationError::NoContour { threshold })?;

    let pixels: Vec<[i32; 2]> = best.points.iter().map(|p| [p.x, p.y]).collect();
    tracing::trace!(points = pixels.len(), threshold, "contour extracted");
    Ok(DiscreteContour::from_pixels(&pixels))
}

/// Otsu's threshold of a float image, computed on its 8-bit min–max
/// rescaling.
fn otsu_threshold(image: &FloatImage) -> f64 {
    let (lo, hi) = image
        .pixels()
        .map(|p| p.0[0] as f64)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if hi.partial_cmp(&lo) != Some(Ordering::Greater) {
        return hi;
    }
    let scale = 255.0 / (hi - lo);
    let gray = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = (image.get_pixel(x, y).0[0] as f64 - lo) * scale;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    });
    let level = imageproc::contrast::otsu_level(&gray);
    lo + level as f64 / scale
}
