//! Image sources: where the pipeline gets its morphology and signal frames.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Luma};

use crate::config::DatasetConfig;
use crate::FloatImage;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// A frame file could not be read or decoded.
    Io { path: PathBuf, message: String },
    FrameOutOfRange { frame: usize, frames: usize },
    ChannelOutOfRange { channel: usize, channels: usize },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            Self::FrameOutOfRange { frame, frames } => {
                write!(f, "frame {} out of range ({} frames)", frame, frames)
            }
            Self::ChannelOutOfRange { channel, channels } => {
                write!(f, "channel {} out of range ({} channels)", channel, channels)
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Per-frame access to a time-lapse sequence.
///
/// Every image of one source must have the same shape.
pub trait ImageSource {
    fn n_frames(&self) -> usize;

    fn n_channels(&self) -> usize;

    /// Image used to segment frame `k`.
    fn load_frame_morpho(&self, k: usize) -> Result<FloatImage, SourceError>;

    /// Signal channel `channel` of frame `k`.
    fn load_frame_signal(&self, channel: usize, k: usize) -> Result<FloatImage, SourceError>;
}

fn check_frame(frame: usize, frames: usize) -> Result<(), SourceError> {
    if frame >= frames {
        return Err(SourceError::FrameOutOfRange { frame, frames });
    }
    Ok(())
}

fn check_channel(channel: usize, channels: usize) -> Result<(), SourceError> {
    if channel >= channels {
        return Err(SourceError::ChannelOutOfRange { channel, channels });
    }
    Ok(())
}

// ── In-memory ──────────────────────────────────────────────────────────────

/// Frames already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    morpho: Vec<FloatImage>,
    /// Indexed `[channel][frame]`.
    signals: Vec<Vec<FloatImage>>,
}

impl InMemorySource {
    /// `signals[channel]` must hold one image per morphology frame.
    pub fn new(morpho: Vec<FloatImage>, signals: Vec<Vec<FloatImage>>) -> Self {
        Self { morpho, signals }
    }
}

impl ImageSource for InMemorySource {
    fn n_frames(&self) -> usize {
        self.morpho.len()
    }

    fn n_channels(&self) -> usize {
        self.signals.len()
    }

    fn load_frame_morpho(&self, k: usize) -> Result<FloatImage, SourceError> {
        check_frame(k, self.morpho.len())?;
        Ok(self.morpho[k].clone())
    }

    fn load_frame_signal(&self, channel: usize, k: usize) -> Result<FloatImage, SourceError> {
        check_channel(channel, self.signals.len())?;
        let frames = &self.signals[channel];
        check_frame(k, frames.len())?;
        Ok(frames[k].clone())
    }
}

// ── File sequence ──────────────────────────────────────────────────────────

/// One image file per frame and channel, named by the dataset templates.
#[derive(Debug, Clone)]
pub struct FileSequenceSource {
    dataset: DatasetConfig,
}

impl FileSequenceSource {
    pub fn new(dataset: DatasetConfig) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &DatasetConfig {
        &self.dataset
    }
}

impl ImageSource for FileSequenceSource {
    fn n_frames(&self) -> usize {
        self.dataset.n_frames
    }

    fn n_channels(&self) -> usize {
        self.dataset.signal_templates.len()
    }

    fn load_frame_morpho(&self, k: usize) -> Result<FloatImage, SourceError> {
        check_frame(k, self.dataset.n_frames)?;
        load_float_image(&self.dataset.morpho_path(k))
    }

    fn load_frame_signal(&self, channel: usize, k: usize) -> Result<FloatImage, SourceError> {
        check_frame(k, self.dataset.n_frames)?;
        let path = self
            .dataset
            .signal_path(channel, k)
            .ok_or(SourceError::ChannelOutOfRange {
                channel,
                channels: self.n_channels(),
            })?;
        load_float_image(&path)
    }
}

/// Decode an image file as single-channel `f32`.
///
/// 8- and 16-bit grayscale keep their raw integer values; any other pixel
/// format is converted to luma normalized to `[0, 1]`.
pub fn load_float_image(path: &Path) -> Result<FloatImage, SourceError> {
    let img = image::open(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(to_float_image(img))
}

fn to_float_image(img: DynamicImage) -> FloatImage {
    match img {
        DynamicImage::ImageLuma8(g) => {
            FloatImage::from_fn(g.width(), g.height(), |x, y| Luma([g.get_pixel(x, y).0[0] as f32]))
        }
        DynamicImage::ImageLuma16(g) => {
            FloatImage::from_fn(g.width(), g.height(), |x, y| Luma([g.get_pixel(x, y).0[0] as f32]))
        }
        other => other.to_luma32f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::constant_image;
    use image::{ImageBuffer, Luma};

    #[test]
    fn in_memory_source_bounds_are_checked() {
        let src = InMemorySource::new(
            vec![constant_image(4, 4, 0.0); 2],
            vec![vec![constant_image(4, 4, 1.0); 2]],
        );
        assert_eq!(src.n_frames(), 2);
        assert_eq!(src.n_channels(), 1);
        assert!(src.load_frame_signal(0, 1).is_ok());
        assert_eq!(
            src.load_frame_morpho(2).expect_err("out of range"),
            SourceError::FrameOutOfRange { frame: 2, frames: 2 }
        );
        assert_eq!(
            src.load_frame_signal(1, 0).expect_err("out of range"),
            SourceError::ChannelOutOfRange { channel: 1, channels: 1 }
        );
    }

    #[test]
    fn sixteen_bit_values_are_kept_raw() {
        let g: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(3, 2, Luma([1234u16]));
        let f = to_float_image(DynamicImage::ImageLuma16(g));
        assert_eq!(f.dimensions(), (3, 2));
        assert_eq!(f.get_pixel(2, 1).0[0], 1234.0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_float_image(Path::new("/nonexistent/frame_001.tif")).expect_err("missing");
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
