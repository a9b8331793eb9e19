use image::{GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

// ── Error type ─────────────────────────────────────────────────────────────

/// Failure to rasterize a curve or partition its interior.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowingError {
    /// No pixel centre lies inside the curve.
    EmptyInterior,
    /// The sampled curve crosses itself.
    SelfIntersection {
        /// Indices of two crossing polygon segments.
        segments: (usize, usize),
    },
    /// The curve does not overlap the image, or encloses all of it.
    CurveOutsideImage,
}

impl std::fmt::Display for WindowingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInterior => write!(f, "curve encloses no pixel"),
            Self::SelfIntersection { segments } => write!(
                f,
                "rasterized curve self-intersects (segments {} and {})",
                segments.0, segments.1
            ),
            Self::CurveOutsideImage => write!(f, "curve does not fit the image"),
        }
    }
}

impl std::error::Error for WindowingError {}

// ── Configuration ──────────────────────────────────────────────────────────

/// How interior depth is split into radial layers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadialBanding {
    /// `J` equal bands between the boundary and the deepest pixel.
    #[default]
    Uniform,
    /// Bands of fixed depth; the last layer takes everything deeper.
    FixedDepth { depth_px: f64 },
}

/// Window construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Radial layering rule.
    pub banding: RadialBanding,
    /// Curve samples per pixel of arc length used for rasterization.
    pub samples_per_pixel: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            banding: RadialBanding::Uniform,
            samples_per_pixel: 2.0,
        }
    }
}

// ── Grid ───────────────────────────────────────────────────────────────────

/// One sampling window: pixels `[x, y]` of angular bin `i`, radial layer `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub angular: usize,
    pub radial: usize,
    pub pixels: Vec<[u32; 2]>,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Disjoint `I × J` partition of the rasterized curve interior.
#[derive(Debug, Clone)]
pub struct WindowGrid {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) n_angular: usize,
    pub(crate) n_radial: usize,
    /// Row-major by layer: index `j * I + i`.
    pub(crate) windows: Vec<Window>,
    pub(crate) interior_pixels: usize,
}

impl WindowGrid {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn n_angular(&self) -> usize {
        self.n_angular
    }

    pub fn n_radial(&self) -> usize {
        self.n_radial
    }

    /// Number of pixels inside the curve.
    pub fn interior_pixels(&self) -> usize {
        self.interior_pixels
    }

    /// Window at angular bin `i`, radial layer `j`.
    pub fn window(&self, i: usize, j: usize) -> &Window {
        &self.windows[j * self.n_angular + i]
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Boolean mask (255 inside) of window `(i, j)`.
    pub fn mask(&self, i: usize, j: usize) -> GrayImage {
        let mut img = GrayImage::new(self.width, self.height);
        for &[x, y] in &self.window(i, j).pixels {
            img.put_pixel(x, y, Luma([255]));
        }
        img
    }

    /// Label map: 0 outside, `1 + j·I + i` inside window `(i, j)`.
    pub fn label_image(&self) -> ImageBuffer<Luma<u32>, Vec<u32>> {
        let mut img = ImageBuffer::new(self.width, self.height);
        for (idx, w) in self.windows.iter().enumerate() {
            for &[x, y] in &w.pixels {
                img.put_pixel(x, y, Luma([idx as u32 + 1]));
            }
        }
        img
    }
}
