//! SignalSampler: per-window intensity statistics of the signal channels.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ShapeMismatchError;
use crate::windows::{Window, WindowGrid};
use crate::FloatImage;

/// Mean and population variance of the pixels under one window.
///
/// Both are NaN for a window without pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub mean: f64,
    pub var: f64,
    pub count: usize,
}

impl WindowStatistics {
    pub const EMPTY: Self = Self {
        mean: f64::NAN,
        var: f64::NAN,
        count: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Statistics of one channel over a window grid, indexed `[j][i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatistics {
    pub mean: Vec<Vec<f64>>,
    pub var: Vec<Vec<f64>>,
}

/// Reduces channel images over the windows of a grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalSampler;

impl SignalSampler {
    pub fn new() -> Self {
        Self
    }

    /// Statistics of `image` under `window`.
    pub fn sample_window(&self, window: &Window, image: &FloatImage) -> WindowStatistics {
        sample_pixels(&window.pixels, image)
    }

    /// All `I × J` windows of `grid` over one channel image.
    ///
    /// The image must have the grid's dimensions.
    pub fn sample_channel(&self, grid: &WindowGrid, image: &FloatImage) -> ChannelStatistics {
        let (i_n, j_n) = (grid.n_angular(), grid.n_radial());
        let mut mean = vec![vec![f64::NAN; i_n]; j_n];
        let mut var = vec![vec![f64::NAN; i_n]; j_n];
        for w in grid.windows() {
            let s = sample_pixels(&w.pixels, image);
            mean[w.radial][w.angular] = s.mean;
            var[w.radial][w.angular] = s.var;
        }
        ChannelStatistics { mean, var }
    }

    /// Sample every channel of `frame` in parallel, after checking that each
    /// image matches the grid shape.
    pub fn sample_channels(
        &self,
        grid: &WindowGrid,
        channels: &[FloatImage],
        frame: usize,
    ) -> Result<Vec<ChannelStatistics>, ShapeMismatchError> {
        let (w, h) = grid.dimensions();
        for (c, img) in channels.iter().enumerate() {
            if img.dimensions() != (w, h) {
                return Err(ShapeMismatchError {
                    expected: [w, h],
                    got: [img.width(), img.height()],
                    channel: Some(c),
                    frame,
                });
            }
        }
        Ok(channels
            .par_iter()
            .map(|img| self.sample_channel(grid, img))
            .collect())
    }
}

/// Welford accumulation of mean and population variance.
fn sample_pixels(pixels: &[[u32; 2]], image: &FloatImage) -> WindowStatistics {
    if pixels.is_empty() {
        return WindowStatistics::EMPTY;
    }
    let mut mean = 0.0f64;
    let mut m2 = 0.0f64;
    let mut count = 0usize;
    for &[x, y] in pixels {
        let v = image.get_pixel(x, y).0[0] as f64;
        count += 1;
        let delta = v - mean;
        mean += delta / count as f64;
        m2 += delta * (v - mean);
    }
    WindowStatistics {
        mean,
        var: m2 / count as f64,
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::{fit_spline, SplineFitConfig};
    use crate::test_utils::{circle_contour, constant_image};
    use crate::windows::{WindowConfig, WindowGridBuilder};
    use approx::assert_relative_eq;
    use image::Luma;

    #[test]
    fn empty_window_yields_nan_sentinel() {
        let img = constant_image(8, 8, 3.0);
        let w = Window {
            angular: 0,
            radial: 0,
            pixels: Vec::new(),
        };
        let s = SignalSampler::new().sample_window(&w, &img);
        assert!(s.is_empty());
        assert!(s.mean.is_nan() && s.var.is_nan());
    }

    #[test]
    fn window_moments_match_direct_computation() {
        let mut img = constant_image(4, 4, 0.0);
        let values = [1.0f32, 2.0, 4.0, 7.0];
        let pixels: Vec<[u32; 2]> = (0..4).map(|k| [k, 1]).collect();
        for (&[x, y], &v) in pixels.iter().zip(&values) {
            img.put_pixel(x, y, Luma([v]));
        }
        let w = Window {
            angular: 0,
            radial: 0,
            pixels,
        };
        let s = SignalSampler::new().sample_window(&w, &img);
        assert_eq!(s.count, 4);
        assert_relative_eq!(s.mean, 3.5);
        // population variance: (6.25 + 2.25 + 0.25 + 12.25) / 4
        assert_relative_eq!(s.var, 5.25, epsilon = 1e-12);
    }

    #[test]
    fn channels_are_sampled_independently() {
        let s = fit_spline(&circle_contour([16.0, 16.0], 9.0, 80, 0.0), &SplineFitConfig::default())
            .expect("fit");
        let grid = WindowGridBuilder::new(4, 2, WindowConfig::default())
            .build([32, 32], &s, 0.0)
            .expect("grid");
        let channels = vec![constant_image(32, 32, 1.5), constant_image(32, 32, -2.0)];
        let stats = SignalSampler::new()
            .sample_channels(&grid, &channels, 0)
            .expect("sample");
        assert_eq!(stats.len(), 2);
        for (c, expected) in [(0, 1.5), (1, -2.0)] {
            for j in 0..2 {
                for i in 0..4 {
                    if grid.window(i, j).is_empty() {
                        assert!(stats[c].mean[j][i].is_nan());
                        continue;
                    }
                    assert_relative_eq!(stats[c].mean[j][i], expected);
                    assert_relative_eq!(stats[c].var[j][i], 0.0);
                }
            }
        }
    }

    #[test]
    fn mismatched_channel_shape_is_reported() {
        let s = fit_spline(&circle_contour([16.0, 16.0], 9.0, 80, 0.0), &SplineFitConfig::default())
            .expect("fit");
        let grid = WindowGridBuilder::new(4, 2, WindowConfig::default())
            .build([32, 32], &s, 0.0)
            .expect("grid");
        let channels = vec![constant_image(32, 32, 0.0), constant_image(30, 32, 0.0)];
        let err = SignalSampler::new()
            .sample_channels(&grid, &channels, 5)
            .expect_err("must fail");
        assert_eq!(err.channel, Some(1));
        assert_eq!(err.frame, 5);
        assert_eq!(err.got, [30, 32]);
    }
}
