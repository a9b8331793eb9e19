//! Angular × radial partition of the rasterized interior.

use image::{GrayImage, Luma};
use imageproc::distance_transform::euclidean_squared_distance_transform;

use crate::spline::SplineCurve;

use super::nearest::SampleIndex;
use super::raster::{rasterize_curve, RasterizedContour};
use super::types::{RadialBanding, Window, WindowConfig, WindowGrid, WindowingError};

/// Builds the `I × J` window grid of one frame.
#[derive(Debug, Clone)]
pub struct WindowGridBuilder {
    n_angular: usize,
    n_radial: usize,
    config: WindowConfig,
}

impl WindowGridBuilder {
    pub fn new(n_angular: usize, n_radial: usize, config: WindowConfig) -> Self {
        Self {
            n_angular: n_angular.max(1),
            n_radial: n_radial.max(1),
            config,
        }
    }

    pub fn n_angular(&self) -> usize {
        self.n_angular
    }

    pub fn n_radial(&self) -> usize {
        self.n_radial
    }

    /// Partition the interior of `curve` on a `[width, height]` grid.
    ///
    /// Angular bin `i` holds the pixels whose nearest boundary sample has
    /// phase in `[i/I, (i+1)/I)` measured from `origin`; radial layer `j = 0`
    /// touches the boundary.
    pub fn build(
        &self,
        shape: [u32; 2],
        curve: &SplineCurve,
        origin: f64,
    ) -> Result<WindowGrid, WindowingError> {
        let n_samples = ((self.config.samples_per_pixel.max(0.5) * curve.length()).ceil() as usize)
            .max(4 * self.n_angular);
        let raster = rasterize_curve(shape, curve, origin, n_samples)?;
        let index = SampleIndex::new(&raster.samples).ok_or(WindowingError::EmptyInterior)?;
        let n_phase = raster.samples.len() as f64;
        let depth = interior_depth(&raster);

        let (i_n, j_n) = (self.n_angular, self.n_radial);
        let layer = radial_classifier(self.config.banding, j_n, &depth, &raster);

        let mut windows: Vec<Window> = (0..j_n)
            .flat_map(|j| {
                (0..i_n).map(move |i| Window {
                    angular: i,
                    radial: j,
                    pixels: Vec::new(),
                })
            })
            .collect();

        for y in 0..raster.height {
            for x in 0..raster.width {
                let idx = raster.idx(x, y);
                if !raster.interior[idx] {
                    continue;
                }
                let m = index.nearest([x as f64, y as f64]);
                let i = ((m as f64 / n_phase * i_n as f64).floor() as usize).min(i_n - 1);
                let j = layer(depth[idx]);
                windows[j * i_n + i].pixels.push([x, y]);
            }
        }

        let empty = windows.iter().filter(|w| w.is_empty()).count();
        tracing::trace!(
            interior = raster.n_interior,
            n_samples = raster.samples.len(),
            empty_windows = empty,
            "window grid built"
        );

        Ok(WindowGrid {
            width: raster.width,
            height: raster.height,
            n_angular: i_n,
            n_radial: j_n,
            windows,
            interior_pixels: raster.n_interior,
        })
    }
}

/// Euclidean distance of each pixel to the nearest exterior pixel centre.
fn interior_depth(raster: &RasterizedContour) -> Vec<f64> {
    let exterior = GrayImage::from_fn(raster.width, raster.height, |x, y| {
        if raster.interior[raster.idx(x, y)] {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });
    let dt = euclidean_squared_distance_transform(&exterior);
    dt.pixels().map(|p| p.0[0].sqrt()).collect()
}

fn radial_classifier(
    banding: RadialBanding,
    n_radial: usize,
    depth: &[f64],
    raster: &RasterizedContour,
) -> impl Fn(f64) -> usize {
    let max_depth = depth
        .iter()
        .zip(&raster.interior)
        .filter(|(_, &inside)| inside)
        .map(|(d, _)| *d)
        .fold(1.0_f64, f64::max);
    move |d: f64| {
        let j = match banding {
            RadialBanding::Uniform => {
                if max_depth <= 1.0 {
                    0.0
                } else {
                    ((d - 1.0) / (max_depth - 1.0) * n_radial as f64).floor()
                }
            }
            RadialBanding::FixedDepth { depth_px } => ((d - 1.0) / depth_px.max(1e-6)).floor(),
        };
        (j.max(0.0) as usize).min(n_radial - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::{fit_spline, SplineFitConfig};
    use crate::test_utils::{circle_contour, ellipse_contour};
    use std::f64::consts::PI;

    fn disk_curve(center: [f64; 2], r: f64) -> SplineCurve {
        fit_spline(&circle_contour(center, r, 120, 0.0), &SplineFitConfig::default()).expect("fit")
    }

    #[test]
    fn windows_partition_the_interior() {
        let s = fit_spline(
            &ellipse_contour([32.0, 30.0], 18.0, 11.0, 0.4, 160),
            &SplineFitConfig::default(),
        )
        .expect("fit");
        let grid = WindowGridBuilder::new(8, 3, WindowConfig::default())
            .build([64, 64], &s, 0.0)
            .expect("grid");

        let mut seen = vec![0u32; 64 * 64];
        for w in grid.windows() {
            for &[x, y] in &w.pixels {
                seen[(y * 64 + x) as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c <= 1), "windows overlap");
        let covered = seen.iter().filter(|&&c| c == 1).count();
        assert_eq!(covered, grid.interior_pixels());
        assert!((0..8).all(|i| !grid.window(i, 0).is_empty()));
    }

    #[test]
    fn outer_layer_touches_boundary_and_centre_is_deepest() {
        let s = disk_curve([32.0, 32.0], 12.0);
        let grid = WindowGridBuilder::new(4, 3, WindowConfig::default())
            .build([64, 64], &s, 0.0)
            .expect("grid");
        assert!(grid.window(0, 0).pixels.contains(&[39, 39]));
        assert!(grid.window(0, 2).pixels.contains(&[33, 33]));
        assert!(grid.window(2, 0).pixels.contains(&[25, 25]));
    }

    #[test]
    fn sectors_follow_the_geometric_angle_on_a_disk() {
        let centre = [32.0, 32.0];
        let s = disk_curve(centre, 12.0);
        let n_angular = 4;
        let grid = WindowGridBuilder::new(n_angular, 3, WindowConfig::default())
            .build([64, 64], &s, 0.0)
            .expect("grid");

        let mut checked = 0;
        for w in grid.windows() {
            for &[x, y] in &w.pixels {
                let (dx, dy) = (x as f64 - centre[0], y as f64 - centre[1]);
                if dx.hypot(dy) < 1.0 {
                    continue;
                }
                let phase = dy.atan2(dx).rem_euclid(2.0 * PI) / (2.0 * PI);
                let scaled = phase * n_angular as f64;
                // Skip pixels within a sample spacing of a sector border.
                if (scaled - scaled.round()).abs() < 0.02 {
                    continue;
                }
                assert_eq!(w.angular, scaled.floor() as usize, "pixel ({x},{y})");
                checked += 1;
            }
        }
        assert!(checked > 400, "only {checked} pixels checked");
        assert!(grid.window(0, 2).pixels.contains(&[33, 33]));
    }

    #[test]
    fn fixed_depth_banding_uses_pixel_layers() {
        let s = disk_curve([32.0, 32.0], 12.0);
        let config = WindowConfig {
            banding: RadialBanding::FixedDepth { depth_px: 2.0 },
            ..Default::default()
        };
        let grid = WindowGridBuilder::new(4, 4, config)
            .build([64, 64], &s, 0.0)
            .expect("grid");
        // The pixel adjacent to the rim has depth 1 → layer 0.
        let rim = grid
            .windows()
            .iter()
            .find(|w| w.pixels.contains(&[43, 32]))
            .map(|w| w.radial);
        assert_eq!(rim, Some(0));
        // The centre is ~12 px deep → clamped into the last layer.
        let centre_layer = grid
            .windows()
            .iter()
            .find(|w| w.pixels.contains(&[32, 32]))
            .map(|w| w.radial);
        assert_eq!(centre_layer, Some(3));
    }

    #[test]
    fn label_image_encodes_window_index() {
        let s = disk_curve([20.0, 20.0], 8.0);
        let grid = WindowGridBuilder::new(4, 2, WindowConfig::default())
            .build([40, 40], &s, 0.0)
            .expect("grid");
        let labels = grid.label_image();
        assert_eq!(labels.get_pixel(0, 0).0[0], 0);
        let centre = labels.get_pixel(20, 20).0[0];
        assert!(centre >= 1 + 4, "centre belongs to the inner layer, got {centre}");
        let mask = grid.mask(1, 0);
        let on = mask.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(on, grid.window(1, 0).pixels.len());
    }

    #[test]
    fn sub_pixel_curve_has_empty_interior() {
        let s = fit_spline(&circle_contour([10.5, 10.5], 0.3, 24, 0.0), &SplineFitConfig::default())
            .expect("fit");
        let err = WindowGridBuilder::new(4, 2, WindowConfig::default())
            .build([20, 20], &s, 0.0)
            .expect_err("must fail");
        assert_eq!(err, WindowingError::EmptyInterior);
    }

    #[test]
    fn curve_outside_image_is_rejected() {
        let s = disk_curve([-50.0, 10.0], 6.0);
        let err = WindowGridBuilder::new(4, 2, WindowConfig::default())
            .build([32, 32], &s, 0.0)
            .expect_err("must fail");
        assert_eq!(err, WindowingError::CurveOutsideImage);
    }
}
