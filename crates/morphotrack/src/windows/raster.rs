//! Curve rasterization: the sampled curve polygon plus an even–odd interior
//! fill at pixel centres.

use crate::spline::SplineCurve;

use super::types::WindowingError;

/// Rasterized curve on a `width × height` grid (pixel `(x, y)` centred at
/// integer coordinates).
#[derive(Debug, Clone)]
pub(crate) struct RasterizedContour {
    pub width: u32,
    pub height: u32,
    /// Curve samples; sample `m` has phase `m / samples.len()`.
    pub samples: Vec<[f64; 2]>,
    pub interior: Vec<bool>,
    pub n_interior: usize,
}

impl RasterizedContour {
    #[inline]
    pub fn idx(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Sample `curve` at `t_m = origin + m / n` and rasterize it.
pub(crate) fn rasterize_curve(
    shape: [u32; 2],
    curve: &SplineCurve,
    origin: f64,
    n_samples: usize,
) -> Result<RasterizedContour, WindowingError> {
    let [width, height] = shape;
    let n = n_samples.max(8);
    let polygon = curve.sample_uniform(n, origin);

    let (min, max) = bounds(&polygon);
    if max[0] < 0.0 || max[1] < 0.0 || min[0] > (width as f64 - 1.0) || min[1] > (height as f64 - 1.0)
    {
        return Err(WindowingError::CurveOutsideImage);
    }

    if let Some(segments) = find_self_intersection(&polygon) {
        return Err(WindowingError::SelfIntersection { segments });
    }

    let npx = width as usize * height as usize;
    let interior = fill_even_odd(&polygon, width, height);
    let n_interior = interior.iter().filter(|&&v| v).count();
    if n_interior == 0 {
        return Err(WindowingError::EmptyInterior);
    }
    if n_interior == npx {
        return Err(WindowingError::CurveOutsideImage);
    }

    Ok(RasterizedContour {
        width,
        height,
        samples: polygon,
        interior,
        n_interior,
    })
}

fn bounds(points: &[[f64; 2]]) -> ([f64; 2], [f64; 2]) {
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for p in points {
        for k in 0..2 {
            min[k] = min[k].min(p[k]);
            max[k] = max[k].max(p[k]);
        }
    }
    (min, max)
}

/// Scanline even–odd fill at pixel centres.
fn fill_even_odd(polygon: &[[f64; 2]], width: u32, height: u32) -> Vec<bool> {
    let n = polygon.len();
    let mut inside = vec![false; width as usize * height as usize];
    let mut crossings: Vec<f64> = Vec::new();
    for y in 0..height {
        let yc = y as f64;
        crossings.clear();
        for i in 0..n {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            if (a[1] <= yc) != (b[1] <= yc) {
                let s = (yc - a[1]) / (b[1] - a[1]);
                crossings.push(a[0] + s * (b[0] - a[0]));
            }
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for pair in crossings.chunks_exact(2) {
            let x0 = pair[0].ceil().max(0.0);
            let x1 = pair[1].floor().min(width as f64 - 1.0);
            if x1 < x0 {
                continue;
            }
            let row = y as usize * width as usize;
            for x in x0 as usize..=x1 as usize {
                inside[row + x] = true;
            }
        }
    }
    inside
}

#[inline]
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn segments_cross(p1: [f64; 2], p2: [f64; 2], q1: [f64; 2], q2: [f64; 2]) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// First pair of non-adjacent polygon edges that properly cross.
fn find_self_intersection(polygon: &[[f64; 2]]) -> Option<(usize, usize)> {
    let n = polygon.len();
    let boxes: Vec<([f64; 2], [f64; 2])> = (0..n)
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            (
                [a[0].min(b[0]), a[1].min(b[1])],
                [a[0].max(b[0]), a[1].max(b[1])],
            )
        })
        .collect();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (amin, amax) = boxes[i];
            let (bmin, bmax) = boxes[j];
            if amax[0] < bmin[0] || bmax[0] < amin[0] || amax[1] < bmin[1] || bmax[1] < amin[1] {
                continue;
            }
            if segments_cross(polygon[i], polygon[(i + 1) % n], polygon[j], polygon[(j + 1) % n]) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::DiscreteContour;
    use crate::spline::{fit_spline, SplineFitConfig};
    use crate::test_utils::circle_contour;
    use approx::assert_abs_diff_eq;

    #[test]
    fn disk_interior_matches_pixel_centres() {
        let s = fit_spline(&circle_contour([20.0, 20.0], 8.0, 90, 0.0), &SplineFitConfig::default())
            .expect("fit");
        let r = rasterize_curve([40, 40], &s, 0.0, 200).expect("raster");
        // Pixels well inside / outside the radius are classified unambiguously.
        for y in 0..40u32 {
            for x in 0..40u32 {
                let d = ((x as f64 - 20.0).powi(2) + (y as f64 - 20.0).powi(2)).sqrt();
                if d < 7.5 {
                    assert!(r.interior[r.idx(x, y)], "({x},{y}) should be inside");
                } else if d > 8.5 {
                    assert!(!r.interior[r.idx(x, y)], "({x},{y}) should be outside");
                }
            }
        }
    }

    #[test]
    fn first_sample_sits_at_origin() {
        let s = fit_spline(&circle_contour([20.0, 20.0], 8.0, 90, 0.0), &SplineFitConfig::default())
            .expect("fit");
        let r = rasterize_curve([40, 40], &s, 0.0, 200).expect("raster");
        assert_eq!(r.samples.len(), 200);
        assert_abs_diff_eq!(r.samples[0][0], 28.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r.samples[0][1], 20.0, epsilon = 1e-6);
        // A quarter-turn origin moves the first sample to angle π/2 (y = 28).
        let r = rasterize_curve([40, 40], &s, 0.25, 200).expect("raster");
        assert_abs_diff_eq!(r.samples[0][0], 20.0, epsilon = 1e-3);
        assert_abs_diff_eq!(r.samples[0][1], 28.0, epsilon = 1e-3);
    }

    #[test]
    fn figure_eight_is_rejected() {
        let pts: Vec<[f64; 2]> = (0..120)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * i as f64 / 120.0;
                [30.0 + 12.0 * t.sin(), 30.0 + 8.0 * (2.0 * t).sin()]
            })
            .collect();
        let s = fit_spline(&DiscreteContour::new(pts), &SplineFitConfig::default()).expect("fit");
        let err = rasterize_curve([60, 60], &s, 0.013, 300).expect_err("must fail");
        assert!(matches!(err, WindowingError::SelfIntersection { .. }));
    }

    #[test]
    fn curve_off_canvas_is_rejected() {
        let s = fit_spline(&circle_contour([200.0, 200.0], 5.0, 40, 0.0), &SplineFitConfig::default())
            .expect("fit");
        let err = rasterize_curve([32, 32], &s, 0.0, 100).expect_err("must fail");
        assert_eq!(err, WindowingError::CurveOutsideImage);
    }
}
