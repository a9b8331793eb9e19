//! Discrete per-frame boundary as produced by the segmentation collaborator.

use serde::{Deserialize, Serialize};

/// Ordered, cyclic boundary points `[x, y]` (x = column, y = row) of one frame.
///
/// The sequence is implicitly closed: the last point connects back to the
/// first. Simplicity (no self-intersection) is assumed, not verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteContour {
    points: Vec<[f64; 2]>,
}

impl DiscreteContour {
    /// Wrap an ordered point list.
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self { points }
    }

    /// Build from integer pixel coordinates.
    pub fn from_pixels(pixels: &[[i32; 2]]) -> Self {
        Self {
            points: pixels.iter().map(|p| [p[0] as f64, p[1] as f64]).collect(),
        }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop consecutive duplicates and an explicit closing duplicate.
    pub fn deduplicated(&self) -> Self {
        let mut out: Vec<[f64; 2]> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            if out.last().map_or(true, |q| !same_point(*q, p)) {
                out.push(p);
            }
        }
        while out.len() > 1 && same_point(out[0], out[out.len() - 1]) {
            out.pop();
        }
        Self { points: out }
    }

    /// Signed shoelace area; positive when the points run counter-clockwise
    /// in (x, y) coordinates.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut acc = 0.0;
        for i in 0..n {
            let [x0, y0] = self.points[i];
            let [x1, y1] = self.points[(i + 1) % n];
            acc += x0 * y1 - x1 * y0;
        }
        0.5 * acc
    }

    /// Reverse the traversal direction while keeping the first point first.
    pub fn reversed(&self) -> Self {
        let mut points = Vec::with_capacity(self.points.len());
        if let Some(&first) = self.points.first() {
            points.push(first);
            points.extend(self.points[1..].iter().rev().copied());
        }
        Self { points }
    }

    /// Re-anchor the loop so that point `k` comes first.
    pub fn rotated_start(&self, k: usize) -> Self {
        let mut points = self.points.clone();
        if !points.is_empty() {
            let len = points.len();
            points.rotate_left(k % len);
        }
        Self { points }
    }

    /// Euclidean step lengths between consecutive points, including the
    /// closing step from the last point back to the first.
    pub fn step_lengths(&self) -> Vec<f64> {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
            })
            .collect()
    }
}

impl From<Vec<[f64; 2]>> for DiscreteContour {
    fn from(points: Vec<[f64; 2]>) -> Self {
        Self::new(points)
    }
}

#[inline]
fn same_point(a: [f64; 2], b: [f64; 2]) -> bool {
    (a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> DiscreteContour {
        DiscreteContour::from_pixels(&[[0, 0], [2, 0], [2, 2], [0, 2]])
    }

    #[test]
    fn signed_area_follows_orientation() {
        let c = square();
        assert_relative_eq!(c.signed_area(), 4.0);
        assert_relative_eq!(c.reversed().signed_area(), -4.0);
    }

    #[test]
    fn reversal_keeps_start_point() {
        let r = square().reversed();
        assert_eq!(r.points()[0], [0.0, 0.0]);
        assert_eq!(r.points()[1], [0.0, 2.0]);
        assert_eq!(r.points()[3], [2.0, 0.0]);
    }

    #[test]
    fn rotated_start_re_anchors_loop() {
        let r = square().rotated_start(5);
        assert_eq!(r.points()[0], [2.0, 0.0]);
        assert_relative_eq!(r.signed_area(), 4.0);
    }

    #[test]
    fn dedup_removes_repeats_and_closing_point() {
        let c = DiscreteContour::from_pixels(&[[0, 0], [1, 0], [1, 0], [1, 1], [0, 0]]);
        let d = c.deduplicated();
        assert_eq!(d.len(), 3);
        assert_eq!(d.points()[2], [1.0, 1.0]);
    }

    #[test]
    fn steps_include_closing_segment() {
        let steps = square().step_lengths();
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().all(|&s| (s - 2.0).abs() < 1e-12));
    }
}
