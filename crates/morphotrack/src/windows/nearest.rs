//! Exact nearest curve-sample lookup for pixel centres.

/// Uniform bucket grid over the curve samples.
pub(crate) struct SampleIndex<'a> {
    samples: &'a [[f64; 2]],
    min: [f64; 2],
    cell: f64,
    cols: usize,
    rows: usize,
    /// Sample indices per cell, row-major.
    buckets: Vec<Vec<usize>>,
}

impl<'a> SampleIndex<'a> {
    /// `None` when there are no samples.
    pub(crate) fn new(samples: &'a [[f64; 2]]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for p in samples {
            for k in 0..2 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        let extent = (max[0] - min[0]).max(max[1] - min[1]).max(1.0);
        let cell = (extent / (samples.len() as f64).sqrt()).max(1.0);
        let cols = ((max[0] - min[0]) / cell).floor() as usize + 1;
        let rows = ((max[1] - min[1]) / cell).floor() as usize + 1;

        let mut index = Self {
            samples,
            min,
            cell,
            cols,
            rows,
            buckets: vec![Vec::new(); cols * rows],
        };
        for (m, &p) in samples.iter().enumerate() {
            let (cx, cy) = index.cell_of(p);
            index.buckets[cy * cols + cx].push(m);
        }
        Some(index)
    }

    /// Cell containing `p`, clamped into the grid.
    fn cell_of(&self, p: [f64; 2]) -> (usize, usize) {
        let clamp = |v: f64, origin: f64, n: usize| {
            let c = ((v - origin) / self.cell).floor();
            if c.is_nan() || c < 0.0 {
                0
            } else {
                (c as usize).min(n - 1)
            }
        };
        (
            clamp(p[0], self.min[0], self.cols),
            clamp(p[1], self.min[1], self.rows),
        )
    }

    /// Index of the sample closest to `p`; equidistant samples resolve to the
    /// lowest index.
    pub(crate) fn nearest(&self, p: [f64; 2]) -> usize {
        let (cx, cy) = self.cell_of(p);
        let (cx, cy) = (cx as isize, cy as isize);
        let mut best = (f64::INFINITY, usize::MAX);
        let max_ring = self.cols.max(self.rows) as isize;

        for k in 0..=max_ring {
            let mut visit = |x: isize, y: isize| {
                if x < 0 || y < 0 || x >= self.cols as isize || y >= self.rows as isize {
                    return;
                }
                for &m in &self.buckets[y as usize * self.cols + x as usize] {
                    let s = self.samples[m];
                    let d2 = (s[0] - p[0]).powi(2) + (s[1] - p[1]).powi(2);
                    if d2 < best.0 || (d2 == best.0 && m < best.1) {
                        best = (d2, m);
                    }
                }
            };
            if k == 0 {
                visit(cx, cy);
            } else {
                for dx in -k..=k {
                    visit(cx + dx, cy - k);
                    visit(cx + dx, cy + k);
                }
                for dy in (1 - k)..k {
                    visit(cx - k, cy + dy);
                    visit(cx + k, cy + dy);
                }
            }
            // Cells beyond ring k lie at least k cells away from `p`.
            let reach = k as f64 * self.cell;
            if best.0 < reach * reach {
                break;
            }
        }
        best.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(samples: &[[f64; 2]], p: [f64; 2]) -> usize {
        let mut best = (f64::INFINITY, 0);
        for (m, s) in samples.iter().enumerate() {
            let d2 = (s[0] - p[0]).powi(2) + (s[1] - p[1]).powi(2);
            if d2 < best.0 {
                best = (d2, m);
            }
        }
        best.1
    }

    #[test]
    fn matches_exhaustive_search() {
        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<[f64; 2]> = (0..300)
            .map(|m| {
                let t = 2.0 * std::f64::consts::PI * m as f64 / 300.0;
                let r = 40.0 + rng.gen_range(-3.0..3.0);
                [64.0 + r * t.cos(), 50.0 + 0.6 * r * t.sin()]
            })
            .collect();
        let index = SampleIndex::new(&samples).expect("non-empty");
        for _ in 0..500 {
            let p = [rng.gen_range(0.0..128.0), rng.gen_range(0.0..100.0)];
            let got = index.nearest(p);
            let want = brute_force(&samples, p);
            let d = |m: usize| (samples[m][0] - p[0]).hypot(samples[m][1] - p[1]);
            assert_eq!(d(got), d(want), "query {p:?}");
        }
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let samples = [[0.0, 10.0], [10.0, 0.0], [0.0, -10.0], [-10.0, 0.0]];
        let index = SampleIndex::new(&samples).expect("non-empty");
        assert_eq!(index.nearest([0.0, 0.0]), 0);
        assert_eq!(index.nearest([9.0, 1.0]), 1);
    }

    #[test]
    fn empty_sample_set_has_no_index() {
        assert!(SampleIndex::new(&[]).is_none());
    }
}
