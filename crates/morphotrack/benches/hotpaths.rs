use std::f64::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use morphotrack::{
    fit_spline, CorrespondenceSolver, DiscreteContour, ParameterSet, SplineCurve, SplineFitConfig,
    WindowConfig, WindowGridBuilder,
};

fn make_blob_contour(n: usize, radius: f64, lobes: f64, seed: u64) -> DiscreteContour {
    let (cx, cy) = (128.0f64, 128.0f64);
    let mut rng = StdRng::seed_from_u64(seed);
    let points = (0..n)
        .map(|i| {
            let t = 2.0 * PI * (i as f64) / (n as f64);
            let r = radius * (1.0 + 0.12 * (lobes * t).cos()) + rng.gen_range(-0.3f64..0.3f64);
            [cx + r * t.cos(), cy + r * t.sin()]
        })
        .collect();
    DiscreteContour::new(points)
}

fn fit(contour: &DiscreteContour, smoothing: f64) -> SplineCurve {
    let config = SplineFitConfig {
        smoothing,
        ..Default::default()
    };
    fit_spline(contour, &config).expect("deterministic fixture should always fit")
}

fn bench_spline_fit(c: &mut Criterion) {
    let contour = make_blob_contour(400, 80.0, 5.0, 7);
    c.bench_function("spline_fit_400pts_interp", |b| {
        b.iter(|| black_box(fit(black_box(&contour), 0.0)))
    });
    c.bench_function("spline_fit_400pts_smooth", |b| {
        b.iter(|| black_box(fit(black_box(&contour), 2.0)))
    });
}

fn bench_correspondence(c: &mut Criterion) {
    let s0 = fit(&make_blob_contour(300, 80.0, 5.0, 1), 1.0);
    let s1 = fit(&make_blob_contour(300, 83.0, 5.0, 2), 1.0);
    let solver = CorrespondenceSolver::default();
    let t0 = ParameterSet::uniform(64, 0.0);
    c.bench_function("correspondence_64pts", |b| {
        b.iter(|| {
            let r = solver
                .solve(black_box(&s0), black_box(&s1), &t0, &t0)
                .expect("deterministic fixture should converge");
            black_box(r)
        })
    });
}

fn bench_windows(c: &mut Criterion) {
    let s = fit(&make_blob_contour(400, 80.0, 5.0, 3), 1.0);
    let builder = WindowGridBuilder::new(32, 4, WindowConfig::default());
    c.bench_function("window_grid_256x256_32x4", |b| {
        b.iter(|| {
            let grid = builder
                .build([256, 256], black_box(&s), 0.0)
                .expect("deterministic fixture should rasterize");
            black_box(grid)
        })
    });
}

criterion_group!(hotpaths, bench_spline_fit, bench_correspondence, bench_windows);
criterion_main!(hotpaths);
