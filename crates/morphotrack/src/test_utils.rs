//! Shared synthetic contours and images for unit tests.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType};

use crate::contour::DiscreteContour;
use crate::FloatImage;

/// `n` points on a circle, counter-clockwise in (x, y), the first point at
/// angle `2π · phase`.
pub(crate) fn circle_contour(center: [f64; 2], r: f64, n: usize, phase: f64) -> DiscreteContour {
    ellipse_points(center, r, r, 0.0, n, phase)
}

/// `n` points on an ellipse with semi-axes `a`, `b` rotated by `angle`.
pub(crate) fn ellipse_contour(
    center: [f64; 2],
    a: f64,
    b: f64,
    angle: f64,
    n: usize,
) -> DiscreteContour {
    ellipse_points(center, a, b, angle, n, 0.0)
}

fn ellipse_points(
    center: [f64; 2],
    a: f64,
    b: f64,
    angle: f64,
    n: usize,
    phase: f64,
) -> DiscreteContour {
    let (s, c) = angle.sin_cos();
    let points = (0..n)
        .map(|i| {
            let t = 2.0 * std::f64::consts::PI * (phase + i as f64 / n as f64);
            let (u, v) = (a * t.cos(), b * t.sin());
            [center[0] + c * u - s * v, center[1] + s * u + c * v]
        })
        .collect();
    DiscreteContour::new(points)
}

/// Render a filled disk: `fg` for pixel centres within `r` of `center`.
pub(crate) fn draw_disk_image(
    w: u32,
    h: u32,
    center: [f64; 2],
    r: f64,
    fg: u8,
    bg: u8,
) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let d = ((x as f64 - center[0]).powi(2) + (y as f64 - center[1]).powi(2)).sqrt();
        Luma([if d <= r { fg } else { bg }])
    })
}

/// Constant-valued float image.
pub(crate) fn constant_image(w: u32, h: u32, value: f32) -> FloatImage {
    ImageBuffer::from_pixel(w, h, Luma([value]))
}

/// Pixel boundary of a rasterized disk, as a border follower would report it.
pub(crate) fn pixel_disk_contour(center: [f64; 2], r: f64) -> DiscreteContour {
    let w = (center[0] + r + 4.0).ceil() as u32;
    let h = (center[1] + r + 4.0).ceil() as u32;
    let img = draw_disk_image(w, h, center, r, 255, 0);
    let best = find_contours::<i32>(&img)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .max_by_key(|c| c.points.len())
        .map(|c| c.points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>())
        .unwrap_or_default();
    DiscreteContour::from_pixels(&best)
}
