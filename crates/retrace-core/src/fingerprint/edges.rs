//! Edge density: the share of pixels a fixed-threshold Sobel detector marks
//! as edges.

use image::{GrayImage, Luma};

/// Gradient magnitude at or above which a pixel counts as an edge.
pub const EDGE_THRESHOLD: f64 = 128.0;

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Fraction of pixels classified as edges, in [0, 1].
///
/// Border pixels have no full neighbourhood and are never edges, but they
/// still count toward the denominator.
pub fn edge_density(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let total = u64::from(width) * u64::from(height);
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut edges: u64 = 0;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if gradient_magnitude(gray, x, y) >= EDGE_THRESHOLD {
                edges += 1;
            }
        }
    }

    edges as f64 / total as f64
}

fn gradient_magnitude(gray: &GrayImage, x: u32, y: u32) -> f64 {
    let mut gx = 0i32;
    let mut gy = 0i32;
    for ky in 0..3u32 {
        for kx in 0..3u32 {
            let Luma([value]) = *gray.get_pixel(x + kx - 1, y + ky - 1);
            let value = i32::from(value);
            gx += value * SOBEL_X[ky as usize][kx as usize];
            gy += value * SOBEL_Y[ky as usize][kx as usize];
        }
    }
    f64::from(gx * gx + gy * gy).sqrt()
}
