//! Utilities for generating examples, benchmarks, and test cases.

use kurbo::{Point, Shape};

use crate::{Contour, ContourSet};

/// Generate a bunch of squares, arranged in a grid.
///
/// The bottom-left of the first square is at (x0, y0). Each square has size `size
/// x size`, and the distance between squares (both horizontally and vertically)
/// is `offset`.
///
/// If `slant` is non-zero, generates parallelograms instead of squares: the
/// right-hand side of each square gets translated up by `slant`.
fn squares(
    (x0, y0): (f64, f64),
    size: f64,
    offset: f64,
    slant: f64,
    count: usize,
) -> impl Iterator<Item = Contour> {
    (0..count).flat_map(move |i| {
        let x = x0 + i as f64 * offset;
        (0..count).map(move |j| {
            let y = y0 + j as f64 * offset;
            Contour::from_polygon([
                Point::new(x, y),
                Point::new(x + size, y + slant),
                Point::new(x + size, y + size + slant),
                Point::new(x, y + size),
            ])
        })
    })
}

/// Generate an `n` by `n` checkerboard-like pattern with overlapping squares.
/// For `n = 3`, it looks like:
///
/// ```text
/// +----+ +----+ +----+
/// |    | |    | |    |
/// |  +-+-+-++-+-+-+  |
/// +--+-+ +-++-+ +-+--+
/// +--+-+ +-++-+ +-+--+
/// |  +-+-+-++-+-+-+  |
/// |  +-+-+-++-+-+-+  |
/// +--+-+ +-++-+ +-+--+
/// +--+-+ +-++-+ +-+--+
/// |  +-+-+-++-+-+-+  |
/// |    | |    | |    |
/// +----+ +----+ +----+
/// ```
///
/// That is, an `n x n` grid of non-overlapping squares, with an
/// `(n - 1) x (n - 1)` grid of squares on top that overlaps each of them.
pub fn checkerboard(n: usize) -> ContourSet {
    squares((0.0, 0.0), 30.0, 40.0, 0.0, n)
        .chain(squares((20.0, 20.0), 30.0, 40.0, 0.0, n.saturating_sub(1)))
        .collect()
}

/// Like `checkerboard`, but with no exactly-horizontal lines.
pub fn slanted_checkerboard(n: usize) -> ContourSet {
    squares((0.0, 0.0), 30.0, 40.0, 1.0, n)
        .chain(squares((20.0, 20.0), 30.0, 40.0, 1.0, n.saturating_sub(1)))
        .collect()
}

/// A ring of `n` overlapping circles, like the petals of a flower.
///
/// Every circle crosses its two neighbors, so the union is a single contour
/// with a hole in the middle (as long as `n` is at least 7).
pub fn circle_ring(n: usize) -> ContourSet {
    let radius = 30.0;
    let ring_radius = 60.0;
    let mut path = kurbo::BezPath::new();
    for i in 0..n {
        let theta = i as f64 * std::f64::consts::TAU / n as f64;
        let center = Point::new(ring_radius * theta.cos(), ring_radius * theta.sin());
        path.extend(kurbo::Circle::new(center, radius).path_elements(1e-3));
    }
    // Circles are always closed, so this can't fail.
    ContourSet::from_bez_path(&path).unwrap_or_default()
}
