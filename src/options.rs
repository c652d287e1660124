//! Configuration for the overlap-removal pipeline.
//!
//! Everything that tunes the engine's behavior is passed in explicitly
//! through [`Options`]; there are no global constants that affect results.

use kurbo::Rect;

/// A fill rule tells us how to decide whether a point is "inside" a set of contours.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub enum FillRule {
    /// The point is "inside" if its winding number is odd.
    EvenOdd,
    /// The point is "inside" if its winding number is non-zero.
    #[default]
    NonZero,
}

/// What to do with the overlapping regions.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub enum Mode {
    /// Keep everything that is inside according to the fill rule, merging
    /// overlapping regions.
    #[default]
    RemoveOverlap,
    /// Keep only the regions that are covered at least twice.
    ///
    /// This ignores the fill rule: a point is kept if the absolute value of
    /// its winding number is at least two.
    Intersect,
    /// Don't remove anything, just split segments at every intersection.
    FindIntersections,
}

/// Which contours take part in the operation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub enum Scope {
    /// Every contour.
    #[default]
    All,
    /// Only contours that are marked as selected. The others are passed
    /// through unchanged.
    Selected,
}

/// The direction of the outer contours in the output.
///
/// Holes always run the other way. Directions are given in a coordinate
/// system where `y` points up.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub enum Orientation {
    /// Outer contours have positive signed area.
    #[default]
    CounterClockwise,
    /// Outer contours have negative signed area.
    Clockwise,
}

/// Numerical tolerances.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tolerances {
    /// Points closer than this are considered the same point.
    pub position: f64,
    /// Directions whose unit vectors have a cross product smaller than this
    /// are considered parallel.
    pub angle: f64,
    /// Relative threshold below which the discriminant of a quadratic is
    /// treated as zero (a double root, rather than two close roots).
    pub discriminant: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            position: 1e-6,
            angle: 1e-7,
            discriminant: 1e-12,
        }
    }
}

impl Tolerances {
    /// Tolerances appropriate for input that fits inside `bounds`.
    ///
    /// Larger coordinates have coarser floating-point resolution, so the
    /// position tolerance grows with the magnitude of the input.
    ///
    /// The bounds must be finite.
    pub fn for_bounds(bounds: Rect) -> Self {
        let m = bounds
            .x0
            .abs()
            .max(bounds.x1.abs())
            .max(bounds.y0.abs())
            .max(bounds.y1.abs());
        let eps = (m * (f64::EPSILON * 64.0)).max(1e-6);
        debug_assert!(eps.is_finite());
        Tolerances {
            position: eps,
            ..Tolerances::default()
        }
    }
}

/// Everything that configures a call to [`remove_overlap`](crate::remove_overlap).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Options {
    /// How winding numbers are turned into "inside" or "outside".
    pub fill_rule: FillRule,
    /// Which kind of operation to perform.
    pub mode: Mode,
    /// Which contours to operate on.
    pub scope: Scope,
    /// The orientation of outer contours in the output.
    pub orientation: Orientation,
    /// Numerical tolerances.
    ///
    /// If `None`, they are derived from the input's bounding box using
    /// [`Tolerances::for_bounds`].
    pub tolerances: Option<Tolerances>,
    /// How many times a winding ray may be moved before we give up on
    /// finding a clean one.
    ///
    /// Anything above [`RAY_RETRY_LIMIT`](crate::winding::RAY_RETRY_LIMIT)
    /// is treated as that limit.
    pub max_ray_retries: usize,
    /// How many subdivision steps we spend on a single pair of curves before
    /// deciding that they coincide.
    pub max_subdivisions: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            fill_rule: FillRule::default(),
            mode: Mode::default(),
            scope: Scope::default(),
            orientation: Orientation::default(),
            tolerances: None,
            max_ray_retries: 8,
            max_subdivisions: 4096,
        }
    }
}

impl Options {
    /// Default options, but with the given fill rule.
    pub fn with_fill_rule(fill_rule: FillRule) -> Self {
        Options {
            fill_rule,
            ..Options::default()
        }
    }

    /// Is a point with winding number `winding` part of the output?
    pub fn inside(&self, winding: i32) -> bool {
        match self.mode {
            Mode::Intersect => winding.abs() >= 2,
            Mode::RemoveOverlap | Mode::FindIntersections => match self.fill_rule {
                FillRule::EvenOdd => winding % 2 != 0,
                FillRule::NonZero => winding != 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_predicates() {
        let nonzero = Options::with_fill_rule(FillRule::NonZero);
        let evenodd = Options::with_fill_rule(FillRule::EvenOdd);
        let intersect = Options {
            mode: Mode::Intersect,
            ..Options::default()
        };
        for w in -3..=3 {
            assert_eq!(nonzero.inside(w), w != 0);
            assert_eq!(evenodd.inside(w), w == -3 || w == -1 || w == 1 || w == 3);
            assert_eq!(intersect.inside(w), w.abs() >= 2);
        }
    }

    #[test]
    fn tolerance_grows_with_magnitude() {
        let small = Tolerances::for_bounds(Rect::new(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(small.position, 1e-6);
        let big = Tolerances::for_bounds(Rect::new(-1e12, 0.0, 0.0, 1.0));
        assert_eq!(big.position, 1e12 * f64::EPSILON * 64.0);
    }
}
