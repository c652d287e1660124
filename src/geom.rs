//! Geometric primitives: lines, cubics, and the axes we measure them along.

use arrayvec::ArrayVec;
use kurbo::{
    CubicBez, Line, ParamCurve, ParamCurveArea, ParamCurveDeriv, ParamCurveNearest, PathSeg,
    Point, Rect, Vec2,
};

use crate::curve;

/// One of the two coordinate axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    /// The horizontal axis.
    X,
    /// The vertical axis.
    Y,
}

impl Axis {
    /// The coordinate of `p` along this axis.
    #[inline]
    pub fn coord(self, p: Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    /// The coordinate of a vector along this axis.
    #[inline]
    pub fn component(self, v: Vec2) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    /// The perpendicular axis.
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// A contour segment: either a straight line or a cubic Bézier.
///
/// Segments are immutable values. Operations that "change" a segment, like
/// splitting or reversing it, return new segments.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Segment {
    /// A straight line.
    Line(Line),
    /// A cubic Bézier, given by its two endpoints and two control points.
    Cubic(CubicBez),
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Line(l) => write!(f, "({}, {}) -- ({}, {})", l.p0.x, l.p0.y, l.p1.x, l.p1.y),
            Segment::Cubic(c) => write!(
                f,
                "({}, {}) -> ({}, {}) -> ({}, {}) -> ({}, {})",
                c.p0.x, c.p0.y, c.p1.x, c.p1.y, c.p2.x, c.p2.y, c.p3.x, c.p3.y
            ),
        }
    }
}

impl Segment {
    /// A straight line from `p0` to `p1`.
    pub fn line(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        Segment::Line(Line::new(p0, p1))
    }

    /// A cubic Bézier with endpoints `p0` and `p3` and control points `p1` and `p2`.
    pub fn cubic(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> Self {
        Segment::Cubic(CubicBez::new(p0.into(), p1.into(), p2.into(), p3.into()))
    }

    /// Converts a kurbo path segment, raising quadratics to cubics.
    pub fn from_path_seg(seg: PathSeg) -> Self {
        match seg {
            PathSeg::Line(l) => Segment::Line(l),
            PathSeg::Quad(q) => Segment::Cubic(q.raise()),
            PathSeg::Cubic(c) => Segment::Cubic(c),
        }
    }

    /// Converts to a kurbo path segment.
    pub fn to_path_seg(&self) -> PathSeg {
        match self {
            Segment::Line(l) => PathSeg::Line(*l),
            Segment::Cubic(c) => PathSeg::Cubic(*c),
        }
    }

    /// Represents this segment as a cubic, even if it is a line.
    pub fn to_cubic(&self) -> CubicBez {
        match self {
            Segment::Line(l) => CubicBez::new(
                l.p0,
                l.p0.lerp(l.p1, 1.0 / 3.0),
                l.p0.lerp(l.p1, 2.0 / 3.0),
                l.p1,
            ),
            Segment::Cubic(c) => *c,
        }
    }

    /// Is this a straight line?
    pub fn is_line(&self) -> bool {
        matches!(self, Segment::Line(_))
    }

    /// The starting point.
    pub fn start(&self) -> Point {
        match self {
            Segment::Line(l) => l.p0,
            Segment::Cubic(c) => c.p0,
        }
    }

    /// The ending point.
    pub fn end(&self) -> Point {
        match self {
            Segment::Line(l) => l.p1,
            Segment::Cubic(c) => c.p3,
        }
    }

    /// Evaluates the segment at the parameter `t`.
    pub fn eval(&self, t: f64) -> Point {
        match self {
            Segment::Line(l) => l.eval(t),
            Segment::Cubic(c) => c.eval(t),
        }
    }

    /// The derivative (with respect to the parameter) at `t`.
    ///
    /// This can vanish, for example at the ends of a cubic whose control
    /// points coincide with its endpoints. See [`Segment::start_tangent`] for
    /// a direction that doesn't.
    pub fn deriv(&self, t: f64) -> Vec2 {
        match self {
            Segment::Line(l) => l.p1 - l.p0,
            Segment::Cubic(c) => c.deriv().eval(t).to_vec2(),
        }
    }

    /// The direction in which the segment leaves its starting point.
    ///
    /// Unlike `deriv(0.0)`, this is only zero if the whole segment is a point.
    pub fn start_tangent(&self) -> Vec2 {
        match self {
            Segment::Line(l) => l.p1 - l.p0,
            Segment::Cubic(c) => first_nonzero([c.p1 - c.p0, c.p2 - c.p0, c.p3 - c.p0]),
        }
    }

    /// The direction in which the segment arrives at its ending point.
    pub fn end_tangent(&self) -> Vec2 {
        match self {
            Segment::Line(l) => l.p1 - l.p0,
            Segment::Cubic(c) => first_nonzero([c.p3 - c.p2, c.p3 - c.p1, c.p3 - c.p0]),
        }
    }

    /// The unit tangent at `t`, falling back to the end tangents when the
    /// derivative vanishes at an endpoint.
    pub fn unit_tangent(&self, t: f64) -> Vec2 {
        let d = self.deriv(t);
        let d = if d.hypot2() > 0.0 {
            d
        } else if t < 0.5 {
            self.start_tangent()
        } else {
            self.end_tangent()
        };
        let len = d.hypot();
        if len > 0.0 {
            d / len
        } else {
            Vec2::ZERO
        }
    }

    /// A bounding box.
    ///
    /// For lines this is tight. For cubics it's the bounding box of the
    /// control points, which contains the curve but might be larger.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Segment::Line(l) => Rect::from_points(l.p0, l.p1),
            Segment::Cubic(c) => Rect::from_points(c.p0, c.p1)
                .union_pt(c.p2)
                .union_pt(c.p3),
        }
    }

    /// The parameters in the open interval `(0, 1)` at which this segment
    /// turns around in the `axis` direction.
    ///
    /// A segment is monotonic in `axis` exactly when this is empty.
    pub fn extrema(&self, axis: Axis, disc_tol: f64) -> ArrayVec<f64, 2> {
        match self {
            Segment::Line(_) => ArrayVec::new(),
            Segment::Cubic(c) => curve::axis_extrema(
                axis.coord(c.p0),
                axis.coord(c.p1),
                axis.coord(c.p2),
                axis.coord(c.p3),
                disc_tol,
            ),
        }
    }

    /// Is the segment monotonic (non-strictly) in `axis`?
    pub fn is_monotonic(&self, axis: Axis, disc_tol: f64) -> bool {
        self.extrema(axis, disc_tol).is_empty()
    }

    /// The part of this segment between the parameters `t0` and `t1`.
    pub fn subsegment(&self, t0: f64, t1: f64) -> Segment {
        match self {
            Segment::Line(l) => Segment::Line(l.subsegment(t0..t1)),
            Segment::Cubic(c) => Segment::Cubic(c.subsegment(t0..t1)),
        }
    }

    /// The same segment, traversed backwards.
    pub fn reversed(&self) -> Segment {
        match self {
            Segment::Line(l) => Segment::line(l.p1, l.p0),
            Segment::Cubic(c) => Segment::cubic(c.p3, c.p2, c.p1, c.p0),
        }
    }

    /// Scales every control point by `factor`, about the origin.
    pub(crate) fn scaled(&self, factor: f64) -> Segment {
        let f = |p: Point| Point::new(p.x * factor, p.y * factor);
        match self {
            Segment::Line(l) => Segment::line(f(l.p0), f(l.p1)),
            Segment::Cubic(c) => Segment::cubic(f(c.p0), f(c.p1), f(c.p2), f(c.p3)),
        }
    }

    /// Moves the endpoints to `p0` and `p3`, dragging the adjacent control
    /// points along so that the end tangents are unchanged.
    pub fn with_endpoints(&self, p0: Point, p3: Point) -> Segment {
        match self {
            Segment::Line(_) => Segment::line(p0, p3),
            Segment::Cubic(c) => Segment::cubic(p0, c.p1 + (p0 - c.p0), c.p2 + (p3 - c.p3), p3),
        }
    }

    /// Finds the parameter of the point on this segment closest to `p`,
    /// returning it along with the distance.
    pub fn nearest(&self, p: Point, accuracy: f64) -> (f64, f64) {
        let nearest = self.to_path_seg().nearest(p, accuracy);
        (nearest.t, nearest.distance_sq.sqrt())
    }

    /// The total length of the control polygon, an upper bound on the arc length.
    pub fn control_polygon_length(&self) -> f64 {
        match self {
            Segment::Line(l) => (l.p1 - l.p0).hypot(),
            Segment::Cubic(c) => {
                (c.p1 - c.p0).hypot() + (c.p2 - c.p1).hypot() + (c.p3 - c.p2).hypot()
            }
        }
    }

    /// How far the segment strays from its chord.
    pub fn flatness(&self) -> f64 {
        match self {
            Segment::Line(_) => 0.0,
            Segment::Cubic(c) => curve::flatness(c),
        }
    }

    /// The signed area between the segment and the origin.
    ///
    /// Summing this over a closed contour gives the area enclosed by the
    /// contour, positive if it winds counter-clockwise (with `y` pointing up).
    pub fn signed_area(&self) -> f64 {
        match self {
            Segment::Line(l) => l.signed_area(),
            Segment::Cubic(c) => c.signed_area(),
        }
    }

    /// The endpoints and (for cubics) the control points, in order.
    pub fn control_points(&self) -> ArrayVec<Point, 4> {
        match self {
            Segment::Line(l) => [l.p0, l.p1].into_iter().collect(),
            Segment::Cubic(c) => ArrayVec::from([c.p0, c.p1, c.p2, c.p3]),
        }
    }
}

fn first_nonzero(candidates: [Vec2; 3]) -> Vec2 {
    candidates
        .into_iter()
        .find(|v| v.hypot2() > 0.0)
        .unwrap_or(Vec2::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangents_skip_collapsed_handles() {
        let c = Segment::cubic((0.0, 0.0), (0.0, 0.0), (1.0, 1.0), (2.0, 0.0));
        assert_eq!(c.deriv(0.0), Vec2::ZERO);
        assert_eq!(c.start_tangent(), Vec2::new(1.0, 1.0));
        assert_eq!(c.end_tangent(), Vec2::new(1.0, -1.0));
        let u = c.unit_tangent(0.0);
        assert!((u.hypot() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cubic_bbox_contains_control_points() {
        let c = Segment::cubic((0.0, 0.0), (-1.0, 2.0), (3.0, 2.0), (2.0, 0.0));
        assert_eq!(c.bounding_box(), Rect::new(-1.0, 0.0, 3.0, 2.0));
        let l = Segment::line((2.0, 1.0), (0.0, -1.0));
        assert_eq!(l.bounding_box(), Rect::new(0.0, -1.0, 2.0, 1.0));
    }

    #[test]
    fn monotonicity() {
        let arch = Segment::cubic((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        assert!(!arch.is_monotonic(Axis::Y, 1e-12));
        assert!(arch.is_monotonic(Axis::X, 1e-12));
        assert!(Segment::line((0.0, 0.0), (1.0, 5.0)).is_monotonic(Axis::Y, 1e-12));
    }

    #[test]
    fn reverse_and_split() {
        let c = Segment::cubic((0.0, 0.0), (1.0, 2.0), (2.0, 2.0), (3.0, 0.0));
        let r = c.reversed();
        assert_eq!(r.start(), c.end());
        assert_eq!(r.end(), c.start());
        assert!((r.eval(0.3) - c.eval(0.7)).hypot() < 1e-12);

        let left = c.subsegment(0.0, 0.25);
        let right = c.subsegment(0.25, 1.0);
        assert!((left.end() - right.start()).hypot() < 1e-12);
        assert!((left.eval(0.5) - c.eval(0.125)).hypot() < 1e-12);
    }

    #[test]
    fn moved_endpoints_keep_tangents() {
        let c = Segment::cubic((0.0, 0.0), (1.0, 2.0), (2.0, 2.0), (3.0, 0.0));
        let moved = c.with_endpoints(Point::new(0.0, 1e-7), Point::new(3.0, 0.0));
        assert_eq!(moved.start(), Point::new(0.0, 1e-7));
        assert!((moved.start_tangent() - c.start_tangent()).hypot() < 1e-12);
        assert_eq!(moved.end_tangent(), c.end_tangent());
    }

    #[test]
    fn area_of_a_square() {
        let square = [
            Segment::line((0.0, 0.0), (2.0, 0.0)),
            Segment::line((2.0, 0.0), (2.0, 2.0)),
            Segment::line((2.0, 2.0), (0.0, 2.0)),
            Segment::line((0.0, 2.0), (0.0, 0.0)),
        ];
        let area: f64 = square.iter().map(Segment::signed_area).sum();
        assert!((area - 4.0).abs() < 1e-12);
        let area: f64 = square.iter().map(|s| s.reversed().signed_area()).sum();
        assert!((area + 4.0).abs() < 1e-12);
    }

    #[test]
    fn nearest_on_a_line() {
        let l = Segment::line((0.0, 0.0), (4.0, 0.0));
        let (t, d) = l.nearest(Point::new(1.0, 3.0), 1e-9);
        assert!((t - 0.25).abs() < 1e-12);
        assert!((d - 3.0).abs() < 1e-12);
    }
}
