//! Closed contours and collections of them.
//!
//! This is the data model that goes in and out of the engine: a glyph
//! outline is a [`ContourSet`], and each [`Contour`] is a closed cycle of
//! [`Segment`]s.

use arrayvec::ArrayVec;
use kurbo::{BezPath, PathEl, Point, Rect};

use crate::{geom::Segment, options::Orientation, Error};

/// A contour wasn't closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NonClosedPath {
    /// The index of the offending contour (or subpath) within its set.
    ///
    /// This is zero when constructing a single [`Contour`].
    pub contour: usize,
    /// The index of the segment whose end doesn't match the start of the next one.
    pub segment: usize,
}

/// A closed path made of lines and cubics.
///
/// The end of every segment is exactly equal to the start of the next one,
/// and the end of the last segment is exactly equal to the start of the first.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Contour {
    segments: Vec<Segment>,
    /// Is this contour part of the user's selection?
    ///
    /// Only relevant with [`Scope::Selected`](crate::Scope::Selected).
    pub selected: bool,
}

impl Contour {
    /// Creates a contour, checking that it's closed.
    pub fn new(segments: Vec<Segment>) -> Result<Self, NonClosedPath> {
        let n = segments.len();
        for (i, seg) in segments.iter().enumerate() {
            if seg.end() != segments[(i + 1) % n].start() {
                return Err(NonClosedPath {
                    contour: 0,
                    segment: i,
                });
            }
        }
        Ok(Contour {
            segments,
            selected: false,
        })
    }

    /// Creates a contour from segments that we already know to be closed.
    ///
    /// NaN coordinates never compare equal, so they're exempt from the check;
    /// `check_finite` is the one that rejects them.
    pub(crate) fn closed(segments: Vec<Segment>) -> Self {
        debug_assert!(
            segments
                .iter()
                .flat_map(Segment::control_points)
                .any(|p| p.is_nan())
                || Contour::new(segments.clone()).is_ok()
        );
        Contour {
            segments,
            selected: false,
        }
    }

    /// Creates a closed polygon through the given points.
    ///
    /// The closing edge is added automatically. If the last point is equal to
    /// the first, it is skipped.
    pub fn from_polygon<P: Into<Point>>(points: impl IntoIterator<Item = P>) -> Self {
        let mut points: Vec<Point> = points.into_iter().map(Into::into).collect();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        let n = points.len();
        let segments = if n <= 1 {
            Vec::new()
        } else {
            (0..n)
                .map(|i| Segment::line(points[i], points[(i + 1) % n]))
                .collect()
        };
        Contour::closed(segments)
    }

    /// Marks (or unmarks) this contour as selected.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// The segments, in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Does this contour have no segments at all?
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The start points of all the segments, in order.
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments.iter().map(Segment::start)
    }

    /// The signed area enclosed by this contour.
    ///
    /// Positive for counter-clockwise contours (with `y` pointing up).
    pub fn signed_area(&self) -> f64 {
        self.segments.iter().map(Segment::signed_area).sum()
    }

    /// The direction of this contour, or `None` if it encloses no area.
    pub fn orientation(&self) -> Option<Orientation> {
        let area = self.signed_area();
        if area > 0.0 {
            Some(Orientation::CounterClockwise)
        } else if area < 0.0 {
            Some(Orientation::Clockwise)
        } else {
            None
        }
    }

    /// The same contour, traversed backwards.
    pub fn reversed(&self) -> Self {
        Contour {
            segments: self.segments.iter().rev().map(Segment::reversed).collect(),
            selected: self.selected,
        }
    }

    pub(crate) fn scaled(&self, factor: f64) -> Self {
        Contour {
            segments: self.segments.iter().map(|s| s.scaled(factor)).collect(),
            selected: self.selected,
        }
    }

    /// A bounding box, or `None` if the contour is empty.
    ///
    /// Like [`Segment::bounding_box`], this might not be tight for curves.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.segments
            .iter()
            .map(Segment::bounding_box)
            .reduce(|a, b| a.union(b))
    }

    /// Appends this contour to a `BezPath`, as a closed subpath.
    pub fn append_to(&self, path: &mut BezPath) {
        let Some(first) = self.segments.first() else {
            return;
        };
        path.move_to(first.start());
        let n = self.segments.len();
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                // The closing line is implied by `ClosePath`.
                Segment::Line(_) if i + 1 == n => {}
                Segment::Line(l) => path.line_to(l.p1),
                Segment::Cubic(c) => path.curve_to(c.p1, c.p2, c.p3),
            }
        }
        path.close_path();
    }

    /// Converts to a `BezPath` with a single closed subpath.
    pub fn to_bez_path(&self) -> BezPath {
        let mut ret = BezPath::new();
        self.append_to(&mut ret);
        ret
    }
}

/// An unordered collection of contours, typically a whole glyph.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContourSet {
    contours: Vec<Contour>,
}

impl ContourSet {
    /// Creates a contour set.
    pub fn new(contours: Vec<Contour>) -> Self {
        ContourSet { contours }
    }

    /// Creates a contour set made of polygons.
    pub fn from_polygons<P: Into<Point>, C: IntoIterator<Item = P>>(
        polygons: impl IntoIterator<Item = C>,
    ) -> Self {
        ContourSet {
            contours: polygons.into_iter().map(Contour::from_polygon).collect(),
        }
    }

    /// Converts a `BezPath` into a contour set, one contour per subpath.
    ///
    /// Quadratic segments are raised to cubics. Every subpath must be closed,
    /// either explicitly with a `ClosePath` element or by ending where it
    /// started. A `MoveTo` that isn't followed by any drawing is ignored.
    pub fn from_bez_path(path: &BezPath) -> Result<Self, Error> {
        check_finite_points(path.elements().iter().flat_map(element_points))?;

        let mut contours = Vec::new();
        let mut segments: Vec<Segment> = Vec::new();
        let mut start = Point::ORIGIN;
        let mut last = Point::ORIGIN;

        let mut finish = |segments: &mut Vec<Segment>, start: Point, last: Point| {
            if segments.is_empty() {
                return Ok(());
            }
            if last != start {
                return Err(NonClosedPath {
                    contour: contours.len(),
                    segment: segments.len() - 1,
                });
            }
            contours.push(Contour::closed(std::mem::take(segments)));
            Ok(())
        };

        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    finish(&mut segments, start, last)?;
                    start = p;
                    last = p;
                }
                PathEl::LineTo(p) => {
                    segments.push(Segment::line(last, p));
                    last = p;
                }
                PathEl::QuadTo(p1, p2) => {
                    segments.push(Segment::from_path_seg(kurbo::PathSeg::Quad(
                        kurbo::QuadBez::new(last, p1, p2),
                    )));
                    last = p2;
                }
                PathEl::CurveTo(p1, p2, p3) => {
                    segments.push(Segment::cubic(last, p1, p2, p3));
                    last = p3;
                }
                PathEl::ClosePath => {
                    if last != start {
                        segments.push(Segment::line(last, start));
                        last = start;
                    }
                    finish(&mut segments, start, last)?;
                }
            }
        }
        finish(&mut segments, start, last)?;

        Ok(ContourSet { contours })
    }

    /// Converts to a `BezPath`, one closed subpath per contour.
    pub fn to_bez_path(&self) -> BezPath {
        let mut ret = BezPath::new();
        for c in &self.contours {
            c.append_to(&mut ret);
        }
        ret
    }

    /// Checks that all coordinates are finite.
    pub fn check_finite(&self) -> Result<(), Error> {
        check_finite_points(
            self.contours
                .iter()
                .flat_map(|c| c.segments.iter())
                .flat_map(Segment::control_points),
        )
    }

    /// Checks that every contour is closed.
    ///
    /// Contours built through [`Contour::new`] always are, but deserialized
    /// ones might not be.
    pub fn check_closed(&self) -> Result<(), NonClosedPath> {
        for (idx, c) in self.contours.iter().enumerate() {
            let n = c.segments.len();
            for (i, seg) in c.segments.iter().enumerate() {
                if seg.end() != c.segments[(i + 1) % n].start() {
                    return Err(NonClosedPath {
                        contour: idx,
                        segment: i,
                    });
                }
            }
        }
        Ok(())
    }

    /// The contours.
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Iterates over the contours.
    pub fn iter(&self) -> std::slice::Iter<'_, Contour> {
        self.contours.iter()
    }

    /// Adds a contour.
    pub fn push(&mut self, contour: Contour) {
        self.contours.push(contour);
    }

    /// The number of contours.
    pub fn len(&self) -> usize {
        self.contours.len()
    }

    /// Are there no contours?
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// The total signed area.
    ///
    /// For a set without overlaps whose outer contours run counter-clockwise
    /// and whose holes run clockwise, this is the filled area.
    pub fn signed_area(&self) -> f64 {
        self.contours.iter().map(Contour::signed_area).sum()
    }

    /// A bounding box for all the contours, or `None` if they're all empty.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.contours
            .iter()
            .filter_map(Contour::bounding_box)
            .reduce(|a, b| a.union(b))
    }

    /// Reverses every contour.
    pub fn reversed(&self) -> Self {
        ContourSet {
            contours: self.contours.iter().map(Contour::reversed).collect(),
        }
    }

    pub(crate) fn scaled(&self, factor: f64) -> Self {
        ContourSet {
            contours: self.contours.iter().map(|c| c.scaled(factor)).collect(),
        }
    }
}

fn element_points(el: &PathEl) -> ArrayVec<Point, 3> {
    let mut ret = ArrayVec::new();
    match *el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => ret.push(p),
        PathEl::QuadTo(p1, p2) => ret.extend([p1, p2]),
        PathEl::CurveTo(p1, p2, p3) => ret.extend([p1, p2, p3]),
        PathEl::ClosePath => {}
    }
    ret
}

// NaNs take priority over infinities.
fn check_finite_points(points: impl Iterator<Item = Point>) -> Result<(), Error> {
    let mut infinite = false;
    for p in points {
        if p.is_nan() {
            return Err(Error::NaN);
        }
        infinite |= !p.is_finite();
    }
    if infinite {
        Err(Error::Infinity)
    } else {
        Ok(())
    }
}

impl FromIterator<Contour> for ContourSet {
    fn from_iter<I: IntoIterator<Item = Contour>>(iter: I) -> Self {
        ContourSet {
            contours: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ContourSet {
    type Item = &'a Contour;
    type IntoIter = std::slice::Iter<'a, Contour>;

    fn into_iter(self) -> Self::IntoIter {
        self.contours.iter()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn nan_polygons_are_caught_by_check_finite() {
        let set = ContourSet::from_polygons([vec![(0.0, 0.0), (f64::NAN, 1.0), (1.0, 0.0)]]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.check_finite(), Err(Error::NaN));

        let set = ContourSet::from_polygons([vec![(0.0, 0.0), (f64::INFINITY, 1.0), (1.0, 0.0)]]);
        assert_eq!(set.check_finite(), Err(Error::Infinity));
    }

    #[test]
    fn open_contours_are_rejected() {
        let segs = vec![
            Segment::line((0.0, 0.0), (1.0, 0.0)),
            Segment::line((1.0, 0.0), (1.0, 1.0)),
        ];
        assert_matches!(
            Contour::new(segs),
            Err(NonClosedPath {
                contour: 0,
                segment: 1
            })
        );

        let path = BezPath::from_svg("M0 0 L1 0 L1 1 Z M5 5 L6 5 L6 6").unwrap();
        assert_matches!(
            ContourSet::from_bez_path(&path),
            Err(Error::NonClosedPath(NonClosedPath { contour: 1, .. }))
        );
    }

    #[test]
    fn bez_path_conversion() {
        let path = BezPath::from_svg("M0 0 L2 0 Q2 2 0 2 Z M5 5 M3 3 L4 3 L3 4 L3 3").unwrap();
        let set = ContourSet::from_bez_path(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.contours()[0].len(), 3);
        assert!(!set.contours()[0].segments()[1].is_line());
        // The second one was closed by coming back to the start.
        assert_eq!(set.contours()[1].len(), 3);

        let round_trip = ContourSet::from_bez_path(&set.to_bez_path()).unwrap();
        assert_eq!(round_trip, set);
    }

    #[test]
    fn non_finite_inputs() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((f64::INFINITY, 0.0));
        path.line_to((0.0, 1.0));
        path.close_path();
        assert_matches!(ContourSet::from_bez_path(&path), Err(Error::Infinity));

        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((f64::NAN, 0.0));
        path.line_to((0.0, 1.0));
        path.close_path();
        assert_matches!(ContourSet::from_bez_path(&path), Err(Error::NaN));
    }

    #[test]
    fn orientation_from_area() {
        let ccw = Contour::from_polygon([(0.0, 0.0), (2.0, 0.0), (2.0, 3.0), (0.0, 3.0)]);
        assert_eq!(ccw.signed_area(), 6.0);
        assert_eq!(ccw.orientation(), Some(Orientation::CounterClockwise));
        assert_eq!(ccw.reversed().orientation(), Some(Orientation::Clockwise));

        let flat = Contour::from_polygon([(0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(flat.orientation(), None);
    }

    #[test]
    fn polygon_with_repeated_endpoint() {
        let a = Contour::from_polygon([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        let b = Contour::from_polygon([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }
}
