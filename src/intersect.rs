//! Finding the points where monotonic pieces meet.
//!
//! Candidate pairs are found by sweeping the pieces' bounding boxes in the
//! [`SWEEP_AXIS`] direction. Each surviving pair is then intersected exactly:
//! lines against lines in closed form, and anything involving a cubic by
//! subdividing both curves until they're flat and intersecting the chords.
//!
//! Besides transversal crossings, we also report "contacts": places where
//! an endpoint of one piece lies on the interior of another. These are what
//! make T-junctions and coincident stretches of outline end up split at the
//! same vertices.

use kurbo::{Point, Rect};

use crate::{
    curve::{line_intersection, refine_intersection},
    geom::{Axis, Segment},
    monotonic::{PieceIdx, Pieces, SWEEP_AXIS},
    num::CheapOrderedFloat,
    options::Tolerances,
};

// Below this parameter width, subdividing stops making progress in f64.
const MAX_DEPTH: u32 = 52;

/// How two pieces meet at an intersection point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum IntersectionKind {
    /// The pieces cross each other at a non-zero angle.
    Crossing,
    /// The pieces touch with parallel tangents.
    ///
    /// They might cross or they might not; either way, the winding numbers
    /// will sort it out.
    Tangent,
}

/// A point where two pieces meet.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct IntersectionPoint {
    /// Where it is.
    pub point: Point,
    /// The first piece.
    pub a: PieceIdx,
    /// The parameter on the first piece.
    pub ta: f64,
    /// The second piece.
    pub b: PieceIdx,
    /// The parameter on the second piece.
    pub tb: f64,
    /// Whether the pieces cross or touch.
    pub kind: IntersectionKind,
    /// How many intersections were merged into this one, with tangential
    /// intersections counting twice.
    pub multiplicity: u32,
}

/// All the intersections between a collection of pieces.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Intersections {
    /// The intersection points, grouped by pair.
    pub points: Vec<IntersectionPoint>,
    /// Pairs of pieces that seem to run along each other for a stretch. Only
    /// their endpoint contacts are included in `points`.
    pub coincident: Vec<(PieceIdx, PieceIdx)>,
}

/// Finds all pairs of pieces whose bounding boxes (inflated by `eps`) overlap.
///
/// Each pair is reported once, with the smaller index first.
pub fn candidate_pairs(pieces: &Pieces, eps: f64) -> Vec<(PieceIdx, PieceIdx)> {
    let boxes: Vec<(PieceIdx, Rect)> = pieces
        .iter()
        .map(|(idx, p)| (idx, p.segment.bounding_box().inflate(eps, eps)))
        .collect();
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by_key(|&i| CheapOrderedFloat::from(range(&boxes[i].1, SWEEP_AXIS).0));

    let mut ret = Vec::new();
    let mut active: Vec<usize> = Vec::new();
    for i in order {
        let (idx, rect) = boxes[i];
        let (sweep_pos, _) = range(&rect, SWEEP_AXIS);
        active.retain(|&j| range(&boxes[j].1, SWEEP_AXIS).1 >= sweep_pos);
        let (lo, hi) = range(&rect, SWEEP_AXIS.other());
        for &j in &active {
            let (other_idx, other_rect) = boxes[j];
            let (other_lo, other_hi) = range(&other_rect, SWEEP_AXIS.other());
            if lo <= other_hi && other_lo <= hi {
                ret.push((idx.min(other_idx), idx.max(other_idx)));
            }
        }
        active.push(i);
    }
    ret.sort();
    ret
}

fn range(r: &Rect, axis: Axis) -> (f64, f64) {
    match axis {
        Axis::X => (r.x0, r.x1),
        Axis::Y => (r.y0, r.y1),
    }
}

// Unlike `Rect::intersect`, this counts rectangles that only touch (including
// rectangles with zero width or height).
fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Finds all the intersections between pieces.
///
/// A pair of curves that needs more than `max_subdivisions` subdivision
/// steps is assumed to be coincident (or nearly so) along a stretch; see
/// [`Intersections::coincident`].
pub fn find_intersections(
    pieces: &Pieces,
    tol: &Tolerances,
    max_subdivisions: usize,
) -> Intersections {
    let mut ret = Intersections::default();
    let pairs = candidate_pairs(pieces, tol.position);
    log::debug!(
        "{} candidate pairs among {} pieces",
        pairs.len(),
        pieces.len()
    );

    for (a, b) in pairs {
        let seg_a = &pieces[a].segment;
        let seg_b = &pieces[b].segment;
        let hits = intersect_pair(seg_a, seg_b, tol, max_subdivisions);
        if hits.coincident {
            log::debug!("{a:?} and {b:?} look coincident");
            ret.coincident.push((a, b));
        }
        for hit in hits.hits {
            log::trace!(
                "{a:?} and {b:?} meet at {:?} (t = {}, {}), {:?}",
                hit.point,
                hit.ta,
                hit.tb,
                hit.kind
            );
            ret.points.push(IntersectionPoint {
                point: hit.point,
                a,
                ta: hit.ta,
                b,
                tb: hit.tb,
                kind: hit.kind,
                multiplicity: hit.multiplicity,
            });
        }
    }
    log::debug!("found {} intersection points", ret.points.len());
    ret
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Hit {
    point: Point,
    ta: f64,
    tb: f64,
    kind: IntersectionKind,
    multiplicity: u32,
}

#[derive(Clone, Debug, Default)]
struct PairHits {
    hits: Vec<Hit>,
    coincident: bool,
}

fn kind_at(a: &Segment, ta: f64, b: &Segment, tb: f64, angle_tol: f64) -> IntersectionKind {
    let cross = a.unit_tangent(ta).cross(b.unit_tangent(tb));
    if cross.abs() <= angle_tol {
        IntersectionKind::Tangent
    } else {
        IntersectionKind::Crossing
    }
}

fn make_hit(point: Point, a: &Segment, ta: f64, b: &Segment, tb: f64, tol: &Tolerances) -> Hit {
    let kind = kind_at(a, ta, b, tb, tol.angle);
    Hit {
        point,
        ta,
        tb,
        kind,
        multiplicity: match kind {
            IntersectionKind::Crossing => 1,
            IntersectionKind::Tangent => 2,
        },
    }
}

fn near_endpoints(p: Point, seg: &Segment, eps: f64) -> bool {
    (p - seg.start()).hypot() <= eps || (p - seg.end()).hypot() <= eps
}

/// Intersects two pieces.
fn intersect_pair(a: &Segment, b: &Segment, tol: &Tolerances, max_subdivisions: usize) -> PairHits {
    let eps = tol.position;
    let mut ret = PairHits::default();

    // Endpoints of one piece lying on the interior of the other.
    for (t, p) in [(0.0, a.start()), (1.0, a.end())] {
        if near_endpoints(p, b, eps) {
            continue;
        }
        let (tb, dist) = b.nearest(p, eps * 1e-3);
        if dist <= eps {
            ret.hits.push(make_hit(p, a, t, b, tb, tol));
        }
    }
    for (t, p) in [(0.0, b.start()), (1.0, b.end())] {
        if near_endpoints(p, a, eps) {
            continue;
        }
        let (ta, dist) = a.nearest(p, eps * 1e-3);
        if dist <= eps {
            ret.hits.push(make_hit(p, a, ta, b, t, tol));
        }
    }

    // Interior crossings.
    let mut crossings = Vec::new();
    match (a, b) {
        (Segment::Line(la), Segment::Line(lb)) => {
            if let Some((ta, tb)) = line_intersection(la.p0, la.p1, lb.p0, lb.p1, tol.angle, 0.0)
            {
                crossings.push((ta, tb));
            }
        }
        _ => {
            if !subdivide(a, b, tol, max_subdivisions, &mut crossings) {
                ret.coincident = true;
                crossings.clear();
            }
        }
    }
    for (ta, tb) in crossings {
        let point = a.eval(ta);
        // Anything at an endpoint was already handled above (or is a shared
        // vertex, which will be merged when the vertices are built).
        if near_endpoints(point, a, eps) || near_endpoints(point, b, eps) {
            continue;
        }
        ret.hits.push(make_hit(point, a, ta, b, tb, tol));
    }

    ret.hits = merge_hits(ret.hits, eps);
    ret
}

/// Merges hits that are within `eps` of one another, adding up their multiplicities.
fn merge_hits(hits: Vec<Hit>, eps: f64) -> Vec<Hit> {
    let mut ret: Vec<Hit> = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(existing) = ret.iter_mut().find(|h| (h.point - hit.point).hypot() <= eps) {
            existing.multiplicity += hit.multiplicity;
            if hit.kind == IntersectionKind::Tangent {
                existing.kind = IntersectionKind::Tangent;
            }
        } else {
            ret.push(hit);
        }
    }
    ret
}

#[derive(Clone, Copy)]
struct Patch {
    seg: Segment,
    t0: f64,
    t1: f64,
}

impl Patch {
    fn split(&self) -> [Patch; 2] {
        let mid = 0.5 * (self.t0 + self.t1);
        [
            Patch {
                seg: self.seg.subsegment(0.0, 0.5),
                t0: self.t0,
                t1: mid,
            },
            Patch {
                seg: self.seg.subsegment(0.5, 1.0),
                t0: mid,
                t1: self.t1,
            },
        ]
    }

    fn param(&self, u: f64) -> f64 {
        self.t0 + u * (self.t1 - self.t0)
    }
}

/// Looks for crossings between `a` and `b` by subdivision, pushing the
/// parameters of any that are found.
///
/// Returns false if we ran out of budget.
fn subdivide(
    a: &Segment,
    b: &Segment,
    tol: &Tolerances,
    max_subdivisions: usize,
    out: &mut Vec<(f64, f64)>,
) -> bool {
    let eps = tol.position;
    let mut stack = vec![(
        Patch {
            seg: *a,
            t0: 0.0,
            t1: 1.0,
        },
        Patch {
            seg: *b,
            t0: 0.0,
            t1: 1.0,
        },
        0u32,
    )];
    let mut steps = 0;

    while let Some((pa, pb, depth)) = stack.pop() {
        steps += 1;
        if steps > max_subdivisions {
            return false;
        }

        let box_a = pa.seg.bounding_box().inflate(eps, eps);
        if !overlaps(&box_a, &pb.seg.bounding_box()) {
            continue;
        }

        let flat_a = pa.seg.flatness() <= eps;
        let flat_b = pb.seg.flatness() <= eps;
        if (flat_a && flat_b) || depth >= MAX_DEPTH {
            let (a0, a1) = (pa.seg.start(), pa.seg.end());
            let (b0, b1) = (pb.seg.start(), pb.seg.end());
            if let Some((u, v)) = line_intersection(a0, a1, b0, b1, tol.angle, eps) {
                let (ta, tb) = refine_intersection(a, b, pa.param(u), pb.param(v));
                if (a.eval(ta) - b.eval(tb)).hypot() <= eps {
                    out.push((ta, tb));
                }
            } else {
                // Parallel chords: this might be a tangency.
                let (v, dist) = pb.seg.nearest(pa.seg.eval(0.5), eps * 1e-3);
                if dist <= eps {
                    out.push((pa.param(0.5), pb.param(v)));
                }
            }
            continue;
        }

        match (flat_a, flat_b) {
            (true, _) => {
                for half in pb.split() {
                    stack.push((pa, half, depth + 1));
                }
            }
            (_, true) => {
                for half in pa.split() {
                    stack.push((half, pb, depth + 1));
                }
            }
            _ => {
                for ha in pa.split() {
                    for hb in pb.split() {
                        stack.push((ha, hb, depth + 1));
                    }
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::contour::{Contour, ContourSet};

    use super::*;

    fn pieces(set: &ContourSet) -> Pieces {
        Pieces::decompose(set, |_| true, &Tolerances::default(), &mut Vec::new())
    }

    #[test]
    fn crossing_squares() {
        let set = ContourSet::from_polygons([
            [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            [(0.5, 0.5), (1.5, 0.5), (1.5, 1.5), (0.5, 1.5)],
        ]);
        let pieces = pieces(&set);
        let ints = find_intersections(&pieces, &Tolerances::default(), 4096);
        let mut points: Vec<_> = ints.points.iter().map(|p| (p.point.x, p.point.y)).collect();
        points.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(points, vec![(0.5, 1.0), (1.0, 0.5)]);
        assert!(ints
            .points
            .iter()
            .all(|p| p.kind == IntersectionKind::Crossing && p.multiplicity == 1));
        assert!(ints.coincident.is_empty());
    }

    #[test]
    fn adjacent_pieces_only_share_a_vertex() {
        let set = ContourSet::from_polygons([[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]]);
        let pieces = pieces(&set);
        let ints = find_intersections(&pieces, &Tolerances::default(), 4096);
        assert!(ints.points.is_empty());
    }

    #[test]
    fn curve_crosses_line_twice() {
        let arch = Segment::cubic((0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0));
        let line = Segment::line((-1.0, 1.0), (3.0, 1.0));
        let hits = intersect_pair(&arch, &line, &Tolerances::default(), 4096);
        assert!(!hits.coincident);
        assert_eq!(hits.hits.len(), 2);
        for h in &hits.hits {
            assert!((h.point.y - 1.0).abs() < 1e-9);
            assert!((arch.eval(h.ta) - line.eval(h.tb)).hypot() < 1e-9);
            assert_eq!(h.kind, IntersectionKind::Crossing);
        }
    }

    #[test]
    fn tangent_contact() {
        // The top of the arch is at y = 1.5, where it touches the line.
        let arch = Segment::cubic((0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0));
        let line = Segment::line((-1.0, 1.5), (3.0, 1.5));
        let hits = intersect_pair(&arch, &line, &Tolerances::default(), 4096);
        assert!(!hits.hits.is_empty());
        for h in &hits.hits {
            assert!((h.point - Point::new(1.0, 1.5)).hypot() < 1e-3);
        }
        assert!(hits.hits.iter().any(|h| h.kind == IntersectionKind::Tangent));
    }

    #[test]
    fn t_junction_is_a_contact() {
        let a = Segment::line((0.0, 0.0), (2.0, 0.0));
        let b = Segment::line((1.0, 0.0), (1.0, 1.0));
        let hits = intersect_pair(&a, &b, &Tolerances::default(), 4096);
        assert_eq!(hits.hits.len(), 1);
        assert_eq!(hits.hits[0].point, Point::new(1.0, 0.0));
        assert!((hits.hits[0].ta - 0.5).abs() < 1e-12);
        assert_eq!(hits.hits[0].tb, 0.0);
    }

    #[test]
    fn collinear_overlap_reports_the_ends() {
        let a = Segment::line((0.0, 0.0), (2.0, 0.0));
        let b = Segment::line((3.0, 0.0), (1.0, 0.0));
        let hits = intersect_pair(&a, &b, &Tolerances::default(), 4096);
        let mut points: Vec<_> = hits.hits.iter().map(|h| h.point.x).collect();
        points.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(points, vec![1.0, 2.0]);
    }

    #[test]
    fn identical_curves_are_coincident() {
        let c = Segment::cubic((0.0, 0.0), (1.0, 3.0), (2.0, 3.0), (3.0, 5.0));
        let hits = intersect_pair(&c, &c, &Tolerances::default(), 256);
        assert!(hits.coincident);
        assert!(hits.hits.is_empty());
    }

    #[test]
    fn sweep_prunes_distant_pieces() {
        let set = ContourSet::new(vec![
            Contour::from_polygon([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]),
            Contour::from_polygon([(5.0, 0.0), (6.0, 0.0), (6.0, 1.0), (5.0, 1.0)]),
        ]);
        let pieces = pieces(&set);
        for (a, b) in candidate_pairs(&pieces, 1e-6) {
            assert_eq!(pieces[a].contour, pieces[b].contour);
        }
    }
}
