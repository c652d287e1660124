//! Removing zero-area retraces ("backtracks" or "spurs") from closed contours.

use crate::geom::Segment;

/// Removes zero-length segments and adjacent pairs of segments that retrace
/// one another, repeating until there's nothing left to remove.
///
/// `segments` must form a closed cycle; the result does too (although it
/// might be empty, and it might start at a different segment).
pub fn remove_spurs(mut segments: Vec<Segment>, eps: f64) -> Vec<Segment> {
    while simplify_once(&mut segments, eps) {}
    segments
}

// Makes a single simplification, returning false if there was nothing to do.
fn simplify_once(segs: &mut Vec<Segment>, eps: f64) -> bool {
    if let Some(i) = segs.iter().position(|s| s.control_polygon_length() <= eps) {
        segs.rotate_left(i);
        segs.remove(0);
        reconnect(segs);
        return true;
    }

    let n = segs.len();
    if n < 2 {
        return false;
    }
    for i in 0..n {
        let j = (i + 1) % n;
        let (a, b) = (segs[i], segs[j]);
        if retraces(&a, &b, eps) {
            segs.rotate_left(i);
            segs.drain(0..2);
            reconnect(segs);
            return true;
        }
        if let Some(shortened) = collinear_backtrack(&a, &b, eps) {
            segs[i] = shortened;
            segs.remove(j);
            return true;
        }
    }
    false
}

// After removing segments from the front, the first remaining segment might
// not quite start where the last one ends.
fn reconnect(segs: &mut [Segment]) {
    if let Some(last) = segs.last() {
        let p = last.end();
        if segs[0].start() != p {
            segs[0] = segs[0].with_endpoints(p, segs[0].end());
        }
    }
}

/// Does `b` (which starts where `a` ends) go back along `a`?
fn retraces(a: &Segment, b: &Segment, eps: f64) -> bool {
    if (a.start() - b.end()).hypot() > eps {
        return false;
    }
    if a.is_line() && b.is_line() {
        return true;
    }
    let tol = 4.0 * eps;
    let close = |x: &Segment, y: &Segment| {
        [0.25, 0.5, 0.75]
            .into_iter()
            .all(|t| y.nearest(x.eval(t), eps * 1e-3).1 <= tol)
    };
    close(a, b) && close(b, a)
}

/// If `a` and `b` are lines that turn back on one another (`p -> q -> r`
/// with `r` on the line through `p` and `q`, on the same side of `q` as `p`),
/// returns the line `p -> r`.
fn collinear_backtrack(a: &Segment, b: &Segment, eps: f64) -> Option<Segment> {
    let (Segment::Line(a), Segment::Line(b)) = (a, b) else {
        return None;
    };
    let (p, q, r) = (a.p0, a.p1, b.p1);
    let pq = q - p;
    let qr = r - q;
    let len = pq.hypot();
    if len == 0.0 || qr.hypot() == 0.0 {
        return None;
    }
    let collinear = (pq.cross(r - p) / len).abs() <= eps;
    let turns_back = pq.dot(qr) < 0.0;
    (collinear && turns_back).then(|| Segment::line(p, r))
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;

    fn polygon(points: &[(f64, f64)]) -> Vec<Segment> {
        let n = points.len();
        (0..n)
            .map(|i| Segment::line(points[i], points[(i + 1) % n]))
            .collect()
    }

    fn area(segs: &[Segment]) -> f64 {
        segs.iter().map(Segment::signed_area).sum()
    }

    fn closed(segs: &[Segment]) -> bool {
        let n = segs.len();
        (0..n).all(|i| segs[i].end() == segs[(i + 1) % n].start())
    }

    #[test]
    fn spur_is_removed() {
        let segs = polygon(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 0.5),
            (1.5, 0.5),
            (1.0, 0.5),
            (1.0, 1.0),
            (0.0, 1.0),
        ]);
        let out = remove_spurs(segs, 1e-6);
        assert_eq!(out.len(), 5);
        assert!(closed(&out));
        assert!((area(&out) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nested_spurs_are_removed() {
        // A spur with a spur on it.
        let segs = polygon(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (2.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
        ]);
        let out = remove_spurs(segs, 1e-6);
        assert!(closed(&out));
        assert_eq!(out.len(), 4);
        assert!((area(&out) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn partial_backtrack_is_shortened() {
        // Goes out to (2, 0) and comes halfway back before turning up.
        let segs = polygon(&[(0.0, 0.0), (2.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let out = remove_spurs(segs, 1e-6);
        assert!(closed(&out));
        assert_eq!(out.len(), 4);
        assert!(out.contains(&Segment::line((0.0, 0.0), (1.0, 0.0))));
    }

    #[test]
    fn curved_retrace() {
        let c = Segment::cubic((1.0, 0.0), (1.5, 0.5), (1.5, 1.0), (1.0, 1.0));
        let mut segs = vec![
            Segment::line((0.0, 0.0), (1.0, 0.0)),
            c,
            c.reversed(),
            Segment::line((1.0, 0.0), (0.0, 1.0)),
            Segment::line((0.0, 1.0), (0.0, 0.0)),
        ];
        segs = remove_spurs(segs, 1e-6);
        assert_eq!(segs.len(), 3);
        assert!(closed(&segs));
    }

    #[test]
    fn zero_length_segments_go_away() {
        let segs = vec![
            Segment::line((0.0, 0.0), (1.0, 0.0)),
            Segment::line((1.0, 0.0), (1.0, 1e-9)),
            Segment::line((1.0, 1e-9), (0.0, 1.0)),
            Segment::line((0.0, 1.0), (0.0, 0.0)),
        ];
        let out = remove_spurs(segs, 1e-6);
        assert_eq!(out.len(), 3);
        assert!(closed(&out));
        assert!(out.iter().any(|s| s.start() == Point::new(1.0, 0.0)));
    }

    #[test]
    fn pure_retrace_vanishes() {
        let segs = polygon(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(remove_spurs(segs, 1e-6).is_empty());
    }

    #[test]
    fn lens_is_not_a_retrace() {
        let segs = vec![
            Segment::line((0.0, 0.0), (1.0, 0.0)),
            Segment::cubic((1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)),
        ];
        assert_eq!(remove_spurs(segs.clone(), 1e-6), segs);
    }
}
