//! Splitting contours into pieces that are monotonic in the sweep direction.
//!
//! Each contour becomes a ring of [`MonotonicPiece`]s, stored in one flat
//! arena with `next` and `prev` links. The pieces of a contour cover it
//! exactly once, in the contour's original direction.

use kurbo::Point;

use crate::{
    contour::ContourSet,
    geom::{Axis, Segment},
    options::Tolerances,
    Warning,
};

/// The axis along which every piece is monotonic.
pub const SWEEP_AXIS: Axis = Axis::Y;

typed_vec!(
    /// An index into a [`Pieces`] arena.
    PieceIdx,
    PieceVec,
    "p"
);

typed_vec!(
    /// The index of a contour in the input [`ContourSet`].
    ContourIdx,
    ContourVec,
    "c"
);

/// A maximal sub-range of an input segment that is monotonic in [`SWEEP_AXIS`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct MonotonicPiece {
    /// The geometry of this piece, in the contour's direction.
    pub segment: Segment,
    /// The contour this piece came from.
    pub contour: ContourIdx,
    /// The index of the originating segment within its contour.
    pub seg: usize,
    /// The parameter on the originating segment where this piece starts.
    pub t0: f64,
    /// The parameter on the originating segment where this piece ends.
    ///
    /// Always strictly larger than `t0`.
    pub t1: f64,
}

impl MonotonicPiece {
    /// Maps a parameter on this piece to a parameter on the originating segment.
    pub fn segment_param(&self, t: f64) -> f64 {
        self.t0 + t * (self.t1 - self.t0)
    }
}

/// A contour that survived decomposition.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PieceContour {
    /// Where it came from.
    pub contour: ContourIdx,
    /// One of its pieces; follow [`Pieces::next`] from here to visit the others.
    pub first: PieceIdx,
}

/// An arena of monotonic pieces, linked into one ring per contour.
#[derive(Clone, Debug, Default)]
pub struct Pieces {
    pieces: PieceVec<MonotonicPiece>,
    next: PieceVec<PieceIdx>,
    prev: PieceVec<PieceIdx>,
    contours: Vec<PieceContour>,
}

impl std::ops::Index<PieceIdx> for Pieces {
    type Output = MonotonicPiece;

    fn index(&self, idx: PieceIdx) -> &MonotonicPiece {
        &self.pieces[idx]
    }
}

impl Pieces {
    /// The total number of pieces.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// All the valid piece indices.
    pub fn indices(&self) -> impl Iterator<Item = PieceIdx> {
        self.pieces.indices()
    }

    /// All the pieces, with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (PieceIdx, &MonotonicPiece)> + '_ {
        self.pieces.iter()
    }

    /// The piece after `idx` in its contour.
    pub fn next(&self, idx: PieceIdx) -> PieceIdx {
        self.next[idx]
    }

    /// The piece before `idx` in its contour.
    pub fn prev(&self, idx: PieceIdx) -> PieceIdx {
        self.prev[idx]
    }

    /// The contours, in input order.
    pub fn contours(&self) -> &[PieceContour] {
        &self.contours
    }

    /// Iterates over the ring of pieces starting at `first`.
    pub fn ring(&self, first: PieceIdx) -> impl Iterator<Item = PieceIdx> + '_ {
        let mut cur = Some(first);
        std::iter::from_fn(move || {
            let ret = cur?;
            let next = self.next(ret);
            cur = (next != first).then_some(next);
            Some(ret)
        })
    }

    /// Decomposes the contours in `set` for which `include` returns true.
    ///
    /// Segments shorter than the position tolerance are dropped (and their
    /// neighbors joined up), and so are contours that are left with no
    /// area. Both of these are reported as warnings.
    pub fn decompose(
        set: &ContourSet,
        include: impl Fn(usize) -> bool,
        tol: &Tolerances,
        warnings: &mut Vec<Warning>,
    ) -> Pieces {
        let mut ret = Pieces::default();
        for (c_idx, contour) in set.iter().enumerate() {
            if !include(c_idx) {
                continue;
            }

            let mut kept: Vec<(usize, Segment)> = contour
                .segments()
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, s)| s.control_polygon_length() > tol.position)
                .collect();
            let dropped = contour.len() - kept.len();
            if dropped > 0 {
                log::debug!("dropping {dropped} zero-length segments from contour {c_idx}");
                warnings.push(Warning::ZeroLengthSegments {
                    contour: c_idx,
                    count: dropped,
                });

                // Close up the gaps left by the dropped segments.
                for i in 0..kept.len() {
                    let prev_end = kept[(i + kept.len() - 1) % kept.len()].1.end();
                    let seg = &mut kept[i].1;
                    if seg.start() != prev_end {
                        *seg = seg.with_endpoints(prev_end, seg.end());
                    }
                }
            }

            let points: Vec<Point> = kept.iter().flat_map(|(_, s)| s.control_points()).collect();
            if is_flat(&points, tol.position) {
                log::debug!("dropping degenerate contour {c_idx}");
                warnings.push(Warning::DegenerateContour { contour: c_idx });
                continue;
            }

            let first = PieceIdx(ret.pieces.len());
            for (seg_idx, seg) in kept {
                ret.push_monotonic_pieces(ContourIdx(c_idx), seg_idx, seg, tol);
            }
            ret.close_ring(first);
            ret.contours.push(PieceContour {
                contour: ContourIdx(c_idx),
                first,
            });
        }
        log::debug!(
            "decomposed {} contours into {} monotonic pieces",
            ret.contours.len(),
            ret.pieces.len()
        );
        ret
    }

    fn push_monotonic_pieces(
        &mut self,
        contour: ContourIdx,
        seg_idx: usize,
        seg: Segment,
        tol: &Tolerances,
    ) {
        let extrema = seg.extrema(SWEEP_AXIS, tol.discriminant);
        let mut params = Vec::with_capacity(extrema.len() + 2);
        params.push(0.0);
        // An extremum that is (numerically) at an endpoint would only make a
        // sliver of a piece.
        params.extend(extrema.into_iter().filter(|&t| {
            let p = seg.eval(t);
            (p - seg.start()).hypot() > tol.position && (p - seg.end()).hypot() > tol.position
        }));
        params.push(1.0);

        // Evaluate every split point once, so that adjacent pieces share
        // their endpoints exactly.
        let points: Vec<Point> = params
            .iter()
            .map(|&t| {
                if t == 0.0 {
                    seg.start()
                } else if t == 1.0 {
                    seg.end()
                } else {
                    seg.eval(t)
                }
            })
            .collect();

        for i in 0..params.len() - 1 {
            let (t0, t1) = (params[i], params[i + 1]);
            let piece = if t0 == 0.0 && t1 == 1.0 {
                seg
            } else {
                seg.subsegment(t0, t1)
                    .with_endpoints(points[i], points[i + 1])
            };
            let idx = self.pieces.push(MonotonicPiece {
                segment: piece,
                contour,
                seg: seg_idx,
                t0,
                t1,
            });
            self.next.push(PieceIdx(idx.0 + 1));
            self.prev.push(PieceIdx(idx.0.wrapping_sub(1)));
        }
    }

    fn close_ring(&mut self, first: PieceIdx) {
        let last = PieceIdx(self.pieces.len() - 1);
        self.next[last] = first;
        self.prev[first] = last;
    }
}

/// Do all these points lie within `eps` of a single line?
///
/// Since every segment lies within the convex hull of its control points,
/// a contour whose control points are flat has no area.
fn is_flat(points: &[Point], eps: f64) -> bool {
    let Some(&p0) = points.first() else {
        return true;
    };
    let Some(&p1) = points
        .iter()
        .max_by(|a, b| (**a - p0).hypot2().total_cmp(&(**b - p0).hypot2()))
    else {
        return true;
    };
    let d = p1 - p0;
    let len = d.hypot();
    if len <= eps {
        return true;
    }
    points.iter().all(|&p| (d.cross(p - p0) / len).abs() <= eps)
}
