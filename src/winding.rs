//! Splitting pieces at intersections, and computing winding numbers.
//!
//! After splitting, the pieces become [`WindingEdge`]s: no two edges cross
//! except at shared endpoints, and every endpoint is a [`VertexIdx`] in a
//! shared vertex table. Edges running along one another (between the same
//! two vertices) are grouped into bundles, and each bundle gets winding
//! numbers for both of its sides by casting a ray from a point on it.

use std::collections::{BTreeMap, HashMap};

use kurbo::{Point, Vec2};

use crate::{
    curve::solve_t_for,
    geom::{Axis, Segment},
    intersect::Intersections,
    monotonic::{ContourIdx, PieceIdx, Pieces, SWEEP_AXIS},
    options::Tolerances,
    Warning,
};

/// The most times a winding ray gets moved, whatever
/// [`Options::max_ray_retries`](crate::Options::max_ray_retries) says.
pub const RAY_RETRY_LIMIT: usize = 64;

typed_vec!(
    /// An index into the vertex table of an [`EdgeGraph`].
    VertexIdx,
    VertexVec,
    "v"
);

typed_vec!(
    /// An index into the edges of an [`EdgeGraph`].
    EdgeIdx,
    EdgeVec,
    "e"
);

typed_vec!(
    /// An index into the bundles of an [`EdgeGraph`].
    BundleIdx,
    BundleVec,
    "b"
);

/// The winding numbers on the two sides of an edge.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Default, serde::Serialize)]
pub struct SideWindings {
    /// Imagine walking along the edge in its direction. This is the winding
    /// number of the area just counter-clockwise (to the left, with `y` up)
    /// of the edge.
    pub counter_clockwise: i32,
    /// The winding number of the area just clockwise (to the right) of the edge.
    pub clockwise: i32,
}

impl SideWindings {
    /// An edge is invisible if the winding numbers on its two sides agree.
    pub fn is_trivial(&self) -> bool {
        self.counter_clockwise == self.clockwise
    }

    /// The winding numbers of the same edge, walked in the opposite direction.
    pub fn flipped(self) -> Self {
        Self {
            counter_clockwise: self.clockwise,
            clockwise: self.counter_clockwise,
        }
    }
}

impl std::fmt::Debug for SideWindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} | {:?}", self.clockwise, self.counter_clockwise)
    }
}

/// A piece of an input contour between two consecutive split points.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct WindingEdge {
    /// The geometry, whose endpoints are exactly the positions of `start` and `end`.
    pub segment: Segment,
    /// Where it starts.
    pub start: VertexIdx,
    /// Where it ends. Never equal to `start`.
    pub end: VertexIdx,
    /// The monotonic piece this edge was cut from.
    pub piece: PieceIdx,
    /// The input contour this edge belongs to.
    pub contour: ContourIdx,
    /// The index of the input segment this edge was cut from.
    pub seg: usize,
    /// The parameter on the input segment where this edge starts.
    pub t0: f64,
    /// The parameter on the input segment where this edge ends.
    pub t1: f64,
    /// The bundle of coincident edges that this edge belongs to.
    pub bundle: BundleIdx,
    /// The winding numbers on either side.
    ///
    /// These account for all the other edges, including the ones in the
    /// same bundle.
    pub windings: SideWindings,
}

/// A group of edges that join the same two vertices along the same path.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Bundle {
    /// The members, in increasing order.
    pub edges: Vec<EdgeIdx>,
}

impl Bundle {
    /// The member whose geometry and direction stand for the whole bundle.
    pub fn reference(&self) -> EdgeIdx {
        self.edges[0]
    }
}

/// A contour of the edge graph: a ring of edges coming from one input contour.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct EdgeRing {
    /// The input contour.
    pub contour: ContourIdx,
    /// One of the edges. Follow [`EdgeGraph::next`] to find the others.
    pub first: EdgeIdx,
}

/// The result of casting a ray.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayCast {
    /// The sum of the signed crossings.
    pub winding: i32,
    /// Did the ray pass too close to a vertex, an extremum, or an edge running
    /// through its origin? If so, `winding` might be off.
    pub degenerate: bool,
}

/// Deduplicates points that are closer than the position tolerance.
#[derive(Clone, Debug, Default)]
struct VertexTable {
    points: VertexVec<Point>,
    grid: HashMap<(i64, i64), Vec<VertexIdx>>,
    exact: HashMap<(u64, u64), VertexIdx>,
    eps: f64,
}

impl VertexTable {
    fn new(eps: f64) -> Self {
        VertexTable {
            eps,
            ..Default::default()
        }
    }

    fn cell(&self, p: Point) -> (i64, i64) {
        // Float-to-int casts saturate, so huge coordinates are fine.
        ((p.x / self.eps).floor() as i64, (p.y / self.eps).floor() as i64)
    }

    /// Returns the vertex for `p`, which is the nearest existing vertex
    /// within `eps`, or a new one.
    ///
    /// Looking up the same point twice always gives the same answer.
    fn insert(&mut self, p: Point) -> VertexIdx {
        let key = (p.x.to_bits(), p.y.to_bits());
        if let Some(&v) = self.exact.get(&key) {
            return v;
        }

        let (cx, cy) = self.cell(p);
        let mut best: Option<(f64, VertexIdx)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(candidates) = self.grid.get(&(cx.saturating_add(dx), cy.saturating_add(dy)))
                else {
                    continue;
                };
                for &v in candidates {
                    let dist = (self.points[v] - p).hypot();
                    if dist <= self.eps && best.map_or(true, |(d, w)| (dist, v) < (d, w)) {
                        best = Some((dist, v));
                    }
                }
            }
        }

        let v = match best {
            Some((_, v)) => v,
            None => {
                let v = self.points.push(p);
                self.grid.entry((cx, cy)).or_default().push(v);
                v
            }
        };
        self.exact.insert(key, v);
        v
    }
}

/// Edges, vertices, and winding numbers.
#[derive(Clone, Debug, Default)]
pub struct EdgeGraph {
    points: VertexVec<Point>,
    edges: EdgeVec<WindingEdge>,
    next: EdgeVec<EdgeIdx>,
    prev: EdgeVec<EdgeIdx>,
    rings: Vec<EdgeRing>,
    bundles: BundleVec<Bundle>,
    incident: VertexVec<Vec<EdgeIdx>>,
    eps: f64,
}

impl std::ops::Index<EdgeIdx> for EdgeGraph {
    type Output = WindingEdge;

    fn index(&self, idx: EdgeIdx) -> &WindingEdge {
        &self.edges[idx]
    }
}

impl EdgeGraph {
    /// Splits the pieces at all the intersection points and computes the
    /// winding numbers of the resulting edges.
    pub fn build(
        pieces: &Pieces,
        intersections: &Intersections,
        tol: &Tolerances,
        max_ray_retries: usize,
        warnings: &mut Vec<Warning>,
    ) -> EdgeGraph {
        let mut ret = EdgeGraph::split(pieces, intersections, tol);
        ret.assign_windings(tol, max_ray_retries, warnings);
        ret
    }

    /// Splits the pieces at all the intersection points, without computing
    /// any winding numbers.
    pub fn split(pieces: &Pieces, intersections: &Intersections, tol: &Tolerances) -> EdgeGraph {
        let eps = tol.position;
        let mut vertices = VertexTable::new(eps);

        // Piece endpoints go in first, so that intersection points get
        // snapped to them and not the other way around.
        let mut splits: Vec<Vec<(f64, VertexIdx)>> = pieces
            .iter()
            .map(|(_, p)| {
                vec![
                    (0.0, vertices.insert(p.segment.start())),
                    (1.0, vertices.insert(p.segment.end())),
                ]
            })
            .collect();
        for int in &intersections.points {
            let v = vertices.insert(int.point);
            splits[int.a.0].push((int.ta, v));
            splits[int.b.0].push((int.tb, v));
        }

        let mut ret = EdgeGraph {
            eps,
            ..Default::default()
        };
        for ring in pieces.contours() {
            let first = EdgeIdx(ret.edges.len());
            for piece_idx in pieces.ring(ring.first) {
                let piece = &pieces[piece_idx];
                let split = &mut splits[piece_idx.0];
                split.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                // The endpoints must stay at the ends, even if an
                // intersection had a parameter that was slightly outside.
                let start_v = vertices.insert(piece.segment.start());
                let end_v = vertices.insert(piece.segment.end());
                split.retain(|&(t, v)| (t > 0.0 && t < 1.0) || (t == 0.0 && v == start_v) || (t == 1.0 && v == end_v));

                let mut prev = split[0];
                for &(t, v) in &split[1..] {
                    if v == prev.1 {
                        continue;
                    }
                    let p0 = vertices.points[prev.1];
                    let p1 = vertices.points[v];
                    let segment = if prev.0 == 0.0 && t == 1.0 {
                        piece.segment.with_endpoints(p0, p1)
                    } else {
                        piece.segment.subsegment(prev.0, t).with_endpoints(p0, p1)
                    };
                    ret.edges.push(WindingEdge {
                        segment,
                        start: prev.1,
                        end: v,
                        piece: piece_idx,
                        contour: piece.contour,
                        seg: piece.seg,
                        t0: piece.segment_param(prev.0),
                        t1: piece.segment_param(t),
                        bundle: BundleIdx(0),
                        windings: SideWindings::default(),
                    });
                    prev = (t, v);
                }
            }

            let n = ret.edges.len() - first.0;
            if n == 0 {
                log::debug!("contour {:?} collapsed while splitting", ring.contour);
                continue;
            }
            for i in 0..n {
                ret.next.push(EdgeIdx(first.0 + (i + 1) % n));
                ret.prev.push(EdgeIdx(first.0 + (i + n - 1) % n));
            }
            ret.rings.push(EdgeRing {
                contour: ring.contour,
                first,
            });
        }

        ret.points = vertices.points;
        ret.incident = VertexVec::filled(Vec::new(), ret.points.len());
        for (idx, e) in ret.edges.iter() {
            ret.incident[e.start].push(idx);
            ret.incident[e.end].push(idx);
        }
        ret.build_bundles();
        log::debug!(
            "split into {} edges ({} bundles) with {} vertices",
            ret.edges.len(),
            ret.bundles.len(),
            ret.points.len()
        );
        ret
    }

    fn build_bundles(&mut self) {
        let mut by_endpoints: BTreeMap<(VertexIdx, VertexIdx), Vec<EdgeIdx>> = BTreeMap::new();
        for (idx, e) in self.edges.iter() {
            let key = (e.start.min(e.end), e.start.max(e.end));
            by_endpoints.entry(key).or_default().push(idx);
        }

        let mut bundles: Vec<Bundle> = Vec::new();
        for group in by_endpoints.into_values() {
            let first_bundle = bundles.len();
            for e in group {
                let existing = bundles[first_bundle..]
                    .iter_mut()
                    .find(|b| self.coincident(b.reference(), e));
                match existing {
                    Some(b) => b.edges.push(e),
                    None => bundles.push(Bundle { edges: vec![e] }),
                }
            }
        }
        // Keep the bundles in the order of their reference edges.
        bundles.sort_by_key(Bundle::reference);

        for (i, b) in bundles.iter().enumerate() {
            for &e in &b.edges {
                self.edges[e].bundle = BundleIdx(i);
            }
        }
        self.bundles = bundles.into_iter().collect();
    }

    /// Do these two edges (which share their endpoints) follow the same path?
    fn coincident(&self, a: EdgeIdx, b: EdgeIdx) -> bool {
        let a = &self.edges[a].segment;
        let b = &self.edges[b].segment;
        if a.is_line() && b.is_line() {
            return true;
        }
        let tol = 4.0 * self.eps;
        let close = |x: &Segment, y: &Segment| {
            [0.25, 0.5, 0.75]
                .into_iter()
                .all(|t| y.nearest(x.eval(t), self.eps * 1e-3).1 <= tol)
        };
        close(a, b) && close(b, a)
    }

    /// Computes winding numbers for every edge.
    pub fn assign_windings(
        &mut self,
        tol: &Tolerances,
        max_ray_retries: usize,
        warnings: &mut Vec<Warning>,
    ) {
        let mut ambiguous = 0;
        for b in self.bundles.indices() {
            let (sides, clean) = self.bundle_windings(b, tol, max_ray_retries);
            if !clean {
                ambiguous += 1;
            }
            let reference = &self.edges[self.bundles[b].reference()];
            let (ref_start, ref_end) = (reference.start, reference.end);
            for i in 0..self.bundles[b].edges.len() {
                let e = self.bundles[b].edges[i];
                let edge = &mut self.edges[e];
                debug_assert!(edge.start == ref_start || edge.start == ref_end);
                edge.windings = if edge.start == ref_start {
                    sides
                } else {
                    sides.flipped()
                };
            }
        }
        if ambiguous > 0 {
            log::debug!("{ambiguous} bundles had no clean winding ray");
            warnings.push(Warning::AmbiguousRay { bundles: ambiguous });
        }
    }

    /// Computes the winding numbers on either side of a bundle, from the point
    /// of view of its reference edge.
    ///
    /// The second return value is false if no clean ray was found, in which
    /// case the first attempt is used anyway.
    fn bundle_windings(
        &self,
        b: BundleIdx,
        tol: &Tolerances,
        max_ray_retries: usize,
    ) -> (SideWindings, bool) {
        let bundle = &self.bundles[b];
        let reference = &self.edges[bundle.reference()];
        // The winding number jumps by one across each member, in a direction
        // that depends on which way the member goes.
        let jump: i32 = bundle
            .edges
            .iter()
            .map(|&e| if self.edges[e].start == reference.start { 1 } else { -1 })
            .sum();

        let max_ray_retries = max_ray_retries.min(RAY_RETRY_LIMIT);
        let seg = &reference.segment;
        let d = seg.unit_tangent(0.5);
        // Cast the ray as perpendicular to the edge as we can.
        let primary = if d.y.abs() >= d.x.abs() { Axis::X } else { Axis::Y };
        let step = 0.5 / (max_ray_retries + 1) as f64;

        let mut first = None;
        for axis in [primary, primary.other()] {
            for k in 0..=max_ray_retries {
                let offset = k.div_ceil(2) as f64 * step;
                let s = if k % 2 == 1 { 0.5 + offset } else { 0.5 - offset };
                let origin = seg.eval(s);
                let d = seg.unit_tangent(s);
                let r = ray_direction(axis);
                let side = d.cross(r);
                if side.abs() <= tol.angle {
                    continue;
                }

                let cast = self.cast_ray(origin, axis, &bundle.edges);
                // The ray leaves from the bundle into one side, and that side
                // has the winding number the ray measured. On the other side,
                // we have to add the jump.
                let sides = if side > 0.0 {
                    SideWindings {
                        counter_clockwise: cast.winding,
                        clockwise: cast.winding - jump,
                    }
                } else {
                    SideWindings {
                        counter_clockwise: cast.winding + jump,
                        clockwise: cast.winding,
                    }
                };
                if !cast.degenerate {
                    return (sides, true);
                }
                log::trace!("degenerate ray from {origin:?} along {axis:?} for {b:?}");
                first.get_or_insert(sides);
            }
        }
        (first.unwrap_or_default(), false)
    }

    /// Casts a ray from `origin` in the positive `axis` direction, and adds
    /// up the signed crossings of all edges except the ones in `exclude`.
    ///
    /// The result is the winding number at `origin`, if the excluded edges
    /// are ignored.
    pub fn cast_ray(&self, origin: Point, axis: Axis, exclude: &[EdgeIdx]) -> RayCast {
        let eps = self.eps;
        let across = axis.other();
        let along_origin = axis.coord(origin);
        let across_origin = across.coord(origin);
        // A crossing in the increasing-`across` direction counts as +1 for a
        // horizontal ray (upwards, to the right of it) and -1 for a vertical one.
        let sign = match axis {
            Axis::X => 1,
            Axis::Y => -1,
        };

        let mut ret = RayCast {
            winding: 0,
            degenerate: false,
        };
        for (idx, e) in self.edges.iter() {
            if exclude.contains(&idx) {
                continue;
            }
            let bbox = e.segment.bounding_box();
            let (along_lo, along_hi, across_lo, across_hi) = match axis {
                Axis::X => (bbox.x0, bbox.x1, bbox.y0, bbox.y1),
                Axis::Y => (bbox.y0, bbox.y1, bbox.x0, bbox.x1),
            };
            if along_hi < along_origin - eps
                || across_lo > across_origin + eps
                || across_hi < across_origin - eps
            {
                continue;
            }
            debug_assert!(along_lo <= along_hi);

            // Cut the edge where it turns around in the `across` direction.
            // Edges are already monotonic in the sweep direction.
            let mut params: Vec<f64> = vec![0.0];
            if across != SWEEP_AXIS {
                params.extend(e.segment.extrema(across, 1e-12));
            }
            params.push(1.0);

            for w in params.windows(2) {
                let (u0, u1) = (w[0], w[1]);
                let p0 = if u0 == 0.0 { e.segment.start() } else { e.segment.eval(u0) };
                let p1 = if u1 == 1.0 { e.segment.end() } else { e.segment.eval(u1) };

                for q in [p0, p1] {
                    if (across.coord(q) - across_origin).abs() <= eps
                        && axis.coord(q) >= along_origin - eps
                    {
                        ret.degenerate = true;
                    }
                }

                let (a0, a1) = (across.coord(p0), across.coord(p1));
                let strictly_between =
                    (a0 < across_origin && across_origin < a1) || (a1 < across_origin && across_origin < a0);
                if !strictly_between {
                    continue;
                }

                let hit = match e.segment {
                    Segment::Line(_) => {
                        let u = (across_origin - a0) / (a1 - a0);
                        axis.coord(p0) + u * (axis.coord(p1) - axis.coord(p0))
                    }
                    Segment::Cubic(c) => {
                        let sub = if u0 == 0.0 && u1 == 1.0 {
                            c
                        } else {
                            e.segment.subsegment(u0, u1).to_cubic()
                        };
                        let t = solve_t_for(sub, across, across_origin);
                        axis.coord(kurbo::ParamCurve::eval(&sub, t))
                    }
                };
                if (hit - along_origin).abs() <= eps {
                    ret.degenerate = true;
                } else if hit > along_origin {
                    ret.winding += if a1 > a0 { sign } else { -sign };
                }
            }
        }
        ret
    }

    /// The winding number of the input contours at `p`, or `None` if `p`
    /// is too close to an edge (or a horizontal ray from it is too close to
    /// a vertex) to tell.
    pub fn winding_number(&self, p: Point) -> Option<i32> {
        let cast = self.cast_ray(p, Axis::X, &[]);
        (!cast.degenerate).then_some(cast.winding)
    }

    /// The position of a vertex.
    pub fn point(&self, v: VertexIdx) -> Point {
        self.points[v]
    }

    /// The number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.points.len()
    }

    /// All the edges.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIdx, &WindingEdge)> + '_ {
        self.edges.iter()
    }

    /// The number of edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The next edge in the same input contour.
    pub fn next(&self, e: EdgeIdx) -> EdgeIdx {
        self.next[e]
    }

    /// The previous edge in the same input contour.
    pub fn prev(&self, e: EdgeIdx) -> EdgeIdx {
        self.prev[e]
    }

    /// The rings of edges, one for each input contour that survived.
    pub fn rings(&self) -> &[EdgeRing] {
        &self.rings
    }

    /// Iterates over the ring of edges starting at `first`.
    pub fn ring(&self, first: EdgeIdx) -> impl Iterator<Item = EdgeIdx> + '_ {
        let mut cur = Some(first);
        std::iter::from_fn(move || {
            let ret = cur?;
            let next = self.next(ret);
            cur = (next != first).then_some(next);
            Some(ret)
        })
    }

    /// The bundles of coincident edges.
    pub fn bundles(&self) -> impl Iterator<Item = (BundleIdx, &Bundle)> + '_ {
        self.bundles.iter()
    }

    /// A single bundle.
    pub fn bundle(&self, b: BundleIdx) -> &Bundle {
        &self.bundles[b]
    }

    /// The edges that start or end at `v`.
    pub fn incident(&self, v: VertexIdx) -> &[EdgeIdx] {
        &self.incident[v]
    }

    /// Draws the edge graph, coloring each edge according to its winding numbers.
    #[cfg(feature = "debug-svg")]
    pub fn dump_svg(&self, color: impl Fn(SideWindings) -> String) -> svg::Document {
        use svg::node::element::{path::Data, Circle, Path};

        let Some(bbox) = self
            .edges
            .values()
            .map(|e| e.segment.bounding_box())
            .reduce(|a, b| a.union(b))
        else {
            return svg::Document::new();
        };
        let stroke_width = (bbox.width().max(bbox.height()) / 500.0).max(self.eps);
        let margin = 10.0 * stroke_width;
        let mut document = svg::Document::new().set(
            "viewBox",
            (
                bbox.x0 - margin,
                bbox.y0 - margin,
                bbox.width() + 2.0 * margin,
                bbox.height() + 2.0 * margin,
            ),
        );

        for e in self.edges.values() {
            let p0 = e.segment.start();
            let data = Data::new().move_to((p0.x, p0.y));
            let data = match e.segment {
                Segment::Line(l) => data.line_to((l.p1.x, l.p1.y)),
                Segment::Cubic(c) => {
                    data.cubic_curve_to(((c.p1.x, c.p1.y), (c.p2.x, c.p2.y), (c.p3.x, c.p3.y)))
                }
            };
            let path = Path::new()
                .set("d", data)
                .set("stroke", color(e.windings))
                .set("stroke-width", stroke_width)
                .set("stroke-linecap", "round")
                .set("fill", "none");
            document = document.add(path);
        }
        for p in self.points.values() {
            let circle = Circle::new()
                .set("cx", p.x)
                .set("cy", p.y)
                .set("r", 2.0 * stroke_width)
                .set("fill", "black");
            document = document.add(circle);
        }
        document
    }
}

fn ray_direction(axis: Axis) -> Vec2 {
    match axis {
        Axis::X => Vec2::new(1.0, 0.0),
        Axis::Y => Vec2::new(0.0, 1.0),
    }
}
