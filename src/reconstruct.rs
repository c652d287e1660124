//! Choosing the boundary edges of the filled region and stitching them into
//! output contours.

use std::collections::HashMap;

use kurbo::Vec2;

use crate::{
    backtrack::remove_spurs,
    contour::{Contour, ContourSet},
    geom::Segment,
    monotonic::ContourIdx,
    options::{Options, Orientation, Tolerances},
    winding::{EdgeGraph, EdgeIdx, VertexIdx, VertexVec},
    Warning,
};

/// An edge of the graph, walked either forwards or backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectedEdge {
    /// The edge.
    pub edge: EdgeIdx,
    /// Are we walking it from its end to its start?
    pub reversed: bool,
}

impl DirectedEdge {
    fn forward(edge: EdgeIdx) -> Self {
        DirectedEdge {
            edge,
            reversed: false,
        }
    }

    /// The vertex we leave from.
    pub fn start(&self, graph: &EdgeGraph) -> VertexIdx {
        let e = &graph[self.edge];
        if self.reversed {
            e.end
        } else {
            e.start
        }
    }

    /// The vertex we arrive at.
    pub fn end(&self, graph: &EdgeGraph) -> VertexIdx {
        let e = &graph[self.edge];
        if self.reversed {
            e.start
        } else {
            e.end
        }
    }

    /// The geometry, in the direction we walk it.
    pub fn segment(&self, graph: &EdgeGraph) -> Segment {
        let seg = graph[self.edge].segment;
        if self.reversed {
            seg.reversed()
        } else {
            seg
        }
    }

    fn leaving_direction(&self, graph: &EdgeGraph) -> Vec2 {
        let seg = &graph[self.edge].segment;
        if self.reversed {
            -seg.end_tangent()
        } else {
            seg.start_tangent()
        }
    }

    fn arriving_direction(&self, graph: &EdgeGraph) -> Vec2 {
        let seg = &graph[self.edge].segment;
        if self.reversed {
            -seg.start_tangent()
        } else {
            seg.end_tangent()
        }
    }

    /// The edge that follows this one in its input contour, walked the same way.
    fn ring_successor(&self, graph: &EdgeGraph) -> DirectedEdge {
        DirectedEdge {
            edge: if self.reversed {
                graph.prev(self.edge)
            } else {
                graph.next(self.edge)
            },
            reversed: self.reversed,
        }
    }
}

/// Picks the edges that make up the boundary of the output, each oriented
/// so that the filled region is on its left.
///
/// From each bundle, at most one member is kept if the bundle separates
/// filled from unfilled space. A bundle with filled space on both sides
/// whose members cancel out is a seam between two input contours; one
/// opposing pair of its members is kept, so that the contours on both sides
/// stay closed.
pub fn select_edges(graph: &EdgeGraph, inside: impl Fn(i32) -> bool) -> Vec<DirectedEdge> {
    let mut ret = Vec::new();
    for (_, bundle) in graph.bundles() {
        let reference = &graph[bundle.reference()];
        let left = inside(reference.windings.counter_clockwise);
        let right = inside(reference.windings.clockwise);
        let forward = |e: &EdgeIdx| graph[*e].start == reference.start;

        if left != right {
            // Walk the bundle so that the filled side is on our left,
            // preferring a member that already goes that way.
            let member = bundle.edges.iter().find(|e| forward(e) == left);
            ret.push(match member {
                Some(&edge) => DirectedEdge::forward(edge),
                None => DirectedEdge {
                    edge: bundle.reference(),
                    reversed: true,
                },
            });
        } else if left && bundle.edges.len() >= 2 {
            let jump: i32 = bundle
                .edges
                .iter()
                .map(|e| if forward(e) { 1 } else { -1 })
                .sum();
            if jump == 0 {
                let a = bundle.edges.iter().find(|e| forward(e));
                let b = bundle.edges.iter().find(|e| !forward(e));
                if let (Some(&a), Some(&b)) = (a, b) {
                    ret.push(DirectedEdge::forward(a));
                    ret.push(DirectedEdge::forward(b));
                }
            }
        }
    }
    ret
}

/// Stitches the selected edges into closed loops of segments.
///
/// At each vertex we continue along the same input contour if we can, and
/// otherwise take the sharpest left turn. Going straight back along the edge
/// we arrived on is the last resort. If we get stuck (which can only happen
/// if the winding numbers were inconsistent), the loop is closed with a
/// straight line and a warning is recorded.
pub fn stitch(
    graph: &EdgeGraph,
    edges: &[DirectedEdge],
    warnings: &mut Vec<Warning>,
) -> Vec<Vec<Segment>> {
    let mut outgoing: VertexVec<Vec<usize>> = VertexVec::filled(Vec::new(), graph.num_vertices());
    let mut position = HashMap::with_capacity(edges.len());
    for (i, e) in edges.iter().enumerate() {
        outgoing[e.start(graph)].push(i);
        position.insert(*e, i);
    }

    let mut visited = vec![false; edges.len()];
    let mut ret = Vec::new();
    for start in 0..edges.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let mut walk = vec![start];
        let mut dangling = false;
        loop {
            let cur = edges[walk[walk.len() - 1]];
            let v = cur.end(graph);
            let available = |i: usize| !visited[i] || i == start;

            let successor = position
                .get(&cur.ring_successor(graph))
                .copied()
                .filter(|&i| available(i));
            let next = successor.or_else(|| {
                let incoming = cur.arriving_direction(graph);
                let current_bundle = graph[cur.edge].bundle;
                outgoing[v]
                    .iter()
                    .copied()
                    .filter(|&i| available(i))
                    .min_by(|&i, &j| {
                        let key = |k: usize| {
                            let e = edges[k];
                            let retrace = graph[e.edge].bundle == current_bundle;
                            let out = e.leaving_direction(graph);
                            let turn = incoming.cross(out).atan2(incoming.dot(out));
                            (retrace, -turn)
                        };
                        let (ri, ti) = key(i);
                        let (rj, tj) = key(j);
                        ri.cmp(&rj).then(ti.total_cmp(&tj)).then(i.cmp(&j))
                    })
            });

            match next {
                Some(i) if i == start => break,
                Some(i) => {
                    visited[i] = true;
                    walk.push(i);
                }
                None => {
                    dangling = true;
                    break;
                }
            }
        }

        let mut segments: Vec<Segment> = walk.iter().map(|&i| edges[i].segment(graph)).collect();
        if dangling {
            let from = graph.point(edges[walk[walk.len() - 1]].end(graph));
            let to = graph.point(edges[start].start(graph));
            log::warn!("inconsistent winding numbers: stuck at {from:?}");
            warnings.push(Warning::InconsistentWinding { point: from });
            if from != to {
                segments.push(Segment::line(from, to));
            }
        }
        ret.push(segments);
    }
    ret
}

/// Builds the output contours from an edge graph with winding numbers.
pub fn reconstruct(
    graph: &EdgeGraph,
    options: &Options,
    tol: &Tolerances,
    warnings: &mut Vec<Warning>,
) -> Vec<Contour> {
    let edges = select_edges(graph, |w| options.inside(w));
    log::debug!("kept {} of {} edges", edges.len(), graph.num_edges());

    let ret: Vec<Contour> = stitch(graph, &edges, warnings)
        .into_iter()
        .map(|segments| remove_spurs(segments, tol.position))
        .filter(|segments| !segments.is_empty())
        .map(|segments| {
            let contour = Contour::closed(segments);
            match options.orientation {
                Orientation::CounterClockwise => contour,
                Orientation::Clockwise => contour.reversed(),
            }
        })
        .collect();
    log::debug!("reconstructed {} contours", ret.len());
    ret
}

/// Splits the input segments at every point where they touch another edge,
/// without changing anything else.
///
/// Returns one contour for each ring of the graph.
pub fn split_at_intersections(graph: &EdgeGraph, set: &ContourSet) -> Vec<(ContourIdx, Contour)> {
    let mut ret = Vec::with_capacity(graph.rings().len());
    for ring in graph.rings() {
        let input = &set.contours()[ring.contour.0];
        let ring_edges: Vec<EdgeIdx> = graph.ring(ring.first).collect();
        let n = ring_edges.len();

        let mut segments = Vec::new();
        let mut run_start = 0;
        for i in 0..n {
            let e = &graph[ring_edges[i]];
            let next = &graph[ring_edges[(i + 1) % n]];
            // Edges also end where a piece turned around vertically; those
            // vertices have nothing else attached to them.
            let cut = i == n - 1 || next.seg != e.seg || graph.incident(e.end).len() > 2;
            if !cut {
                continue;
            }

            let first = &graph[ring_edges[run_start]];
            let orig = input.segments()[e.seg];
            let p0 = graph.point(first.start);
            let p1 = graph.point(e.end);
            let seg = if first.t0 == 0.0 && e.t1 == 1.0 {
                orig.with_endpoints(p0, p1)
            } else {
                orig.subsegment(first.t0, e.t1).with_endpoints(p0, p1)
            };
            segments.push(seg);
            run_start = i + 1;
        }
        let contour = Contour::closed(segments).with_selected(input.selected);
        ret.push((ring.contour, contour));
    }
    ret
}
