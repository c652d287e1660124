#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
mod backtrack;
mod contour;
pub mod curve;
mod geom;
pub mod intersect;
pub mod monotonic;
mod num;
mod options;
pub mod reconstruct;
pub mod winding;

#[cfg(feature = "generators")]
pub mod generators;

pub use contour::{Contour, ContourSet, NonClosedPath};
pub use geom::{Axis, Segment};
pub use kurbo;
pub use options::{FillRule, Mode, Options, Orientation, Scope, Tolerances};

use kurbo::{Point, Rect};

use crate::{
    intersect::find_intersections, monotonic::Pieces, reconstruct::reconstruct, winding::EdgeGraph,
};

#[derive(Clone, Copy, Debug, PartialEq)]
/// The input was faulty.
pub enum Error {
    /// At least one of the inputs was infinite.
    Infinity,
    /// At least one of the inputs was not a number.
    NaN,
    /// One of the inputs had a non-closed path.
    NonClosedPath(NonClosedPath),
}

impl From<NonClosedPath> for Error {
    fn from(ncp: NonClosedPath) -> Self {
        Error::NonClosedPath(ncp)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Infinity => write!(f, "one of the inputs was infinite"),
            Error::NaN => write!(f, "one of the inputs had a NaN"),
            Error::NonClosedPath(ncp) => write!(
                f,
                "contour {} isn't closed after segment {}",
                ncp.contour, ncp.segment
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Something questionable that happened while processing the input.
///
/// None of these stop us from producing output, but they might mean that
/// the output isn't quite what was intended.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum Warning {
    /// An input contour had no area, and was ignored.
    DegenerateContour {
        /// The index of the contour in the input.
        contour: usize,
    },
    /// Some segments of an input contour were too short to matter, and were
    /// dropped.
    ZeroLengthSegments {
        /// The index of the contour in the input.
        contour: usize,
        /// How many segments were dropped.
        count: usize,
    },
    /// Some pairs of curves ran along one another for too long to find all
    /// their intersections, and were treated as only touching at their ends.
    CoincidentCurves {
        /// The number of such pairs.
        pairs: usize,
    },
    /// For some groups of edges, every ray we tried for computing winding
    /// numbers passed too close to a vertex.
    AmbiguousRay {
        /// The number of edge bundles affected.
        bundles: usize,
    },
    /// Output contours couldn't be stitched together consistently, and one
    /// was closed off with a straight line.
    InconsistentWinding {
        /// Where we got stuck.
        point: Point,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::DegenerateContour { contour } => {
                write!(f, "contour {contour} has no area")
            }
            Warning::ZeroLengthSegments { contour, count } => {
                write!(f, "dropped {count} zero-length segments from contour {contour}")
            }
            Warning::CoincidentCurves { pairs } => {
                write!(f, "{pairs} pairs of curves overlap along their length")
            }
            Warning::AmbiguousRay { bundles } => {
                write!(f, "no clean winding ray for {bundles} edge bundles")
            }
            Warning::InconsistentWinding { point } => {
                write!(f, "inconsistent winding numbers near {point:?}")
            }
        }
    }
}

impl Warning {
    fn scaled(self, factor: f64) -> Self {
        match self {
            Warning::InconsistentWinding { point } => Warning::InconsistentWinding {
                point: Point::new(point.x * factor, point.y * factor),
            },
            w => w,
        }
    }
}

/// The result of a successful [`remove_overlap`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outcome {
    /// The output contours.
    pub contours: ContourSet,
    /// Everything that looked suspicious along the way.
    pub warnings: Vec<Warning>,
}

// Past this, products of coordinates can overflow.
const LARGE_COORDINATE: f64 = 1e100;

// Inputs that are too large get scaled so that they fit in this.
const WORKING_EXPONENT: i32 = 20;

/// A power of two that brings coordinates as large as `bounds` back into a
/// range where products of coordinates can't overflow.
fn rescale_factor(bounds: Rect) -> Option<f64> {
    let m = bounds
        .x0
        .abs()
        .max(bounds.x1.abs())
        .max(bounds.y0.abs())
        .max(bounds.y1.abs());
    (m > LARGE_COORDINATE).then(|| {
        let exponent = m.log2().ceil() as i32;
        2.0f64.powi(WORKING_EXPONENT - exponent)
    })
}

/// Removes the overlaps between (and within) the contours of `set`.
///
/// With the default options, the output covers exactly the region that the
/// input fills under the non-zero fill rule, but every point of it is
/// covered once: outer contours run counter-clockwise, holes run clockwise,
/// and no two output contours cross. See [`Mode`] for the other things this
/// can do.
///
/// Coordinates can be as large as any finite `f64`: very large inputs are
/// scaled down (by a power of two, so exactly) while they're processed.
pub fn remove_overlap(set: &ContourSet, options: &Options) -> Result<Outcome, Error> {
    set.check_finite()?;
    set.check_closed()?;

    let Some(factor) = set.bounding_box().and_then(rescale_factor) else {
        return Ok(remove_overlap_unchecked(set, options));
    };
    log::debug!("scaling the input by {factor:e}");
    let options = Options {
        tolerances: options.tolerances.map(|tol| Tolerances {
            position: tol.position * factor,
            ..tol
        }),
        ..*options
    };
    let out = remove_overlap_unchecked(&set.scaled(factor), &options);
    Ok(Outcome {
        contours: out.contours.scaled(factor.recip()),
        warnings: out
            .warnings
            .into_iter()
            .map(|w| w.scaled(factor.recip()))
            .collect(),
    })
}

// The input must be finite and closed, with coordinates small enough that
// their products don't overflow.
fn remove_overlap_unchecked(set: &ContourSet, options: &Options) -> Outcome {
    let tol = options.tolerances.unwrap_or_else(|| {
        Tolerances::for_bounds(set.bounding_box().unwrap_or(Rect::ZERO))
    });
    let include = |idx: usize| match options.scope {
        Scope::All => true,
        Scope::Selected => set.contours()[idx].selected,
    };

    let mut warnings = Vec::new();
    let pieces = Pieces::decompose(set, include, &tol, &mut warnings);
    let intersections = find_intersections(&pieces, &tol, options.max_subdivisions);
    if !intersections.coincident.is_empty() {
        warnings.push(Warning::CoincidentCurves {
            pairs: intersections.coincident.len(),
        });
    }

    let mut contours = ContourSet::default();
    if options.mode == Mode::FindIntersections {
        let graph = EdgeGraph::split(&pieces, &intersections, &tol);
        let mut split: Vec<Option<Contour>> = vec![None; set.len()];
        for (idx, c) in reconstruct::split_at_intersections(&graph, set) {
            split[idx.0] = Some(c);
        }
        for (c, s) in set.iter().zip(split) {
            contours.push(s.unwrap_or_else(|| c.clone()));
        }
        return Outcome { contours, warnings };
    }

    let graph = EdgeGraph::build(
        &pieces,
        &intersections,
        &tol,
        options.max_ray_retries,
        &mut warnings,
    );
    #[cfg(feature = "debug-svg")]
    {
        let doc = graph.dump_svg(|w| {
            if w.is_trivial() {
                "gray".to_owned()
            } else if options.inside(w.counter_clockwise) {
                "red".to_owned()
            } else {
                "blue".to_owned()
            }
        });
        if let Err(e) = svg::save("out.svg", &doc) {
            log::warn!("failed to write the debug svg: {e}");
        }
    }

    let selected = options.scope == Scope::Selected;
    for c in reconstruct(&graph, options, &tol, &mut warnings) {
        contours.push(c.with_selected(selected));
    }
    if selected {
        for c in set.iter().filter(|c| !c.selected) {
            contours.push(c.clone());
        }
    }
    Outcome { contours, warnings }
}

/// Splits every segment of `set` at the points where it meets another one.
///
/// This is [`remove_overlap`] in [`Mode::FindIntersections`], without the
/// warnings.
pub fn add_intersection_points(set: &ContourSet, options: &Options) -> Result<ContourSet, Error> {
    let options = Options {
        mode: Mode::FindIntersections,
        ..*options
    };
    Ok(remove_overlap(set, &options)?.contours)
}

/// Removes zero-length segments and segments that immediately retrace
/// their predecessors from every contour, dropping contours that vanish
/// completely.
///
/// This never changes the filled region. [`remove_overlap`] does it to its
/// output already.
pub fn remove_backtracks(set: &ContourSet, tol: &Tolerances) -> ContourSet {
    set.iter()
        .filter_map(|c| {
            let segments = backtrack::remove_spurs(c.segments().to_vec(), tol.position);
            (!segments.is_empty()).then(|| Contour::closed(segments).with_selected(c.selected))
        })
        .collect()
}
