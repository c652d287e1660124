//! Utilities for fuzz and/or property testing using `arbitrary`.

use arbitrary::Unstructured;
use kurbo::{Point, Vec2};

use crate::{Contour, ContourSet, Options, Segment};

/// Generate an arbitrary float in some range.
pub fn float_in_range(
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let num: u32 = u.arbitrary()?;
    let t = num as f64 / u32::MAX as f64;
    Ok((1.0 - t) * start + t * end)
}

/// Generate a float in some range, but give it a chance to be close to another float.
fn another_float_in_range(
    orig: f64,
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let close: bool = u.arbitrary()?;
    if close {
        let ulps: i32 = u.int_in_range(-32..=32)?;
        let scale = 1.0f64 + ulps as f64 * f64::EPSILON;
        Ok((orig * scale).clamp(start, end))
    } else {
        float_in_range(start, end, u)
    }
}

fn point(size: f64, u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    Ok(Point::new(
        float_in_range(-size, size, u)?,
        float_in_range(-size, size, u)?,
    ))
}

/// Generate a point that has a chance of being close to (or exactly equal to)
/// one of the points we've already made.
///
/// Near-coincident vertices and near-horizontal edges are where the numerics
/// get interesting.
fn another_point(
    size: f64,
    previous: &[Point],
    u: &mut Unstructured<'_>,
) -> Result<Point, arbitrary::Error> {
    if previous.is_empty() {
        return point(size, u);
    }
    match u.int_in_range(0u8..=3)? {
        0 => Ok(*u.choose(previous)?),
        1 => {
            let p = *u.choose(previous)?;
            Ok(Point::new(
                another_float_in_range(p.x, -size, size, u)?,
                another_float_in_range(p.y, -size, size, u)?,
            ))
        }
        2 => {
            let p = *u.choose(previous)?;
            Ok(Point::new(float_in_range(-size, size, u)?, p.y))
        }
        _ => point(size, u),
    }
}

/// Generate an arbitrary closed contour of lines and cubics, with coordinates
/// in `[-size, size]`.
pub fn contour(size: f64, u: &mut Unstructured<'_>) -> Result<Contour, arbitrary::Error> {
    let mut points = Vec::new();
    let n = u.int_in_range(1..=8)?;
    for _ in 0..n {
        points.push(another_point(size, &points, u)?);
    }

    let mut segments = Vec::with_capacity(n);
    for i in 0..n {
        let p0 = points[i];
        let p3 = points[(i + 1) % n];
        let is_line: bool = u.arbitrary()?;
        segments.push(if is_line {
            Segment::line(p0, p3)
        } else {
            let p1 = another_point(size, &points, u)?;
            let p2 = another_point(size, &points, u)?;
            Segment::cubic(p0, p1, p2, p3)
        });
    }
    // Consecutive segments share their endpoints exactly, so this is closed.
    Ok(Contour::new(segments)
        .unwrap_or_default()
        .with_selected(u.arbitrary()?))
}

/// Generate an arbitrary set of contours.
///
/// Later contours have a chance of being slightly moved copies of earlier
/// ones, which makes for lots of coincident and nearly-coincident edges.
pub fn contour_set(size: f64, u: &mut Unstructured<'_>) -> Result<ContourSet, arbitrary::Error> {
    let n = u.int_in_range(1..=4)?;
    let mut contours: Vec<Contour> = Vec::with_capacity(n);
    for _ in 0..n {
        let copy: bool = !contours.is_empty() && u.arbitrary()?;
        if copy {
            let orig = u.choose(&contours)?.clone();
            let dx = float_in_range(-size / 4.0, size / 4.0, u)?;
            let reverse: bool = u.arbitrary()?;
            let moved = orig
                .segments()
                .iter()
                .map(|s| {
                    let pts: Vec<Point> = s
                        .control_points()
                        .iter()
                        .map(|p| *p + Vec2::new(dx, 0.0))
                        .collect();
                    match pts[..] {
                        [p0, p1, p2, p3] => Segment::cubic(p0, p1, p2, p3),
                        [p0, .., p1] => Segment::line(p0, p1),
                        _ => *s,
                    }
                })
                .collect();
            let moved = Contour::new(moved).unwrap_or_default();
            contours.push(if reverse { moved.reversed() } else { moved });
        } else {
            contours.push(contour(size, u)?);
        }
    }
    Ok(ContourSet::new(contours))
}

/// Generate an arbitrary set of options, with the default tolerances and limits.
pub fn options(u: &mut Unstructured<'_>) -> Result<Options, arbitrary::Error> {
    Ok(Options {
        fill_rule: u.arbitrary()?,
        mode: u.arbitrary()?,
        scope: u.arbitrary()?,
        orientation: u.arbitrary()?,
        ..Options::default()
    })
}

/// Runs [`remove_overlap`](crate::remove_overlap) on arbitrary input, and
/// checks that it succeeds with finite, closed output.
///
/// Panics if the check fails.
pub fn check_remove_overlap(u: &mut Unstructured<'_>) -> Result<(), arbitrary::Error> {
    let set = contour_set(1e3, u)?;
    let options = options(u)?;
    let out = match crate::remove_overlap(&set, &options) {
        Ok(out) => out,
        Err(e) => panic!("failed on {set:?}: {e}"),
    };
    assert_eq!(out.contours.check_finite(), Ok(()));
    assert_eq!(out.contours.check_closed(), Ok(()));
    Ok(())
}
