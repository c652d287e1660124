//! Numerical kernels: root finding, flatness, and curve/curve refinement.
//!
//! Everything in here works on single curves (or pairs of curves) and knows
//! nothing about contours.

use arrayvec::ArrayVec;
use kurbo::{common::solve_cubic, CubicBez, Point, Vec2};

use crate::geom::{Axis, Segment};

/// Finds the parameters in the open interval `(0, 1)` at which the `axis`
/// coordinate of a cubic changes direction.
///
/// The arguments are the four control coordinates. The derivative of a cubic
/// is a quadratic; a quadratic whose discriminant is within `disc_tol`
/// (relative to the size of its coefficients) of zero is treated as having a
/// double root. A double root is a tangency of the derivative with zero, not
/// a change of direction, so nothing is returned for it.
pub fn axis_extrema(q0: f64, q1: f64, q2: f64, q3: f64, disc_tol: f64) -> ArrayVec<f64, 2> {
    let mut ret = ArrayVec::new();

    // The derivative has Bernstein coefficients 3(q1 - q0), 3(q2 - q1), 3(q3 - q2).
    // We drop the 3s, and normalize so that the tolerances below are relative.
    let d0 = q1 - q0;
    let d1 = q2 - q1;
    let d2 = q3 - q2;
    let scale = d0.abs().max(d1.abs()).max(d2.abs());
    if scale == 0.0 {
        return ret;
    }
    let (d0, d1, d2) = (d0 / scale, d1 / scale, d2 / scale);

    // In the power basis, the derivative is a t^2 + b t + c.
    let a = d0 - 2.0 * d1 + d2;
    let b = 2.0 * (d1 - d0);
    let c = d0;

    let mut push = |t: f64| {
        if t > 0.0 && t < 1.0 {
            ret.push(t);
        }
    };

    if a.abs() <= 1e-12 {
        if b != 0.0 {
            push(-c / b);
        }
        return ret;
    }

    let disc = b * b - 4.0 * a * c;
    if disc <= disc_tol * (b * b).max((4.0 * a * c).abs()) {
        return ret;
    }

    // Choose the sign that avoids cancellation, and get the other root from
    // the product of the roots.
    let q = -0.5 * (b + disc.sqrt().copysign(b));
    let r0 = q / a;
    let r1 = if q != 0.0 { c / q } else { r0 };
    let (r0, r1) = if r0 <= r1 { (r0, r1) } else { (r1, r0) };
    push(r0);
    if r1 != r0 {
        push(r1);
    }
    ret
}

// Tries to solve a cubic, but only looks for accurate solutions in the interval [0.0, 1.0].
//
// This doesn't actually filter out solutions outside that interval, it only
// makes some tweaks for better numerical stability inside it.
fn solve_cubic_in_unit_interval(c0: f64, c1: f64, c2: f64, c3: f64) -> ArrayVec<f64, 3> {
    // Since we're only interested in small values of t, we can ignore c3 if it's
    // much smaller than the other coefficients. Zeroing it introduces an error
    // of order 1/T for a threshold T, while keeping it costs about T * 1e-15 of
    // relative error in the roots, so T is taken around 1e7.
    let mut new_c3 = c3;
    let mut new_c2 = c2;
    if c3.abs() < c2.abs().max(c1.abs()) / 1e7 {
        new_c3 = 0.0;
        if c2.abs() < c1.abs().max(c0.abs()) / 1e7 {
            new_c2 = 0.0;
        }
    }
    let mut roots = solve_cubic(c0, c1, new_c2, new_c3);

    // A few Newton steps with the original coefficients, to win back the
    // accuracy lost above.
    for x in &mut roots {
        let mut val = c3 * *x * *x * *x + c2 * *x * *x + c1 * *x + c0;
        let mut deriv = 3.0 * c3 * *x * *x + 2.0 * c2 * *x + c1;
        for _ in 0..3 {
            if val.abs() <= 1e-14 || deriv == 0.0 {
                break;
            }

            // A double root perturbed by a tiny cubic term gives a giant
            // Newton step, so the step is capped at sqrt(|val|).
            let step = val / deriv;
            let step = step.abs().min(val.abs().sqrt()).copysign(step);
            *x -= step;

            val = c3 * *x * *x * *x + c2 * *x * *x + c1 * *x + c0;
            deriv = 3.0 * c3 * *x * *x + 2.0 * c2 * *x + c1;
        }
    }
    roots
}

/// Finds a root of `f` in `[lo, hi]`, assuming that `f` changes sign at most
/// once there.
pub fn bisect(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let mut f_lo = f(lo);
    if f_lo == 0.0 {
        return lo;
    }
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        let f_mid = f(mid);
        if f_mid == 0.0 {
            return mid;
        }
        if (f_mid < 0.0) == (f_lo < 0.0) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Finds the parameter at which a cubic that is monotonic in `axis` reaches
/// `value` in that coordinate.
///
/// Values outside the curve's range are clamped to the nearest endpoint.
pub fn solve_t_for(c: CubicBez, axis: Axis, value: f64) -> f64 {
    let q0 = axis.coord(c.p0);
    let q1 = axis.coord(c.p1);
    let q2 = axis.coord(c.p2);
    let q3 = axis.coord(c.p3);
    if value == q0 {
        return 0.0;
    }
    if value == q3 {
        return 1.0;
    }
    let increasing = q3 >= q0;
    if (value < q0) == increasing {
        return 0.0;
    }
    if (value > q3) == increasing {
        return 1.0;
    }

    let c3 = q3 - 3.0 * q2 + 3.0 * q1 - q0;
    let c2 = 3.0 * (q2 - 2.0 * q1 + q0);
    let c1 = 3.0 * (q1 - q0);
    let c0 = q0 - value;

    let scale = q0.abs().max(q3.abs()).max(1.0);
    let eval = |t: f64| ((c3 * t + c2) * t + c1) * t + c0;
    let best = solve_cubic_in_unit_interval(c0, c1, c2, c3)
        .into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .map(|t| (t, eval(t).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    match best {
        Some((t, err)) if err <= 1e-12 * scale => t,
        // The polynomial solver gave up (or was inaccurate). The curve is
        // monotonic, so bisection can't fail.
        _ => bisect(eval, 0.0, 1.0),
    }
}

/// The largest distance from the inner control points of `c` to its chord.
///
/// A cubic whose flatness is below the position tolerance can be replaced by
/// its chord without moving by more than that tolerance.
pub fn flatness(c: &CubicBez) -> f64 {
    let chord = c.p3 - c.p0;
    let len = chord.hypot();
    if len == 0.0 {
        return (c.p1 - c.p0).hypot().max((c.p2 - c.p0).hypot());
    }
    let d1 = chord.cross(c.p1 - c.p0).abs() / len;
    let d2 = chord.cross(c.p2 - c.p0).abs() / len;
    d1.max(d2)
}

/// Intersects the line segments `p0 -- p1` and `q0 -- q1`.
///
/// Returns the parameters along each segment. Segments whose directions are
/// within `angle_tol` (as the sine of the angle between them) of parallel
/// never intersect. Parameters may overshoot `[0, 1]` by up to `slack`
/// (measured in distance, not in parameter space).
pub fn line_intersection(
    p0: Point,
    p1: Point,
    q0: Point,
    q1: Point,
    angle_tol: f64,
    slack: f64,
) -> Option<(f64, f64)> {
    let dp = p1 - p0;
    let dq = q1 - q0;
    let len_p = dp.hypot();
    let len_q = dq.hypot();
    if len_p == 0.0 || len_q == 0.0 {
        return None;
    }
    let denom = dp.cross(dq);
    if denom.abs() <= angle_tol * len_p * len_q {
        return None;
    }
    let w = q0 - p0;
    let u = w.cross(dq) / denom;
    let v = w.cross(dp) / denom;
    let slack_p = slack / len_p;
    let slack_q = slack / len_q;
    if u < -slack_p || u > 1.0 + slack_p || v < -slack_q || v > 1.0 + slack_q {
        return None;
    }
    Some((u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)))
}

/// Polishes an approximate intersection `a(t) ≈ b(s)` with a few Newton steps.
///
/// If Newton's method doesn't improve things (near-tangent curves make the
/// Jacobian almost singular), the original parameters are returned.
pub fn refine_intersection(a: &Segment, b: &Segment, t: f64, s: f64) -> (f64, f64) {
    let residual = |t: f64, s: f64| -> Vec2 { a.eval(t) - b.eval(s) };
    let mut best = (t, s, residual(t, s).hypot());
    let (mut t, mut s) = (t, s);
    for _ in 0..4 {
        let f = residual(t, s);
        if f.hypot() == 0.0 {
            break;
        }
        let da = a.deriv(t);
        let db = b.deriv(s);
        let det = -da.cross(db);
        if det.abs() <= 1e-300 {
            break;
        }
        t = (t + f.cross(db) / det).clamp(0.0, 1.0);
        s = (s + f.cross(da) / det).clamp(0.0, 1.0);
        let err = residual(t, s).hypot();
        if err < best.2 {
            best = (t, s, err);
        }
    }
    (best.0, best.1)
}
