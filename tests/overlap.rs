use kurbo::{Point, Shape};
use overlap::{
    remove_overlap, Contour, ContourSet, FillRule, Mode, Options, Orientation, Tolerances, Warning,
};
use proptest::prelude::*;

fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
    rect(x, y, size, size)
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> Vec<(f64, f64)> {
    vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
}

fn union(set: &ContourSet) -> ContourSet {
    remove_overlap(set, &Options::default()).unwrap().contours
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

#[test]
fn overlapping_squares_make_one_contour() {
    let set = ContourSet::from_polygons([square(0.0, 0.0, 1.0), square(0.5, 0.5, 1.0)]);
    let out = union(&set);
    assert_eq!(out.len(), 1);
    let contour = &out.contours()[0];
    assert_close(contour.signed_area(), 1.75);
    assert_eq!(contour.orientation(), Some(Orientation::CounterClockwise));

    // Six original corners, plus the two crossing points.
    let mut vertices: Vec<Point> = contour.vertices().collect();
    vertices.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    assert_eq!(
        vertices,
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.5, 1.0),
            Point::new(0.5, 1.5),
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.5),
            Point::new(1.5, 0.5),
            Point::new(1.5, 1.5),
        ]
    );
}

#[test]
fn holes_are_kept() {
    let mut hole = square(1.0, 1.0, 2.0);
    hole.reverse();
    let set = ContourSet::from_polygons([square(0.0, 0.0, 4.0), hole]);
    let out = union(&set);
    assert_eq!(out.len(), 2);
    assert_close(out.signed_area(), 12.0);
    let orientations: Vec<_> = out.iter().map(Contour::orientation).collect();
    assert!(orientations.contains(&Some(Orientation::CounterClockwise)));
    assert!(orientations.contains(&Some(Orientation::Clockwise)));
}

#[test]
fn small_hole_in_a_square() {
    let mut hole = square(1.0, 1.0, 1.0);
    hole.reverse();
    let set = ContourSet::from_polygons([square(0.0, 0.0, 4.0), hole]);
    let out = union(&set);
    assert_eq!(out.len(), 2);
    assert_close(out.signed_area(), 15.0);
    let mut areas: Vec<f64> = out.iter().map(Contour::signed_area).collect();
    areas.sort_by(f64::total_cmp);
    assert_close(areas[0], -1.0);
    assert_close(areas[1], 16.0);
}

#[test]
fn hole_overlapping_a_bump() {
    // A 4x4 square with a 1x1 hole, and another square poking into the hole.
    let mut hole = square(1.0, 1.0, 1.0);
    hole.reverse();
    let set = ContourSet::from_polygons([square(0.0, 0.0, 4.0), hole, rect(1.5, 1.5, 4.0, 4.0)]);
    let out = union(&set);
    // The bump fills the upper-right quarter of the hole. The two squares
    // together cover 16 + 16 - 2.5 * 2.5, and the rest of the hole is empty.
    assert_close(out.signed_area(), 25.75 - 0.75);
}

#[test]
fn shared_edges_stay() {
    let set = ContourSet::from_polygons([square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]);
    let out = union(&set);
    assert_eq!(out.len(), 2);
    assert_close(out.signed_area(), 2.0);
}

#[test]
fn spurs_are_removed() {
    let set = ContourSet::from_polygons([vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 0.5),
        (1.5, 0.5),
        (1.0, 0.5),
        (1.0, 1.0),
        (0.0, 1.0),
    ]]);
    let out = union(&set);
    assert_eq!(out.len(), 1);
    assert_eq!(out.contours()[0].len(), 5);
    assert_close(out.signed_area(), 1.0);

    // An inward spur is a seam with filled space on both sides.
    let set = ContourSet::from_polygons([vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 0.5),
        (0.5, 0.5),
        (1.0, 0.5),
        (1.0, 1.0),
        (0.0, 1.0),
    ]]);
    let out = union(&set);
    assert_eq!(out.len(), 1);
    assert_eq!(out.contours()[0].len(), 5);
    assert_close(out.signed_area(), 1.0);
}

#[test]
fn even_odd_xor() {
    let set = ContourSet::from_polygons([square(0.0, 0.0, 1.0), square(0.5, 0.5, 1.0)]);
    let out = remove_overlap(&set, &Options::with_fill_rule(FillRule::EvenOdd)).unwrap();
    assert_eq!(out.contours.len(), 2);
    assert_close(out.contours.signed_area(), 1.5);
}

#[test]
fn bow_tie() {
    let set = ContourSet::from_polygons([vec![(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]]);
    let out = union(&set);
    assert_eq!(out.len(), 2);
    for c in out.iter() {
        assert_close(c.signed_area(), 1.0);
        assert_eq!(c.len(), 3);
    }
}

#[test]
fn duplicated_circle() {
    let circle = kurbo::Circle::new((0.0, 0.0), 10.0).to_path(1e-3);
    let one = ContourSet::from_bez_path(&circle).unwrap();
    let mut doubled = circle.clone();
    doubled.extend(circle.elements().iter().copied());
    let two = ContourSet::from_bez_path(&doubled).unwrap();
    assert_eq!(two.len(), 2);

    let out = union(&two);
    assert_eq!(out.len(), 1);
    assert!((out.signed_area() - one.signed_area()).abs() < 1e-6);

    let out = remove_overlap(&two, &Options::with_fill_rule(FillRule::EvenOdd)).unwrap();
    assert!(out.contours.is_empty());
}

#[test]
fn overlapping_circles() {
    let a = kurbo::Circle::new((0.0, 0.0), 10.0).to_path(1e-3);
    let b = kurbo::Circle::new((10.0, 0.0), 10.0).to_path(1e-3);
    let mut path = a.clone();
    path.extend(b.elements().iter().copied());
    let set = ContourSet::from_bez_path(&path).unwrap();
    let single = ContourSet::from_bez_path(&a).unwrap().signed_area();

    let out = remove_overlap(&set, &Options::default()).unwrap();
    assert_eq!(out.contours.len(), 1);
    let union_area = out.contours.signed_area();

    let intersect = Options {
        mode: Mode::Intersect,
        ..Options::default()
    };
    let out = remove_overlap(&set, &intersect).unwrap();
    assert_eq!(out.contours.len(), 1);
    let lens_area = out.contours.signed_area();

    // The lens between two circles whose centers are one radius apart.
    let r: f64 = 10.0;
    let expected_lens = r * r * (2.0 * std::f64::consts::PI / 3.0 - 3.0f64.sqrt() / 2.0);
    assert!((lens_area - expected_lens).abs() < 0.01 * expected_lens);
    assert!((union_area + lens_area - 2.0 * single).abs() < 1e-6);
}

#[test]
fn overlap_removal_is_idempotent() {
    // A 3x3 grid of squares, with a 2x2 grid on top that overlaps their corners.
    let mut squares = Vec::new();
    for i in 0..3 {
        for j in 0..3 {
            squares.push(square(40.0 * i as f64, 40.0 * j as f64, 30.0));
            if i < 2 && j < 2 {
                squares.push(square(20.0 + 40.0 * i as f64, 20.0 + 40.0 * j as f64, 30.0));
            }
        }
    }
    let set = ContourSet::from_polygons(squares);
    let once = union(&set);
    assert_eq!(once, union(&once));

    let a = kurbo::Circle::new((0.0, 0.0), 10.0).to_path(1e-3);
    let b = kurbo::Circle::new((10.0, 0.0), 10.0).to_path(1e-3);
    let mut path = a.clone();
    path.extend(b.elements().iter().copied());
    let once = union(&ContourSet::from_bez_path(&path).unwrap());
    assert_eq!(once, union(&once));
}

#[test]
fn touching_circles_stay_apart() {
    let a = kurbo::Circle::new((0.0, 0.0), 10.0).to_path(1e-3);
    let b = kurbo::Circle::new((20.0, 0.0), 10.0).to_path(1e-3);
    let single = ContourSet::from_bez_path(&a).unwrap().signed_area();
    let mut path = a.clone();
    path.extend(b.elements().iter().copied());
    let set = ContourSet::from_bez_path(&path).unwrap();

    let out = union(&set);
    assert_eq!(out.len(), 2);
    assert!((out.signed_area() - 2.0 * single).abs() < 1e-6);
}

#[test]
fn clockwise_output() {
    let set = ContourSet::from_polygons([square(0.0, 0.0, 1.0), square(0.5, 0.5, 1.0)]);
    let options = Options {
        orientation: Orientation::Clockwise,
        ..Options::default()
    };
    let out = remove_overlap(&set, &options).unwrap();
    assert_close(out.contours.signed_area(), -1.75);
}

#[test]
fn zero_length_segments_warn() {
    let set = ContourSet::from_polygons([vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 0.0),
        (1.0, 1.0),
        (0.0, 1.0),
    ]]);
    let out = remove_overlap(&set, &Options::default()).unwrap();
    assert_eq!(
        out.warnings,
        vec![Warning::ZeroLengthSegments {
            contour: 0,
            count: 1
        }]
    );
    assert_eq!(out.contours.contours()[0].len(), 4);
}

#[test]
fn explicit_tolerances() {
    // Two squares that almost touch. With a coarse tolerance, their corners snap together.
    let set = ContourSet::from_polygons([square(0.0, 0.0, 1.0), square(1.001, 1.001, 1.0)]);
    let coarse = Options {
        tolerances: Some(Tolerances {
            position: 0.01,
            ..Tolerances::default()
        }),
        ..Options::default()
    };
    let out = remove_overlap(&set, &coarse).unwrap();
    assert_eq!(out.contours.len(), 2);
    let corners: Vec<Point> = out.contours.iter().flat_map(Contour::vertices).collect();
    let snapped = corners
        .iter()
        .filter(|p| (**p - Point::new(1.0, 1.0)).hypot() < 0.01)
        .count();
    assert_eq!(snapped, 2);
}

/// The area covered by a bunch of integer rectangles, by counting unit cells.
fn raster_area(rects: &[(i32, i32, i32, i32)], inside: impl Fn(usize) -> bool) -> f64 {
    let mut count = 0;
    for x in 0..20 {
        for y in 0..20 {
            let covering = rects
                .iter()
                .filter(|&&(x0, y0, w, h)| x0 <= x && x < x0 + w && y0 <= y && y < y0 + h)
                .count();
            if inside(covering) {
                count += 1;
            }
        }
    }
    count as f64
}

fn integer_rects() -> impl Strategy<Value = Vec<(i32, i32, i32, i32)>> {
    prop::collection::vec((0..10i32, 0..10i32, 1..10i32, 1..10i32), 1..4)
}

proptest! {
    #[test]
    fn rectangles_match_rasterization(rects in integer_rects()) {
        let set = ContourSet::from_polygons(rects.iter().map(|&(x, y, w, h)| {
            rect(x as f64, y as f64, w as f64, h as f64)
        }));

        let out = remove_overlap(&set, &Options::default()).unwrap();
        prop_assert!((out.contours.signed_area() - raster_area(&rects, |n| n > 0)).abs() < 1e-9);

        let out = remove_overlap(&set, &Options::with_fill_rule(FillRule::EvenOdd)).unwrap();
        prop_assert!((out.contours.signed_area() - raster_area(&rects, |n| n % 2 == 1)).abs() < 1e-9);
    }

    #[test]
    fn union_plus_intersection(a in (0..10i32, 0..10i32, 1..10i32, 1..10i32), b in (0..10i32, 0..10i32, 1..10i32, 1..10i32)) {
        let rects = [a, b];
        let set = ContourSet::from_polygons(rects.iter().map(|&(x, y, w, h)| {
            rect(x as f64, y as f64, w as f64, h as f64)
        }));
        let union_area = union(&set).signed_area();
        let intersect = Options { mode: Mode::Intersect, ..Options::default() };
        let intersection_area = remove_overlap(&set, &intersect).unwrap().contours.signed_area();
        let total = (a.2 * a.3 + b.2 * b.3) as f64;
        prop_assert!((union_area + intersection_area - total).abs() < 1e-9);
    }

    #[test]
    fn output_has_no_overlaps(rects in integer_rects()) {
        let set = ContourSet::from_polygons(rects.iter().map(|&(x, y, w, h)| {
            rect(x as f64, y as f64, w as f64, h as f64)
        }));
        let once = union(&set);
        // Every point of the output is covered exactly once, so even-odd and
        // non-zero agree on it.
        let even_odd = remove_overlap(&once, &Options::with_fill_rule(FillRule::EvenOdd)).unwrap();
        prop_assert!((even_odd.contours.signed_area() - once.signed_area()).abs() < 1e-9);
    }
}
