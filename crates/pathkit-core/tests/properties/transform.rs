use pathkit_core::{Point2, Transformation2};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Point2> {
    (-200.0..200.0f64, -200.0..200.0f64).prop_map(|(x, y)| Point2::new(x, y))
}

#[test]
fn test_right_angle_maps_unit_vector_to_perpendicular() {
    let t = Transformation2::from_anchors(
        Point2::new(2.0, 3.0),
        Point2::new(3.0, 3.0),
        Point2::new(-1.0, 0.0),
        Point2::new(-1.0, 1.0),
    )
    .unwrap();
    let a = t.apply(Point2::new(2.0, 3.0));
    let b = t.apply(Point2::new(3.0, 3.0));
    assert!((b.x - a.x).abs() < 1e-7);
    assert!((b.y - a.y - 1.0).abs() < 1e-7);
}

proptest! {
    #[test]
    fn prop_identity_anchors_fix_every_point(a in point(), b in point(), p in point()) {
        let t = Transformation2::from_anchors(a, b, a, b).unwrap();
        prop_assert!(t.apply(p).distance_to(&p) < 1e-7);
    }

    #[test]
    fn prop_placement_preserves_distances(
        angle in -360.0..360.0f64,
        offset in point(),
        a in point(),
        b in point(),
        p in point(),
        q in point(),
    ) {
        let rigid = Transformation2::rotation_translation(angle, offset);
        let t = Transformation2::from_anchors(a, b, rigid.apply(a), rigid.apply(b)).unwrap();
        let before = p.distance_to(&q);
        let after = t.apply(p).distance_to(&t.apply(q));
        prop_assert!((before - after).abs() < 1e-6);
        prop_assert!(t.apply(a).distance_to(&rigid.apply(a)) < 1e-6);
    }
}
