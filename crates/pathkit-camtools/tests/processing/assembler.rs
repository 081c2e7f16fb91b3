use pathkit_camtools::{assemble, RawSegment, SegmentKind};
use pathkit_core::{Diagnostics, Geometry, Line, PathName, Point2};

fn p(x: f64, y: f64) -> Point2 {
    Point2::new(x, y)
}

fn line(a: Point2, b: Point2) -> RawSegment {
    RawSegment::new(SegmentKind::Chain {
        geometry: Geometry::Line(Line::new(a, b)),
        mark: false,
    })
}

fn drill(at: Point2) -> RawSegment {
    RawSegment::new(SegmentKind::Drill {
        center: at,
        mark: false,
    })
}

fn route(segments: &[RawSegment]) -> Vec<(String, Point2, Point2)> {
    segments
        .iter()
        .map(|s| (s.kind_name().to_string(), s.start(), s.end()))
        .collect()
}

#[test]
fn test_drill_wins_over_line_at_branch() {
    let mut diags = Diagnostics::silent();
    let result = assemble(
        &PathName::new("A"),
        vec![
            line(p(10.0, 0.0), p(20.0, 0.0)),
            line(p(0.0, 0.0), p(10.0, 0.0)),
            drill(p(10.0, 0.0)),
        ],
        p(0.0, 0.0),
        p(20.0, 0.0),
        &mut diags,
    );
    assert!(result.complete);
    let kinds: Vec<_> = result.segments.iter().map(|s| s.kind_name()).collect();
    assert_eq!(kinds, vec!["Line", "Drill", "Line"]);
}

#[test]
fn test_shorter_candidate_first_and_deterministic() {
    let rectangle = vec![
        line(p(0.0, 0.0), p(10.0, 0.0)),
        line(p(10.0, 0.0), p(10.0, 5.0)),
        line(p(0.0, 5.0), p(10.0, 5.0)),
        line(p(0.0, 0.0), p(0.0, 5.0)),
    ];
    let mut reordered = rectangle.clone();
    reordered.reverse();
    reordered.swap(0, 2);

    let mut diags = Diagnostics::silent();
    let a = assemble(&PathName::new("R"), rectangle, p(0.0, 0.0), p(0.0, 0.0), &mut diags);
    let b = assemble(&PathName::new("R"), reordered, p(0.0, 0.0), p(0.0, 0.0), &mut diags);

    assert!(!diags.has_errors());
    assert_eq!(route(&a.segments), route(&b.segments));
    assert_eq!(
        route(&a.segments),
        vec![
            ("Line".to_string(), p(0.0, 0.0), p(0.0, 5.0)),
            ("Line".to_string(), p(0.0, 5.0), p(10.0, 5.0)),
            ("Line".to_string(), p(10.0, 5.0), p(10.0, 0.0)),
            ("Line".to_string(), p(10.0, 0.0), p(0.0, 0.0)),
        ]
    );
}

#[test]
fn test_explicit_order_overrides_preference() {
    let mut diags = Diagnostics::silent();
    let result = assemble(
        &PathName::new("A"),
        vec![
            drill(p(0.0, 0.0)),
            line(p(0.0, 0.0), p(5.0, 0.0)).with_order(1),
            drill(p(5.0, 0.0)).with_order(0),
        ],
        p(0.0, 0.0),
        p(5.0, 0.0),
        &mut diags,
    );
    // The ordered line leaves the unordered drill behind
    assert_eq!(result.segments[0].kind_name(), "Line");
    assert_eq!(
        diags.texts(),
        vec!["path A: 1 segments unreached".to_string()]
    );
    assert!(!result.complete);
}

#[test]
fn test_dead_end_is_reported_at_last_segment() {
    let mut diags = Diagnostics::silent();
    let result = assemble(
        &PathName::new("A"),
        vec![
            line(p(0.0, 0.0), p(5.0, 0.0)),
            line(p(20.0, 0.0), p(30.0, 0.0)),
        ],
        p(0.0, 0.0),
        p(30.0, 0.0),
        &mut diags,
    );
    assert!(!result.complete);
    assert_eq!(result.segments.len(), 1);
    assert_eq!(
        diags.texts(),
        vec![
            "path A, Line at (0.000, 0.000): no further segment found at (5.000, 0.000)".to_string(),
            "path A, Line at (0.000, 0.000): lost end: route stops at (5.000, 0.000), end is at (30.000, 0.000)"
                .to_string(),
        ]
    );
}

#[test]
fn test_lost_end() {
    let mut diags = Diagnostics::silent();
    let result = assemble(
        &PathName::new("A"),
        vec![line(p(0.0, 0.0), p(5.0, 0.0))],
        p(0.0, 0.0),
        p(9.0, 0.0),
        &mut diags,
    );
    assert!(!result.complete);
    assert_eq!(
        diags.texts(),
        vec![
            "path A, Line at (0.000, 0.000): lost end: route stops at (5.000, 0.000), end is at (9.000, 0.000)"
                .to_string()
        ]
    );
}

#[test]
fn test_probes_are_not_part_of_the_route() {
    let mut diags = Diagnostics::silent();
    let result = assemble(
        &PathName::new("A"),
        vec![
            RawSegment::new(SegmentKind::ZProbe {
                position: p(50.0, 50.0),
            }),
            line(p(0.0, 0.0), p(5.0, 0.0)),
        ],
        p(0.0, 0.0),
        p(5.0, 0.0),
        &mut diags,
    );
    assert!(result.complete);
    assert_eq!(result.segments.len(), 1);
    assert_eq!(result.probes.len(), 1);
}

#[test]
fn test_every_placed_segment_starts_at_cursor() {
    let mut diags = Diagnostics::silent();
    let result = assemble(
        &PathName::new("Z"),
        vec![
            line(p(3.0, 4.0), p(0.0, 0.0)),
            line(p(6.0, 0.0), p(3.0, 4.0)),
            line(p(6.0, 0.0), p(9.0, 4.0)),
        ],
        p(0.0, 0.0),
        p(9.0, 4.0),
        &mut diags,
    );
    assert!(result.complete);
    let mut cursor = p(0.0, 0.0);
    for segment in &result.segments {
        assert!(segment.start().coincides(&cursor));
        cursor = segment.end();
    }
    assert!(cursor.coincides(&p(9.0, 4.0)));
}
