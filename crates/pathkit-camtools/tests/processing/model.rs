use pathkit_camtools::{
    Bindings, Defaults, Level, ModelBuilder, PathLayer, PathLibrary, RawSegment, SegmentKind,
};
use pathkit_core::{Diagnostics, GCodeKind, Geometry, Line, PathName, Point2};

fn p(x: f64, y: f64) -> Point2 {
    Point2::new(x, y)
}

fn line(a: Point2, b: Point2) -> RawSegment {
    RawSegment::new(SegmentKind::Chain {
        geometry: Geometry::Line(Line::new(a, b)),
        mark: false,
    })
}

fn sub_path(a: Point2, b: Point2, target: &str) -> RawSegment {
    RawSegment::new(SegmentKind::SubPath {
        start: a,
        end: b,
        target: PathName::new(target),
    })
}

fn slot() -> PathLayer {
    PathLayer::new("Slot")
        .with_param('T', "0")
        .with_param('B', "$B")
        .with_start(p(0.0, 0.0))
        .with_end(p(10.0, 0.0))
        .with_segment(line(p(0.0, 0.0), p(10.0, 0.0)))
}

fn compile(layers: Vec<PathLayer>) -> (Vec<String>, Vec<String>) {
    let mut diags = Diagnostics::silent();
    let library = PathLibrary::new(Defaults::default(), layers, &mut diags);
    let programs = ModelBuilder::new(&library, &mut diags).compile_all();
    (
        programs.iter().map(|program| program.to_text()).collect(),
        diags.texts(),
    )
}

#[test]
fn test_simple_program_framing() {
    let square = PathLayer::new("Square")
        .with_param('T', "0")
        .with_param('B', "-1")
        .with_start(p(0.0, 0.0))
        .with_end(p(0.0, 0.0))
        .with_segment(line(p(0.0, 0.0), p(10.0, 0.0)))
        .with_segment(line(p(10.0, 0.0), p(10.0, 10.0)))
        .with_segment(line(p(10.0, 10.0), p(0.0, 10.0)))
        .with_segment(line(p(0.0, 10.0), p(0.0, 0.0)));

    let (programs, diags) = compile(vec![square]);
    assert!(diags.is_empty(), "{:?}", diags);
    assert_eq!(programs.len(), 1);
    let text = &programs[0];
    assert!(text.starts_with("; path Square\n"));
    assert!(text.contains("G21 G90\nG00 Z10.000\n"));
    assert!(text.contains("G01 X10.000 Y10.000 Z-1.000 F600.0"));
    assert!(text.ends_with("G00 Z10.000\nM30\n"));
}

#[test]
fn test_sub_path_is_placed_and_bound() {
    let main = PathLayer::new("Main")
        .with_param('T', "0")
        .with_start(p(0.0, 0.0))
        .with_end(p(0.0, 30.0))
        .with_segment(sub_path(p(0.0, 0.0), p(0.0, 10.0), "Slot").with_param('B', "-1"))
        .with_segment(line(p(0.0, 10.0), p(0.0, 20.0)).with_param('B', "-3"))
        .with_segment(sub_path(p(0.0, 20.0), p(0.0, 30.0), "Slot").with_param('B', "-2"));

    let (programs, diags) = compile(vec![slot(), main]);
    assert!(diags.is_empty(), "{:?}", diags);
    // Slot is only used as a part, so only Main gets a program
    assert_eq!(programs.len(), 1);
    let text = &programs[0];
    assert!(text.contains("; sub-path Slot"));
    assert!(text.contains("G01 X0.000 Y10.000 Z-1.000 F600.0"));
    assert!(text.contains("G01 X0.000 Y20.000 Z-3.000 F600.0"));
    assert!(text.contains("G01 X0.000 Y30.000 Z-2.000 F600.0"));
}

#[test]
fn test_sub_path_span_must_match() {
    let main = PathLayer::new("Main")
        .with_start(p(0.0, 0.0))
        .with_end(p(0.0, 12.0))
        .with_segment(sub_path(p(0.0, 0.0), p(0.0, 12.0), "Slot").with_param('B', "-1"));

    let (programs, diags) = compile(vec![slot(), main]);
    assert!(programs.is_empty());
    assert_eq!(diags.len(), 1);
    assert!(diags[0].contains("sub-path Slot does not fit"));
    assert!(diags[0].contains("drawn 10.000 mm, placed 12.000 mm"));
}

#[test]
fn test_unbound_variable_is_reported() {
    let main = PathLayer::new("Main")
        .with_start(p(0.0, 0.0))
        .with_end(p(10.0, 0.0))
        .with_segment(sub_path(p(0.0, 0.0), p(10.0, 0.0), "Slot"));

    let (_, diags) = compile(vec![slot(), main]);
    assert!(diags.iter().any(|d| d.ends_with("Variable '$B' is not bound")));
}

#[test]
fn test_cycles_are_diagnosed() {
    let a = PathLayer::new("A")
        .with_start(p(0.0, 0.0))
        .with_end(p(5.0, 0.0))
        .with_segment(sub_path(p(0.0, 0.0), p(5.0, 0.0), "B"));
    let b = PathLayer::new("B")
        .with_start(p(0.0, 0.0))
        .with_end(p(5.0, 0.0))
        .with_segment(sub_path(p(0.0, 0.0), p(5.0, 0.0), "A"));

    let mut diags = Diagnostics::silent();
    let library = PathLibrary::new(Defaults::default(), vec![a, b], &mut diags);
    assert!(library.roots().is_empty());
    let model = ModelBuilder::new(&library, &mut diags).build(&PathName::new("A"), &Bindings::new());
    assert!(model.is_none());
    assert!(diags
        .texts()
        .contains(&"path A: sub-path cycle: A -> B -> A".to_string()));
}

#[test]
fn test_undefined_sub_path() {
    let main = PathLayer::new("Main")
        .with_start(p(0.0, 0.0))
        .with_end(p(5.0, 0.0))
        .with_segment(sub_path(p(0.0, 0.0), p(5.0, 0.0), "Nowhere"));
    let (programs, diags) = compile(vec![main]);
    assert!(programs.is_empty());
    assert_eq!(diags, vec!["path Nowhere: undefined path".to_string()]);
}

#[test]
fn test_models_are_shared_per_binding() {
    let mut diags = Diagnostics::silent();
    let library = PathLibrary::new(Defaults::default(), vec![slot()], &mut diags);
    let mut builder = ModelBuilder::new(&library, &mut diags);
    let one: Bindings = [('B', "-1".to_string())].into_iter().collect();
    let two: Bindings = [('B', "-2".to_string())].into_iter().collect();

    let a = builder.build(&PathName::new("Slot"), &one).unwrap();
    let b = builder.build(&PathName::new("Slot.1"), &one).unwrap();
    let c = builder.build(&PathName::new("Slot"), &two).unwrap();
    assert!(std::rc::Rc::ptr_eq(&a, &b));
    assert!(!std::rc::Rc::ptr_eq(&a, &c));
}

#[test]
fn test_anchor_problems() {
    let none = PathLayer::new("None").with_segment(line(p(0.0, 0.0), p(1.0, 0.0)));
    let twice = PathLayer::new("Twice")
        .with_start(p(0.0, 0.0))
        .with_start(p(1.0, 0.0))
        .with_end(p(1.0, 0.0));
    let (programs, diags) = compile(vec![none, twice]);
    assert!(programs.is_empty());
    assert!(diags.contains(&"path None: no start mark".to_string()));
    assert!(diags.contains(&"path None: no end mark".to_string()));
    assert!(diags.contains(&"path Twice: 2 start marks, expected one".to_string()));
}

#[test]
fn test_duplicate_path_names() {
    let (_, diags) = compile(vec![slot(), PathLayer::new("slot.2")]);
    assert!(diags.contains(&"path slot.2: path defined more than once".to_string()));
}

#[test]
fn test_drill_helix_and_sweep() {
    let layer = PathLayer::new("Holes")
        .with_param('T', "0")
        .with_param('B', "-4")
        .with_level_param(Level::Sweep, 'R', "2000")
        .with_start(p(0.0, 0.0))
        .with_end(p(20.0, 0.0))
        .with_segment(RawSegment::new(SegmentKind::Drill {
            center: p(0.0, 0.0),
            mark: false,
        }))
        .with_segment(RawSegment::new(SegmentKind::Sweep {
            start: p(0.0, 0.0),
            end: p(20.0, 0.0),
        }))
        .with_segment(
            RawSegment::new(SegmentKind::Helix {
                center: p(20.0, 0.0),
                radius: 4.0,
                mark: false,
            })
            .with_param('I', "2"),
        );

    let mut diags = Diagnostics::silent();
    let library = PathLibrary::new(Defaults::default(), vec![layer], &mut diags);
    let programs = ModelBuilder::new(&library, &mut diags).compile_all();
    assert!(!diags.has_errors(), "{:?}", diags.texts());

    let program = &programs[0];
    let text = program.to_text();
    assert!(text.contains("G01 Z-4.000 F600.0"));
    // The helix moves on to its own start, so the sweep to its center is dead
    assert!(text.contains("; G01 X20.000 Y0.000 F2000.0\n"));
    assert!(text.contains("\nG00 X22.500 Y0.000\n"));
    // Bit radius 1.5 leaves a 2.5 mm path radius
    assert!(text.contains("G02 X22.500 Y0.000 Z-2.000 I-2.500 J0.000 F600.0"));

    let stats = &program.statistics;
    assert_eq!(stats.drill_length, 4.0);
    assert!(stats.mill_length > 0.0);
    assert!(!program
        .codes
        .iter()
        .any(|c| c.kind == GCodeKind::HorizontalTravel && c.feed == Some(2000.0)));
}

#[test]
fn test_travel_superseded_by_sweep() {
    let layer = PathLayer::new("Strips")
        .with_param('T', "0")
        .with_param('B', "-2")
        .with_param('I', "1")
        .with_start(p(0.0, 0.0))
        .with_end(p(30.0, 0.0))
        .with_segment(line(p(0.0, 0.0), p(10.0, 0.0)))
        .with_segment(RawSegment::new(SegmentKind::Sweep {
            start: p(10.0, 0.0),
            end: p(20.0, 0.0),
        }))
        .with_segment(line(p(20.0, 0.0), p(30.0, 0.0)));

    let (programs, diags) = compile(vec![layer]);
    assert!(diags.is_empty(), "{:?}", diags);
    let text = &programs[0];
    // The two layers end back at the start; the chain end move is dead
    assert!(text.contains("G00 Z10.000\n; G00 X10.000 Y0.000\nG01 X20.000 Y0.000 F3000.0\n"));
}

#[test]
fn test_rapids_into_material_follow_bed_correction() {
    let layer = PathLayer::new("Pegs")
        .with_param('T', "0")
        .with_param('B', "-4")
        .with_param('Z', "0")
        .with_start(p(0.0, 0.0))
        .with_end(p(0.0, 0.0))
        .with_segment(
            RawSegment::new(SegmentKind::Drill {
                center: p(0.0, 0.0),
                mark: false,
            })
            .with_param('I', "2"),
        )
        .with_segment(RawSegment::new(SegmentKind::ZProbe { position: p(5.0, 0.0) }));

    let (programs, diags) = compile(vec![layer]);
    assert!(diags.is_empty(), "{:?}", diags);
    let text = &programs[0];
    assert!(text.contains("G00 Z[0.000+1.0000*[#1000-0.000]]\n"));
    assert!(text.contains("G00 Z[-1.500+1.0000*[#1000-0.000]]\n"));
    assert!(text.contains("G01 Z[-4.000+1.0000*[#1000-0.000]] F600.0"));

    // Only the safe height is written without correction
    for rapid in text.lines().filter(|l| l.starts_with("G00 Z")) {
        assert!(rapid == "G00 Z10.000" || rapid.contains('['), "{}", rapid);
    }
}

#[test]
fn test_narrow_helix_warns() {
    let layer = PathLayer::new("H")
        .with_param('T', "0")
        .with_param('B', "-2")
        .with_start(p(0.0, 0.0))
        .with_end(p(0.0, 0.0))
        .with_segment(RawSegment::new(SegmentKind::Helix {
            center: p(0.0, 0.0),
            radius: 1.0,
            mark: false,
        }));
    let mut diags = Diagnostics::silent();
    let library = PathLibrary::new(Defaults::default(), vec![layer], &mut diags);
    let programs = ModelBuilder::new(&library, &mut diags).compile_all();
    assert_eq!(programs.len(), 1);
    assert!(!diags.has_errors());
    assert_eq!(
        diags.texts(),
        vec!["path H, Helix at (0.000, 0.000): helix radius 1.000 is not larger than the bit radius 1.500, drilling instead".to_string()]
    );
}

#[test]
fn test_bed_probes_compensate_heights() {
    let layer = PathLayer::new("Flat")
        .with_param('T', "0")
        .with_param('B', "-1")
        .with_param('Z', "0")
        .with_start(p(0.0, 0.0))
        .with_end(p(10.0, 0.0))
        .with_segment(line(p(0.0, 0.0), p(10.0, 0.0)))
        .with_segment(RawSegment::new(SegmentKind::ZProbe { position: p(10.0, 0.0) }));

    let mut diags = Diagnostics::silent();
    let library = PathLibrary::new(Defaults::default(), vec![layer], &mut diags);
    let mut builder = ModelBuilder::new(&library, &mut diags);
    let model = builder.build(&PathName::new("Flat"), &Bindings::new()).unwrap();
    assert_eq!(model.probes.len(), 1);

    let text = model.generate().unwrap().to_text();
    assert!(text.contains("G01 X10.000 Y0.000 Z[-1.000+1.0000*[#1000-0.000]] F600.0"));

    let probing = model.probing_program().unwrap().unwrap().to_text();
    assert!(probing.contains("G38.2 Z-5.000 F600.0"));
    assert!(probing.contains("#1000=#5063"));
    assert_eq!(model.nominal_heights(), "#1000=0.000\n");
}

#[test]
fn test_sub_path_probes_move_with_placement() {
    let part = PathLayer::new("Part")
        .with_param('T', "0")
        .with_param('B', "-1")
        .with_start(p(0.0, 0.0))
        .with_end(p(10.0, 0.0))
        .with_segment(line(p(0.0, 0.0), p(10.0, 0.0)))
        .with_segment(RawSegment::new(SegmentKind::ZProbe { position: p(5.0, 0.0) }).with_param('Z', "0.5"));
    let main = PathLayer::new("Main")
        .with_start(p(0.0, 0.0))
        .with_end(p(0.0, 10.0))
        .with_segment(sub_path(p(0.0, 0.0), p(0.0, 10.0), "Part"));

    let mut diags = Diagnostics::silent();
    let library = PathLibrary::new(Defaults::default(), vec![part, main], &mut diags);
    let model = ModelBuilder::new(&library, &mut diags)
        .build(&PathName::new("Main"), &Bindings::new())
        .unwrap();
    assert_eq!(model.probes.len(), 1);
    assert!(model.probes[0].position.coincides(&p(0.0, 5.0)));
    assert_eq!(model.probes[0].target_height, 0.5);
}

#[test]
fn test_layer_from_json() {
    let json = r#"{
        "name": "Lid",
        "params": {"T": "0", "B": "-6"},
        "level_params": {"mill": {"F": "450"}, "back_sweep": {"R": "1000"}},
        "anchors": [
            {"kind": "start", "position": {"x": 0, "y": 0}},
            {"kind": "end", "position": {"x": 10, "y": 0}}
        ],
        "segments": [
            {"type": "chain", "geometry": {"type": "line", "start": {"x": 0, "y": 0}, "end": {"x": 10, "y": 0}}}
        ]
    }"#;
    let layer: PathLayer = serde_json::from_str(json).unwrap();
    assert_eq!(layer.name, PathName::new("lid"));
    assert_eq!(layer.level_params.len(), 2);
    assert!(layer.level_params.contains_key(&Level::BackSweep));

    let (programs, diags) = compile(vec![layer]);
    assert!(diags.is_empty(), "{:?}", diags);
    assert!(programs[0].contains("G01 X10.000 Y0.000 Z-6.000 F450.0"));
}
