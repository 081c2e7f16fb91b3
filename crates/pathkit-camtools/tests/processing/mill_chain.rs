use pathkit_camtools::{ChainSegment, Defaults, Field, Level, MillChain, Overlay, ParamsChain};
use pathkit_core::{
    DiagContext, GCodeKind, GCodeWriter, Geometry, Line, Point2, Point3, Transformation2,
    Transformation3,
};

fn params(values: &[(Field, f64)]) -> ParamsChain {
    let overlay = values.iter().fold(
        Overlay::empty(Level::Path, DiagContext::default()),
        |o, (field, value)| o.with_value(*field, *value),
    );
    ParamsChain::root(&Defaults::default()).push(overlay)
}

fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry {
    Geometry::Line(Line::new(Point2::new(x0, y0), Point2::new(x1, y1)))
}

fn word(text: &str, letter: char) -> Option<f64> {
    text.split_whitespace()
        .find_map(|w| w.strip_prefix(letter))
        .and_then(|v| v.parse().ok())
}

/// Depth of every cut, keyed by the cut's endpoints, in program order.
fn cut_depths(out: &GCodeWriter, start: Point2) -> Vec<((i64, i64, i64, i64), f64)> {
    let key = |p: Point2| ((p.x * 1000.0).round() as i64, (p.y * 1000.0).round() as i64);
    let mut at = start;
    let mut depths = Vec::new();
    for code in out.codes() {
        let (Some(x), Some(y)) = (word(&code.text, 'X'), word(&code.text, 'Y')) else {
            continue;
        };
        let to = Point2::new(x, y);
        if code.kind == GCodeKind::Mill {
            let (a, b) = (key(at), key(to));
            let (a, b) = if a <= b { (a, b) } else { (b, a) };
            depths.push(((a.0, a.1, b.0, b.1), word(&code.text, 'Z').unwrap()));
        }
        at = to;
    }
    depths
}

#[test]
fn test_layers_stop_at_bottom() {
    let chain_params = params(&[(Field::Top, 5.0), (Field::Bottom, 0.0), (Field::Step, 2.0)]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 10.0, 0.0),
        mark: false,
        params: &chain_params,
    }]);
    let edges = chain.edges().unwrap();
    let depths: Vec<_> = edges.iter().map(|e| e.z_start).collect();
    assert_eq!(depths, vec![3.0, 1.0, 0.0]);
    let above: Vec<_> = edges.iter().map(|e| e.above).collect();
    assert_eq!(above, vec![None, Some(0), Some(1)]);
}

#[test]
fn test_support_bridges_raise_the_floor() {
    let chain_params = params(&[
        (Field::Top, 0.0),
        (Field::Bottom, -3.0),
        (Field::BarMargin, 2.0),
        (Field::BarWidth, 5.0),
        (Field::BarRun, 20.0),
        (Field::BarRamp, 1.0),
        (Field::BarHeight, 1.0),
    ]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 25.0, 0.0),
        mark: false,
        params: &chain_params,
    }]);
    let floors: Vec<_> = chain
        .edges()
        .unwrap()
        .iter()
        .map(|e| (e.z_start, e.z_end))
        .collect();
    assert_eq!(
        floors,
        vec![(-3.0, -3.0), (-3.0, -2.0), (-2.0, -2.0), (-2.0, -3.0), (-3.0, -3.0)]
    );
}

#[test]
fn test_bridges_with_layers() {
    let chain_params = params(&[
        (Field::Top, 0.0),
        (Field::Bottom, -3.0),
        (Field::Step, 1.5),
        (Field::BarWidth, 5.0),
        (Field::BarRun, 20.0),
        (Field::BarRamp, 1.0),
        (Field::BarHeight, 1.0),
    ]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 25.0, 0.0),
        mark: false,
        params: &chain_params,
    }]);
    let edges = chain.edges().unwrap();
    assert_eq!(edges.len(), 10);
    // Every second edge of a piece lies under the first one
    for pair in edges.chunks(2) {
        assert_eq!(pair[0].above, None);
        assert_eq!(pair[0].z_start, -1.5);
        assert!(pair[1].above.is_some());
    }
}

#[test]
fn test_mark_cuts_have_no_bridges() {
    let chain_params = params(&[
        (Field::Top, 0.0),
        (Field::Bottom, -0.5),
        (Field::BarWidth, 5.0),
        (Field::BarRun, 20.0),
        (Field::BarHeight, 0.2),
    ]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 60.0, 0.0),
        mark: true,
        params: &chain_params,
    }]);
    assert_eq!(chain.edges().unwrap().len(), 1);
}

#[test]
fn test_missing_bottom_is_an_error() {
    let chain_params = params(&[(Field::Top, 0.0)]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 10.0, 0.0),
        mark: false,
        params: &chain_params,
    }]);
    let err = chain.edges().unwrap_err();
    assert!(err.to_string().contains("Bottom is not set"));
}

#[test]
fn test_tour_goes_back_and_forth() {
    let chain_params = params(&[(Field::Top, 0.0), (Field::Bottom, -2.0), (Field::Step, 1.0)]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 10.0, 0.0),
        mark: false,
        params: &chain_params,
    }]);
    let mut out = GCodeWriter::new(Point3::new(0.0, 0.0, 10.0));
    chain.emit(&mut out, &Transformation3::default()).unwrap();

    let texts: Vec<_> = out.codes().iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "G00 Z0.000",
            "G01 Z-1.000 F600.0",
            "G01 X10.000 Y0.000 Z-1.000 F600.0",
            "G01 Z-2.000 F600.0",
            "G01 X0.000 Y0.000 Z-2.000 F600.0",
            "G00 Z10.000",
            "G00 X10.000 Y0.000",
        ]
    );
}

#[test]
fn test_layer_above_is_always_cut_first() {
    // Two cuts meeting at a corner, three layers each
    let chain_params = params(&[(Field::Top, 0.0), (Field::Bottom, -3.0), (Field::Step, 1.0)]);
    let chain = MillChain::new(vec![
        ChainSegment {
            geometry: line(0.0, 0.0, 10.0, 0.0),
            mark: false,
            params: &chain_params,
        },
        ChainSegment {
            geometry: line(10.0, 0.0, 10.0, 10.0),
            mark: false,
            params: &chain_params,
        },
    ]);
    let mut out = GCodeWriter::new(Point3::new(0.0, 0.0, 10.0));
    chain.emit(&mut out, &Transformation3::default()).unwrap();

    let cuts: Vec<_> = out
        .codes()
        .iter()
        .filter(|c| c.kind == GCodeKind::Mill && c.text.contains('X'))
        .collect();
    assert_eq!(cuts.len(), 6);
    let mill_length: f64 = cuts.iter().map(|c| c.distance).sum();
    assert!((mill_length - 60.0).abs() < 1e-9);
    assert_eq!(out.head().xy(), Point2::new(10.0, 10.0));

    // At each place the depths only ever go down
    let depths = cut_depths(&out, Point2::new(0.0, 0.0));
    assert_eq!(depths.len(), 6);
    for (i, (place, z)) in depths.iter().enumerate() {
        let earlier: Vec<f64> = depths[..i]
            .iter()
            .filter(|(p, _)| p == place)
            .map(|(_, z)| *z)
            .collect();
        assert_eq!(earlier.len() as f64, -z - 1.0, "layer {} at {:?} out of turn", z, place);
        assert!(earlier.iter().all(|above| above > z));
    }
}

#[test]
fn test_deep_head_still_starts_from_the_top_layer() {
    let chain_params = params(&[(Field::Top, 0.0), (Field::Bottom, -3.0), (Field::Step, 1.0)]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 10.0, 0.0),
        mark: false,
        params: &chain_params,
    }]);
    // The head rests right at the end of the deepest layer
    let mut out = GCodeWriter::new(Point3::new(10.0, 0.0, -3.0));
    chain.emit(&mut out, &Transformation3::default()).unwrap();

    let depths: Vec<f64> = cut_depths(&out, Point2::new(10.0, 0.0))
        .into_iter()
        .map(|(_, z)| z)
        .collect();
    assert_eq!(depths, vec![-1.0, -2.0, -3.0]);
}

#[test]
fn test_chain_is_placed_in_world() {
    let chain_params = params(&[(Field::Top, 0.0), (Field::Bottom, -1.0)]);
    let chain = MillChain::new(vec![ChainSegment {
        geometry: line(0.0, 0.0, 10.0, 0.0),
        mark: false,
        params: &chain_params,
    }]);
    let comp = Transformation3::new(Transformation2::rotation_translation(
        90.0,
        Point2::new(5.0, 5.0),
    ));
    let mut out = GCodeWriter::new(Point3::new(5.0, 5.0, 10.0));
    chain.emit(&mut out, &comp).unwrap();
    assert!(out
        .codes()
        .iter()
        .any(|c| c.text == "G01 X5.000 Y15.000 Z-1.000 F600.0"));
}
