//! Path models and program generation.
//!
//! A [`PathLibrary`] holds every path layer of a job. A [`ModelBuilder`]
//! turns a layer into a [`PathModel`]: the route assembled, every element
//! given its resolved parameters, and every sub-path reference resolved to
//! the model of the referenced path together with its placement. Models
//! are built once per path and variable bindings and shared afterwards.

use crate::assembler::assemble;
use crate::drill_press::{DrillPressGenerator, DrillPressParameters};
use crate::error::{CamToolError, Result};
use crate::mill_chain::{ChainKey, ChainSegment, MillChain};
use crate::optimizer::GCodeOptimizer;
use crate::params::{substitute, Bindings, Defaults, Field, Level, Overlay, ParamText, ParamsChain};
use crate::segment::{RawSegment, SegmentKind};
use pathkit_core::{
    format_number, BedProbe, DiagContext, Diagnostics, GCode, GCodeWriter, PathName, Point2,
    Point3, Statistics, Transformation2, Transformation3, PROBE_VARIABLE_BASE,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use tracing::{debug, info};

/// Deepest allowed nesting of sub-path references.
pub const MAX_NESTING: usize = 32;

/// Distance a probe may travel below its expected height (mm).
pub const PROBE_TRAVEL: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Start,
    End,
}

/// A start or end mark of a path layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub position: Point2,
}

/// One path layer as read from the drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathLayer {
    pub name: PathName,
    /// Path-level parameter texts
    #[serde(default)]
    pub params: ParamText,
    /// Parameter texts applying to every element of one kind on this layer
    #[serde(default)]
    pub level_params: BTreeMap<Level, ParamText>,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

impl PathLayer {
    pub fn new(name: impl Into<PathName>) -> Self {
        Self {
            name: name.into(),
            params: ParamText::new(),
            level_params: BTreeMap::new(),
            anchors: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: char, value: impl Into<String>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn with_level_param(mut self, level: Level, key: char, value: impl Into<String>) -> Self {
        self.level_params
            .entry(level)
            .or_default()
            .insert(key, value.into());
        self
    }

    pub fn with_start(mut self, position: Point2) -> Self {
        self.anchors.push(Anchor {
            kind: AnchorKind::Start,
            position,
        });
        self
    }

    pub fn with_end(mut self, position: Point2) -> Self {
        self.anchors.push(Anchor {
            kind: AnchorKind::End,
            position,
        });
        self
    }

    pub fn with_segment(mut self, segment: RawSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Names of the paths this layer places as sub-paths.
    pub fn references(&self) -> impl Iterator<Item = &PathName> {
        self.segments.iter().filter_map(|s| match &s.kind {
            SegmentKind::SubPath { target, .. } => Some(target),
            _ => None,
        })
    }
}

/// All path layers of a job.
#[derive(Debug, Clone, Default)]
pub struct PathLibrary {
    layers: BTreeMap<PathName, PathLayer>,
    defaults: Defaults,
}

impl PathLibrary {
    /// Collects `layers`, reporting names that are used twice.
    pub fn new(defaults: Defaults, layers: Vec<PathLayer>, diags: &mut Diagnostics) -> Self {
        defaults.validate(diags);
        let mut map = BTreeMap::new();
        for layer in layers {
            if map.contains_key(&layer.name) {
                diags.error(
                    DiagContext::path(&layer.name),
                    "path defined more than once",
                    Vec::<String>::new(),
                );
                continue;
            }
            map.insert(layer.name.clone(), layer);
        }
        Self {
            layers: map,
            defaults,
        }
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn get(&self, name: &PathName) -> Option<&PathLayer> {
        self.layers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &PathName> {
        self.layers.keys()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Paths no other path places as a sub-path, in name order.
    ///
    /// These are the paths a job produces programs for.
    pub fn roots(&self) -> Vec<PathName> {
        let referenced: BTreeSet<&PathName> =
            self.layers.values().flat_map(PathLayer::references).collect();
        self.layers
            .keys()
            .filter(|name| !referenced.contains(name))
            .cloned()
            .collect()
    }
}

/// One element of a built path.
#[derive(Debug, Clone)]
pub struct PathSegment {
    /// The element, oriented in route direction
    pub raw: RawSegment,
    pub params: ParamsChain,
    /// Model of the placed path, for sub-path references
    pub sub_model: Option<Rc<PathModel>>,
    /// Map from the placed path's coordinates into this path's
    pub placement: Option<Transformation2>,
}

impl PathSegment {
    fn chain_segment(&self) -> Option<ChainSegment<'_>> {
        match &self.raw.kind {
            SegmentKind::Chain { geometry, mark } => Some(ChainSegment {
                geometry: *geometry,
                mark: *mark,
                params: &self.params,
            }),
            _ => None,
        }
    }

    fn chain_key(&self) -> Result<Option<ChainKey>> {
        match &self.raw.kind {
            SegmentKind::Chain { mark, .. } => Ok(Some(ChainKey::of(&self.params, *mark)?)),
            _ => Ok(None),
        }
    }
}

/// A fully resolved path.
#[derive(Debug, Clone)]
pub struct PathModel {
    pub name: PathName,
    /// Path-level parameters
    pub params: ParamsChain,
    pub start: Point2,
    pub end: Point2,
    pub segments: Vec<PathSegment>,
    /// Bed probes in this path's coordinates, including those of sub-paths
    pub probes: Vec<BedProbe>,
}

/// Generated G-code of one path.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: PathName,
    pub codes: Vec<GCode>,
    pub statistics: Statistics,
}

impl Program {
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for code in &self.codes {
            text.push_str(&code.text);
            text.push('\n');
        }
        text
    }
}

impl PathModel {
    /// Writes the moves of every element. The head must be over `start`
    /// and is left over `end`.
    pub fn emit(&self, out: &mut GCodeWriter, comp: &Transformation3) -> Result<()> {
        let mut i = 0;
        while i < self.segments.len() {
            let segment = &self.segments[i];
            if let Some(key) = segment.chain_key()? {
                let mut j = i + 1;
                while j < self.segments.len() && self.segments[j].chain_key()? == Some(key) {
                    j += 1;
                }
                let chain = MillChain::new(
                    self.segments[i..j]
                        .iter()
                        .filter_map(PathSegment::chain_segment)
                        .collect(),
                );
                chain.emit(out, comp)?;
                i = j;
                continue;
            }

            let params = &segment.params;
            match &segment.raw.kind {
                SegmentKind::Drill { center, .. } => {
                    let generator =
                        DrillPressGenerator::new(DrillPressParameters::from_params(params)?);
                    generator.drill(out, comp, comp.apply(*center));
                }
                SegmentKind::Helix { center, radius, .. } => {
                    let generator =
                        DrillPressGenerator::new(DrillPressParameters::from_params(params)?);
                    let bit = params.require(Field::BitDiameter)?;
                    generator.helix(out, comp, comp.apply(*center), *radius, bit);
                }
                SegmentKind::Sweep { end, .. } | SegmentKind::BackSweep { end, .. } => {
                    let height = params.require(Field::SweepHeight)?;
                    let rate = params.require(Field::SweepRate)?;
                    out.rapid_to_height(height);
                    out.travel_to(comp.apply(*end), Some(rate));
                }
                SegmentKind::SubPath { target, .. } => {
                    let (Some(model), Some(placement)) = (&segment.sub_model, &segment.placement)
                    else {
                        return Err(CamToolError::MissingSubPath(target.clone()));
                    };
                    out.comment(format!("sub-path {}", model.name));
                    model.emit(out, &comp.nested(placement))?;
                }
                SegmentKind::Chain { .. } | SegmentKind::ZProbe { .. } => {}
            }
            i += 1;
        }
        Ok(())
    }

    /// The complete program for this path, placed at the origin.
    pub fn generate(&self) -> Result<Program> {
        let comp = Transformation3::with_probes(Transformation2::identity(), self.probes.clone());
        let sweep_height = self.params.require(Field::SweepHeight)?;

        let mut out = GCodeWriter::new(Point3::new(0.0, 0.0, sweep_height));
        out.comment(format!("path {}", self.name));
        if let Some(bit) = self.params.get(Field::BitDiameter) {
            out.comment(format!("bit diameter {} mm", format_number(bit)));
        }
        for (i, probe) in self.probes.iter().enumerate() {
            out.comment(format!(
                "bed probe #{} at {}, expected height {}",
                PROBE_VARIABLE_BASE + i as u32,
                probe.position,
                format_number(probe.target_height)
            ));
        }
        out.other("G21 G90");
        out.other(format!("G00 Z{}", format_number(sweep_height)));
        out.travel_to(self.start, None);

        self.emit(&mut out, &comp)?;

        if out.head().z < sweep_height {
            out.rapid_to_height(sweep_height);
        }
        out.other("M30");

        let codes = GCodeOptimizer::optimize(out.into_codes());
        let statistics = Statistics::from_codes(&codes);
        info!(
            "path {}: {} commands, mill {:.0} mm, drill {:.0} mm, sweep {:.0} mm, about {} min",
            self.name,
            statistics.commands,
            statistics.mill_length,
            statistics.drill_length,
            statistics.sweep_length,
            statistics.rounded_minutes()
        );
        Ok(Program {
            name: self.name.clone(),
            codes,
            statistics,
        })
    }

    /// Program measuring every bed probe into its machine parameter.
    ///
    /// `None` when the path has no probes.
    pub fn probing_program(&self) -> Result<Option<Program>> {
        if self.probes.is_empty() {
            return Ok(None);
        }
        let sweep_height = self.params.require(Field::SweepHeight)?;
        let feeds = self.params.feeds()?;

        let mut out = GCodeWriter::new(Point3::new(0.0, 0.0, sweep_height));
        out.comment(format!("bed probing for path {}", self.name));
        out.other("G21 G90");
        out.other(format!("G00 Z{}", format_number(sweep_height)));
        for (i, probe) in self.probes.iter().enumerate() {
            out.travel_to(probe.position, None);
            out.other(format!(
                "G38.2 Z{} F{:.1}",
                format_number(probe.target_height - PROBE_TRAVEL),
                feeds.plunge
            ));
            out.other(format!("#{}=#5063", PROBE_VARIABLE_BASE + i as u32));
            out.other(format!("G00 Z{}", format_number(sweep_height)));
        }
        out.other("M30");

        let codes = out.into_codes();
        Ok(Some(Program {
            name: self.name.clone(),
            statistics: Statistics::from_codes(&codes),
            codes,
        }))
    }

    /// Parameter assignments for running the program on a flat bed
    /// without probing: every probe reads its expected height.
    pub fn nominal_heights(&self) -> String {
        let mut text = String::new();
        for (i, probe) in self.probes.iter().enumerate() {
            text.push_str(&format!(
                "#{}={}\n",
                PROBE_VARIABLE_BASE + i as u32,
                format_number(probe.target_height)
            ));
        }
        text
    }
}

type ModelKey = (PathName, Bindings);

/// Builds path models from a library, reporting problems as it goes.
pub struct ModelBuilder<'a> {
    library: &'a PathLibrary,
    diags: &'a mut Diagnostics,
    memo: HashMap<ModelKey, Option<Rc<PathModel>>>,
    in_progress: Vec<ModelKey>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(library: &'a PathLibrary, diags: &'a mut Diagnostics) -> Self {
        Self {
            library,
            diags,
            memo: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// The model of `name` with the given variable bindings.
    ///
    /// `None` when the path has errors; they have been reported.
    pub fn build(&mut self, name: &PathName, bindings: &Bindings) -> Option<Rc<PathModel>> {
        let key = (name.clone(), bindings.clone());
        if let Some(model) = self.memo.get(&key) {
            return model.clone();
        }
        if let Some(pos) = self.in_progress.iter().position(|k| k.0 == *name) {
            let cycle: Vec<String> = self.in_progress[pos..]
                .iter()
                .map(|k| k.0.to_string())
                .chain(std::iter::once(name.to_string()))
                .collect();
            self.diags.error(
                DiagContext::path(name),
                "sub-path cycle: {0}",
                [cycle.join(" -> ")],
            );
            return None;
        }
        if self.in_progress.len() >= MAX_NESTING {
            self.diags.error(
                DiagContext::path(name),
                "sub-paths nested deeper than {0} levels",
                [MAX_NESTING],
            );
            return None;
        }
        let Some(layer) = self.library.get(name) else {
            self.diags.error(
                DiagContext::path(name),
                "undefined path",
                Vec::<String>::new(),
            );
            return None;
        };

        debug!("building path {}", name);
        self.in_progress.push(key.clone());
        let model = self.construct(layer, bindings).map(Rc::new);
        self.in_progress.pop();
        self.memo.insert(key, model.clone());
        model
    }

    fn anchor(&mut self, layer: &PathLayer, kind: AnchorKind) -> Option<Point2> {
        let found: Vec<Point2> = layer
            .anchors
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.position)
            .collect();
        let what = match kind {
            AnchorKind::Start => "start",
            AnchorKind::End => "end",
        };
        match found.as_slice() {
            [one] => Some(*one),
            [] => {
                self.diags.error(
                    DiagContext::path(&layer.name),
                    "no {0} mark",
                    [what],
                );
                None
            }
            many => {
                self.diags.error(
                    DiagContext::path(&layer.name),
                    "{0} {1} marks, expected one",
                    [many.len().to_string(), what.to_string()],
                );
                None
            }
        }
    }

    fn construct(&mut self, layer: &PathLayer, bindings: &Bindings) -> Option<PathModel> {
        let name = &layer.name;
        let start = self.anchor(layer, AnchorKind::Start);
        let end = self.anchor(layer, AnchorKind::End);

        let path_overlay = Overlay::parse(
            Level::Path,
            DiagContext::path(name),
            &layer.params,
            bindings,
            self.diags,
        );
        let base = ParamsChain::root(self.library.defaults()).push(path_overlay);
        base.validate(self.diags);

        let mut levels: BTreeMap<Level, Rc<Overlay>> = BTreeMap::new();
        for (level, text) in &layer.level_params {
            let overlay = Overlay::parse(*level, DiagContext::path(name), text, bindings, self.diags);
            levels.insert(*level, Rc::new(overlay));
        }

        let (start, end) = (start?, end?);
        let assembly = assemble(name, layer.segments.clone(), start, end, self.diags);
        let mut ok = assembly.complete;

        let mut segments = Vec::with_capacity(assembly.segments.len());
        let mut probes = Vec::new();
        for raw in assembly.segments {
            match self.resolve(name, &base, &levels, raw, bindings) {
                Some(segment) => {
                    if let (Some(sub), Some(placement)) = (&segment.sub_model, &segment.placement) {
                        probes.extend(sub.probes.iter().map(|p| BedProbe {
                            position: placement.apply(p.position),
                            target_height: p.target_height,
                        }));
                    }
                    segments.push(segment);
                }
                None => ok = false,
            }
        }
        for raw in &assembly.probes {
            let params = self.chain_for(name, &base, &levels, raw, bindings);
            match params
                .get(Field::ProbeHeight)
                .or_else(|| params.get(Field::Top))
            {
                Some(target_height) => probes.push(BedProbe {
                    position: raw.start(),
                    target_height,
                }),
                None => {
                    self.diags.error(
                        raw.context(name),
                        "probe height is not set",
                        Vec::<String>::new(),
                    );
                    ok = false;
                }
            }
        }

        ok.then(|| PathModel {
            name: name.clone(),
            params: base,
            start,
            end,
            segments,
            probes,
        })
    }

    /// Overlays from the job defaults down to `raw` itself.
    fn chain_for(
        &mut self,
        path: &PathName,
        base: &ParamsChain,
        levels: &BTreeMap<Level, Rc<Overlay>>,
        raw: &RawSegment,
        bindings: &Bindings,
    ) -> ParamsChain {
        let mut chain = base.clone();
        let push_level = |chain: &mut ParamsChain, level: Level| {
            if let Some(overlay) = levels.get(&level) {
                *chain = chain.push_shared(overlay.clone());
            }
        };
        match raw.kind {
            SegmentKind::Chain { mark, .. } => {
                push_level(&mut chain, Level::Chain);
                push_level(&mut chain, if mark { Level::Mark } else { Level::Mill });
            }
            SegmentKind::Helix { mark, .. } | SegmentKind::Drill { mark, .. } => {
                if mark {
                    push_level(&mut chain, Level::Mark);
                }
                push_level(&mut chain, raw.level());
            }
            SegmentKind::BackSweep { .. } => {
                push_level(&mut chain, Level::Sweep);
                push_level(&mut chain, Level::BackSweep);
            }
            SegmentKind::Sweep { .. } | SegmentKind::ZProbe { .. } | SegmentKind::SubPath { .. } => {
                push_level(&mut chain, raw.level());
            }
        }

        let context = raw.context(path);
        if raw.level() == Level::SubPath {
            // Sub-path texts are bindings for the placed path, not fields
            return chain.push(Overlay::empty(Level::SubPath, context));
        }
        chain.push(Overlay::parse(
            raw.level(),
            context,
            &raw.params,
            bindings,
            self.diags,
        ))
    }

    fn resolve(
        &mut self,
        path: &PathName,
        base: &ParamsChain,
        levels: &BTreeMap<Level, Rc<Overlay>>,
        raw: RawSegment,
        bindings: &Bindings,
    ) -> Option<PathSegment> {
        let params = self.chain_for(path, base, levels, &raw, bindings);
        params.validate(self.diags);
        let context = raw.context(path);

        let mut segment = PathSegment {
            raw,
            params,
            sub_model: None,
            placement: None,
        };
        match &segment.raw.kind {
            SegmentKind::Helix { radius, .. } => {
                if let Some(bit) = segment.params.get(Field::BitDiameter) {
                    if *radius <= bit / 2.0 {
                        self.diags.warning(
                            context,
                            "helix radius {0} is not larger than the bit radius {1}, drilling instead",
                            [format_number(*radius), format_number(bit / 2.0)],
                        );
                    }
                }
            }
            SegmentKind::SubPath { start, end, target } => {
                let mut child = Bindings::new();
                for (key, value) in &segment.raw.params {
                    match substitute(value, bindings) {
                        Ok(value) => {
                            child.insert(key.to_ascii_uppercase(), value);
                        }
                        Err(e) => {
                            self.diags.error(context.clone(), "{0}", [e.to_string()]);
                            return None;
                        }
                    }
                }
                let model = self.build(target, &child)?;
                match Transformation2::from_anchors(model.start, model.end, *start, *end) {
                    Ok(placement) => {
                        segment.placement = Some(placement);
                        segment.sub_model = Some(model);
                    }
                    Err(e) => {
                        self.diags.error(
                            context,
                            "sub-path {0} does not fit: {1}",
                            [target.to_string(), e.to_string()],
                        );
                        return None;
                    }
                }
            }
            _ => {}
        }
        Some(segment)
    }

    /// Models of every top-level path of the library, in name order.
    ///
    /// Paths with errors are reported and skipped.
    pub fn root_models(&mut self) -> Vec<Rc<PathModel>> {
        let roots = self.library.roots();
        if roots.is_empty() && !self.library.is_empty() {
            self.diags.error(
                DiagContext::default(),
                "every path is placed inside another path; nothing to compile",
                Vec::<String>::new(),
            );
        }
        roots
            .iter()
            .filter_map(|name| self.build(name, &Bindings::new()))
            .collect()
    }

    /// Programs for every top-level path of the library.
    pub fn compile_all(&mut self) -> Vec<Program> {
        let mut programs = Vec::new();
        for model in self.root_models() {
            match model.generate() {
                Ok(program) => programs.push(program),
                Err(e) => self
                    .diags
                    .error(DiagContext::path(&model.name), "{0}", [e.to_string()]),
            }
        }
        programs
    }
}
