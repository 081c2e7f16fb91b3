//! Layered machining parameters.
//!
//! Parameters are written in the drawing as short texts keyed by one letter
//! (`F600`, `T0`, `B-12`). Each drawn element, its path layer and the job
//! defaults contribute one [`Overlay`]; a [`ParamsChain`] stacks overlays
//! from the outermost (job defaults) to the innermost (the element) and
//! resolves each field at the innermost overlay that sets it.

use crate::error::{CamToolError, ParameterError, Result};
use pathkit_core::{CutFeeds, DiagContext, Diagnostics};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

/// Raw parameter texts of one element, by key letter.
pub type ParamText = BTreeMap<char, String>;

/// Variable values a sub-path reference passes to the referenced path.
pub type Bindings = BTreeMap<char, String>;

static VARIABLE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z])"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    FeedRate,
    PlungeRate,
    SweepRate,
    SweepHeight,
    BitDiameter,
    Top,
    Bottom,
    Step,
    BarMargin,
    BarWidth,
    BarRun,
    BarRamp,
    BarHeight,
    ProbeHeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constraint {
    Positive,
    NonNegative,
    Any,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::FeedRate,
        Field::PlungeRate,
        Field::SweepRate,
        Field::SweepHeight,
        Field::BitDiameter,
        Field::Top,
        Field::Bottom,
        Field::Step,
        Field::BarMargin,
        Field::BarWidth,
        Field::BarRun,
        Field::BarRamp,
        Field::BarHeight,
        Field::ProbeHeight,
    ];

    pub fn key(self) -> char {
        match self {
            Field::FeedRate => 'F',
            Field::PlungeRate => 'P',
            Field::SweepRate => 'R',
            Field::SweepHeight => 'S',
            Field::BitDiameter => 'D',
            Field::Top => 'T',
            Field::Bottom => 'B',
            Field::Step => 'I',
            Field::BarMargin => 'O',
            Field::BarWidth => 'W',
            Field::BarRun => 'U',
            Field::BarRamp => 'L',
            Field::BarHeight => 'H',
            Field::ProbeHeight => 'Z',
        }
    }

    pub fn from_key(key: char) -> Option<Field> {
        let key = key.to_ascii_uppercase();
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::FeedRate => "FeedRate",
            Field::PlungeRate => "PlungeRate",
            Field::SweepRate => "SweepRate",
            Field::SweepHeight => "SweepHeight",
            Field::BitDiameter => "BitDiameter",
            Field::Top => "Top",
            Field::Bottom => "Bottom",
            Field::Step => "Step",
            Field::BarMargin => "BarMargin",
            Field::BarWidth => "BarWidth",
            Field::BarRun => "BarRun",
            Field::BarRamp => "BarRamp",
            Field::BarHeight => "BarHeight",
            Field::ProbeHeight => "ProbeHeight",
        }
    }

    fn constraint(self) -> Constraint {
        match self {
            Field::FeedRate
            | Field::PlungeRate
            | Field::SweepRate
            | Field::BitDiameter
            | Field::Step
            | Field::BarWidth
            | Field::BarRun => Constraint::Positive,
            Field::BarMargin | Field::BarRamp | Field::BarHeight => Constraint::NonNegative,
            Field::SweepHeight | Field::Top | Field::Bottom | Field::ProbeHeight => Constraint::Any,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Level of the parameter hierarchy an overlay belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Path,
    Chain,
    Mill,
    Mark,
    Helix,
    Drill,
    Sweep,
    BackSweep,
    SubPath,
    ZProbe,
}

impl Level {
    /// Whether `field` may be written at this level.
    pub fn allows(self, field: Field) -> bool {
        use Level::*;
        match field {
            Field::FeedRate
            | Field::PlungeRate
            | Field::Top
            | Field::Bottom
            | Field::Step => matches!(self, Path | Chain | Mill | Mark | Helix | Drill),
            Field::SweepRate => matches!(self, Path | Sweep | BackSweep),
            Field::SweepHeight => matches!(self, Path | Chain | Sweep | BackSweep | Helix | Drill),
            Field::BitDiameter => matches!(self, Path | Helix),
            Field::BarMargin
            | Field::BarWidth
            | Field::BarRun
            | Field::BarRamp
            | Field::BarHeight => matches!(self, Path | Chain | Mill),
            Field::ProbeHeight => matches!(self, Path | ZProbe),
        }
    }

    pub fn fields(self) -> Vec<Field> {
        Field::ALL.into_iter().filter(|f| self.allows(*f)).collect()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Path => "Path",
            Level::Chain => "Chain",
            Level::Mill => "Mill",
            Level::Mark => "Mark",
            Level::Helix => "Helix",
            Level::Drill => "Drill",
            Level::Sweep => "Sweep",
            Level::BackSweep => "BackSweep",
            Level::SubPath => "SubPath",
            Level::ZProbe => "ZProbe",
        };
        f.write_str(name)
    }
}

/// Job-wide defaults, the outermost overlay of every chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Cutting feed (mm/min)
    pub feed_rate: f64,
    /// Vertical cutting feed (mm/min); the feed rate when unset
    pub plunge_rate: Option<f64>,
    /// Travel feed used for sweeps (mm/min)
    pub sweep_rate: f64,
    /// Safe travel height (mm)
    pub sweep_height: f64,
    /// Tool diameter (mm)
    pub bit_diameter: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            feed_rate: 600.0,
            plunge_rate: None,
            sweep_rate: 3000.0,
            sweep_height: 10.0,
            bit_diameter: 3.0,
        }
    }
}

impl Defaults {
    fn overlay(&self) -> Overlay {
        let mut overlay = Overlay::empty(Level::Path, DiagContext::default())
            .with_value(Field::FeedRate, self.feed_rate)
            .with_value(Field::SweepRate, self.sweep_rate)
            .with_value(Field::SweepHeight, self.sweep_height)
            .with_value(Field::BitDiameter, self.bit_diameter);
        if let Some(plunge) = self.plunge_rate {
            overlay = overlay.with_value(Field::PlungeRate, plunge);
        }
        overlay
    }

    /// Reports defaults that are out of range.
    pub fn validate(&self, diags: &mut Diagnostics) {
        let overlay = self.overlay();
        for (field, value) in &overlay.values {
            if let Some(message) = check_range(*field, *value) {
                diags.error(
                    DiagContext::default(),
                    "default {0}",
                    [message],
                );
            }
        }
    }
}

fn check_range(field: Field, value: f64) -> Option<String> {
    match field.constraint() {
        Constraint::Positive if value <= 0.0 => {
            Some(format!("{} must be positive, got {}", field, value))
        }
        Constraint::NonNegative if value < 0.0 => {
            Some(format!("{} must not be negative, got {}", field, value))
        }
        _ => None,
    }
}

/// Replaces every `$X` in `raw` by the binding for `X`.
pub fn substitute(raw: &str, bindings: &Bindings) -> std::result::Result<String, ParameterError> {
    let re = VARIABLE
        .as_ref()
        .map_err(|e| ParameterError::InvalidValue {
            key: '$',
            value: e.to_string(),
        })?;
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in re.captures_iter(raw) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let var = name.as_str().chars().next().unwrap_or('?').to_ascii_uppercase();
        let value = bindings
            .iter()
            .find(|(k, _)| k.to_ascii_uppercase() == var)
            .map(|(_, v)| v.as_str())
            .ok_or(ParameterError::Unbound(var))?;
        out.push_str(&raw[last..whole.start()]);
        out.push_str(value.trim());
        last = whole.end();
    }
    out.push_str(&raw[last..]);
    Ok(out)
}

/// One level's explicitly set fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub level: Level,
    pub context: DiagContext,
    values: BTreeMap<Field, f64>,
}

impl Overlay {
    pub fn empty(level: Level, context: DiagContext) -> Self {
        Self {
            level,
            context,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: Field, value: f64) -> Self {
        self.values.insert(field, value);
        self
    }

    /// Reads the parameter texts of one element.
    ///
    /// Bad entries are reported and skipped; the rest of the overlay is
    /// still usable.
    pub fn parse(
        level: Level,
        context: DiagContext,
        text: &ParamText,
        bindings: &Bindings,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut overlay = Self::empty(level, context);
        for (key, raw) in text {
            match overlay.parse_entry(*key, raw, bindings) {
                Ok((field, value)) => {
                    if let Some(message) = check_range(field, value) {
                        diags.error(overlay.context.clone(), "{0}", [message]);
                    } else {
                        overlay.values.insert(field, value);
                    }
                }
                Err(e) => diags.error(overlay.context.clone(), "{0}", [e.to_string()]),
            }
        }
        overlay
    }

    fn parse_entry(
        &self,
        key: char,
        raw: &str,
        bindings: &Bindings,
    ) -> std::result::Result<(Field, f64), ParameterError> {
        let field = Field::from_key(key).ok_or(ParameterError::UnknownKey(key))?;
        if !self.level.allows(field) {
            return Err(ParameterError::NotAllowed {
                key: field.key(),
                level: self.level.to_string(),
            });
        }
        let text = substitute(raw, bindings)?;
        let value = text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParameterError::InvalidValue {
                key: field.key(),
                value: raw.to_string(),
            })?;
        Ok((field, value))
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.values.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Overlays from the job defaults down to one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsChain {
    overlays: Vec<Rc<Overlay>>,
}

impl ParamsChain {
    pub fn root(defaults: &Defaults) -> Self {
        Self {
            overlays: vec![Rc::new(defaults.overlay())],
        }
    }

    /// A chain one level deeper. Overlays are shared, not copied.
    pub fn push(&self, overlay: Overlay) -> Self {
        self.push_shared(Rc::new(overlay))
    }

    pub fn push_shared(&self, overlay: Rc<Overlay>) -> Self {
        let mut overlays = self.overlays.clone();
        overlays.push(overlay);
        Self { overlays }
    }

    pub fn level(&self) -> Level {
        self.overlays
            .last()
            .map(|o| o.level)
            .unwrap_or(Level::Path)
    }

    /// Context of the innermost overlay that has one.
    pub fn context(&self) -> DiagContext {
        self.overlays
            .iter()
            .rev()
            .map(|o| &o.context)
            .find(|c| !c.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    fn source(&self, field: Field) -> Option<&Overlay> {
        self.overlays
            .iter()
            .rev()
            .map(Rc::as_ref)
            .find(|o| o.values.contains_key(&field))
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.source(field).and_then(|o| o.get(field))
    }

    /// The value of a field needed to emit a move.
    pub fn require(&self, field: Field) -> Result<f64> {
        self.get(field).ok_or_else(|| CamToolError::Unresolved {
            field,
            context: self.context().to_string(),
        })
    }

    /// Vertical cutting feed, falling back to the cutting feed.
    pub fn plunge_rate(&self) -> Result<f64> {
        match self.get(Field::PlungeRate) {
            Some(rate) => Ok(rate),
            None => self.require(Field::FeedRate),
        }
    }

    pub fn feeds(&self) -> Result<CutFeeds> {
        Ok(CutFeeds {
            feed: self.require(Field::FeedRate)?,
            plunge: self.plunge_rate()?,
        })
    }

    /// Every field with a value, as seen from the innermost level.
    pub fn effective(&self) -> BTreeMap<Field, f64> {
        Field::ALL
            .into_iter()
            .filter_map(|f| self.get(f).map(|v| (f, v)))
            .collect()
    }

    /// Reports cross-field ordering violations.
    ///
    /// A violation is located at the innermost overlay setting one of the
    /// fields involved, so a rule broken once on the path level is reported
    /// once for the whole path.
    pub fn validate(&self, diags: &mut Diagnostics) {
        let top = self.get(Field::Top);
        let bottom = self.get(Field::Bottom);

        if let (Some(top), Some(bottom)) = (top, bottom) {
            if bottom > top {
                diags.error(
                    self.blame(&[Field::Top, Field::Bottom]),
                    "Bottom {0} is above Top {1}",
                    [bottom, top],
                );
            }
            if let Some(height) = self.get(Field::BarHeight) {
                if height > top - bottom {
                    diags.error(
                        self.blame(&[Field::BarHeight, Field::Top, Field::Bottom]),
                        "BarHeight {0} exceeds material thickness {1}",
                        [height, top - bottom],
                    );
                }
            }
        }
        if let (Some(top), Some(sweep)) = (top, self.get(Field::SweepHeight)) {
            if sweep < top {
                diags.error(
                    self.blame(&[Field::SweepHeight, Field::Top]),
                    "SweepHeight {0} is below Top {1}",
                    [sweep, top],
                );
            }
        }
    }

    fn blame(&self, fields: &[Field]) -> DiagContext {
        let depth = |field: &Field| {
            self.overlays
                .iter()
                .rposition(|o| o.values.contains_key(field))
        };
        fields
            .iter()
            .filter_map(depth)
            .max()
            .map(|i| self.overlays[i].context.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.context())
    }
}
