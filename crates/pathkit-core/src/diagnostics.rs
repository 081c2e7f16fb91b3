//! Diagnostics collected while compiling a drawing.
//!
//! Problems found in a drawing (bad parameters, broken topology) do not
//! abort compilation. They are collected, deduplicated by their final text,
//! and forwarded to a [`DiagnosticSink`] so one run reports everything.

use crate::geometry::Point2;
use crate::path_name::PathName;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Where a diagnostic points at in the drawing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagContext {
    pub path: Option<PathName>,
    /// Kind of the offending element, e.g. `Line` or `Drill`
    pub element: Option<String>,
    pub position: Option<Point2>,
}

impl DiagContext {
    pub fn path(name: &PathName) -> Self {
        Self {
            path: Some(name.clone()),
            ..Self::default()
        }
    }

    pub fn element(path: &PathName, element: impl Into<String>, position: Point2) -> Self {
        Self {
            path: Some(path.clone()),
            element: Some(element.into()),
            position: Some(position),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.element.is_none() && self.position.is_none()
    }
}

impl fmt::Display for DiagContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(path) = &self.path {
            parts.push(format!("path {}", path));
        }
        match (&self.element, &self.position) {
            (Some(element), Some(position)) => parts.push(format!("{} at {}", element, position)),
            (Some(element), None) => parts.push(element.clone()),
            (None, Some(position)) => parts.push(format!("at {}", position)),
            (None, None) => {}
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// A located message with positional `{0}`, `{1}`... placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub context: DiagContext,
    pub message: String,
    pub parameters: Vec<String>,
}

impl Diagnostic {
    /// Final text, with parameters substituted and the context prefixed.
    pub fn text(&self) -> String {
        let mut message = self.message.clone();
        for (i, parameter) in self.parameters.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), parameter);
        }
        if self.context.is_empty() {
            message
        } else {
            format!("{}: {}", self.context, message)
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.text())
    }
}

/// Receives every distinct diagnostic once.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!("{}", diagnostic.text()),
            Severity::Error => tracing::error!("{}", diagnostic.text()),
        }
    }
}

/// Drops everything; [`Diagnostics`] still keeps its own record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _diagnostic: &Diagnostic) {}
}

/// Deduplicating diagnostic collector.
pub struct Diagnostics {
    sink: Box<dyn DiagnosticSink>,
    seen: HashSet<String>,
    reported: Vec<Diagnostic>,
    error_count: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Box::new(TracingSink))
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("reported", &self.reported)
            .field("error_count", &self.error_count)
            .finish()
    }
}

impl Diagnostics {
    pub fn new(sink: Box<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            seen: HashSet::new(),
            reported: Vec::new(),
            error_count: 0,
        }
    }

    /// Collector that only records, for tests and dry runs.
    pub fn silent() -> Self {
        Self::new(Box::new(NullSink))
    }

    pub fn error<I, S>(&mut self, context: DiagContext, message: &str, parameters: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.report(Diagnostic {
            severity: Severity::Error,
            context,
            message: message.to_string(),
            parameters: parameters.into_iter().map(|p| p.to_string()).collect(),
        });
    }

    pub fn warning<I, S>(&mut self, context: DiagContext, message: &str, parameters: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.report(Diagnostic {
            severity: Severity::Warning,
            context,
            message: message.to_string(),
            parameters: parameters.into_iter().map(|p| p.to_string()).collect(),
        });
    }

    /// Records and forwards `diagnostic` unless the same text was seen before.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if !self.seen.insert(diagnostic.text()) {
            return;
        }
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.sink.report(&diagnostic);
        self.reported.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn reported(&self) -> &[Diagnostic] {
        &self.reported
    }

    pub fn texts(&self) -> Vec<String> {
        self.reported.iter().map(Diagnostic::text).collect()
    }
}
