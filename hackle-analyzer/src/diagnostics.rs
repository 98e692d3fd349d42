use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A function, method, class, property or constant could not be resolved.
    UndefinedReference,
    TypeError,
    /// An expression statement whose value is discarded.
    NoOp,
    /// A non-static method called through static syntax other than `parent::`.
    StaticCallError,
    /// A construct that parses differently across language versions.
    CompatibilityRisk,
}

impl DiagnosticKind {
    pub fn level(self) -> DiagnosticLevel {
        match self {
            DiagnosticKind::UndefinedReference
            | DiagnosticKind::TypeError
            | DiagnosticKind::StaticCallError => DiagnosticLevel::Error,
            DiagnosticKind::NoOp | DiagnosticKind::CompatibilityRisk => DiagnosticLevel::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UndefinedReference => "undefined",
            DiagnosticKind::TypeError => "type",
            DiagnosticKind::NoOp => "noop",
            DiagnosticKind::StaticCallError => "static-call",
            DiagnosticKind::CompatibilityRisk => "compat",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub level: DiagnosticLevel,
    pub message: String,
    pub file: String,
    pub line: usize,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, file: &str, line: usize) -> Self {
        Self {
            kind,
            level: kind.level(),
            message: message.into(),
            file: file.to_string(),
            line,
        }
    }
}

/// Diagnostics in emission order. Every entry is kept; callers that revisit
/// code they already reported on use [`Diagnostics::push_once`].
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    seen: HashSet<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        message: S,
        file: &str,
        line: usize,
    ) {
        let diagnostic = Diagnostic::new(kind, message, file, line);
        self.record(diagnostic);
    }

    /// Like [`Diagnostics::push`], but skips a diagnostic identical to one
    /// already recorded.
    pub fn push_once<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        message: S,
        file: &str,
        line: usize,
    ) {
        let diagnostic = Diagnostic::new(kind, message, file, line);
        if self.seen.contains(&diagnostic) {
            return;
        }
        self.record(diagnostic);
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            kind = %diagnostic.kind,
            file = %diagnostic.file,
            line = diagnostic.line,
            "{}",
            diagnostic.message
        );
        self.seen.insert(diagnostic.clone());
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.kind == kind)
            .count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}
