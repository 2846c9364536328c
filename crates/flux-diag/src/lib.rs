//! Error reporting and diagnostics for the Flux type checker.
//!
//! Diagnostics are plain data. The inference engine accumulates them while
//! it keeps checking the rest of the program, and hands the ordered list to
//! the caller wrapped in [`DiagnosticError`]. Type renderings in `expected`
//! and `found` never mention internal variable numbering.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// The kind of failure a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Reference to a name with no binding in scope.
    UnboundIdentifier,
    /// Two types failed to unify.
    TypeMismatch,
    /// A variable would have to contain itself.
    OccursCheck,
    /// A required record label or function argument is absent.
    MissingRequiredLabel,
    /// A closed record or parameter set rejects an extra label.
    UnexpectedLabel,
    /// A type variable is still unresolved after solving.
    AmbiguousType,
    /// Recursion depth, variable or constraint caps were hit.
    ResourceLimitExceeded,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::UnboundIdentifier,
        Category::TypeMismatch,
        Category::OccursCheck,
        Category::MissingRequiredLabel,
        Category::UnexpectedLabel,
        Category::AmbiguousType,
        Category::ResourceLimitExceeded,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::UnboundIdentifier => "unbound_identifier",
            Category::TypeMismatch => "type_mismatch",
            Category::OccursCheck => "occurs_check",
            Category::MissingRequiredLabel => "missing_required_label",
            Category::UnexpectedLabel => "unexpected_label",
            Category::AmbiguousType => "ambiguous_type",
            Category::ResourceLimitExceeded => "resource_limit_exceeded",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::UnboundIdentifier => "E0001",
            Category::TypeMismatch => "E0002",
            Category::OccursCheck => "E0003",
            Category::MissingRequiredLabel => "E0004",
            Category::UnexpectedLabel => "E0005",
            Category::AmbiguousType => "E0006",
            Category::ResourceLimitExceeded => "E0900",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::UnboundIdentifier => "A referenced identifier is not bound in any scope.",
            Category::TypeMismatch => "Two types that must be equal are not.",
            Category::OccursCheck => "A type would have to contain itself (infinite type).",
            Category::MissingRequiredLabel => {
                "A required argument or record property is not provided."
            }
            Category::UnexpectedLabel => {
                "An argument or property is not accepted by a closed parameter list or record."
            }
            Category::AmbiguousType => "The type of an expression could not be determined.",
            Category::ResourceLimitExceeded => {
                "The program exceeds the checker's depth, variable or constraint limits."
            }
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::UnboundIdentifier => "Define the name before use or fix the spelling.",
            Category::TypeMismatch => {
                "Convert one side explicitly, e.g. `float(v: x)`; there is no implicit coercion."
            }
            Category::OccursCheck => "Break the self-reference, e.g. by wrapping in an object.",
            Category::MissingRequiredLabel => "Pass the missing argument or add the property.",
            Category::UnexpectedLabel => "Remove the argument or check the function signature.",
            Category::AmbiguousType => "Use the value so that its type is constrained.",
            Category::ResourceLimitExceeded => {
                "Split the query into smaller parts or raise the configured limits."
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations (independent of flux-ast's Span)
// ---------------------------------------------------------------------------

/// A source location for diagnostics.
///
/// Uses byte offsets. Callers convert from `flux-ast` spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.file_id, self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0002).
    pub code: String,
    pub severity: Severity,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    pub location: Option<SourceLocation>,
    /// Expected type, rendered for humans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Type actually found, rendered for humans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
    /// Additional labeled spans (e.g., "expected type came from here").
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<DiagLabel>,
    /// Suggested fix, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagLabel {
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message.into())
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message.into())
    }

    fn new(severity: Severity, category: Category, message: String) -> Self {
        Self {
            code: category.code().to_string(),
            severity,
            category,
            message,
            location: None,
            expected: None,
            found: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the expected/found type pair.
    pub fn with_types(mut self, expected: impl Into<String>, found: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.found = Some(found.into());
        self
    }

    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            location,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}[{}]: {}", self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, "\n  --> {loc}")?;
        }
        if let (Some(expected), Some(found)) = (&self.expected, &self.found) {
            write!(f, "\n  expected: {expected}\n     found: {found}")?;
        }
        for label in &self.labels {
            write!(f, "\n  {}: {}", label.location, label.message)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics, in the order they were found.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", render_summary(.0))]
pub struct DiagnosticError(pub Vec<Diagnostic>);

fn render_summary(diags: &[Diagnostic]) -> String {
    match diags {
        [] => String::new(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first}\n(and {} more)", rest.len()),
    }
}

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }

    /// Categories in report order; handy for assertions.
    pub fn categories(&self) -> Vec<Category> {
        self.0.iter().map(|d| d.category).collect()
    }
}
