//! Step-by-step traces of unification and inference.
//!
//! Capture is opt-in (`InferConfig::trace`, or `Unifier::enable_tracing()`);
//! when disabled nothing is rendered or allocated. Both step types serialize
//! to JSON so hosts can dump them for debugging.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Unification trace
// ---------------------------------------------------------------------------

/// A single step in a unification trace.
#[derive(Debug, Clone, Serialize)]
pub struct UnifyStep {
    pub step: usize,
    pub action: UnifyAction,
    pub left: String,
    pub right: String,
    pub detail: String,
}

/// What action was taken during a unification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyAction {
    /// Types are already identical.
    Identity,
    /// Structural recursion into arrays and functions.
    Decompose,
    /// Type variable bound (e.g. t0 := int).
    Bind,
    /// Kind constraint checked or merged.
    Kind,
    /// Entered row unification.
    UnifyRows,
    /// Row variable bound to residual fields (e.g. r0 := {city: string}).
    BindRowVar,
    /// Both rows open with different tails: fresh shared tail created.
    RemyDecompose,
    /// Occurs check fired.
    OccursCheck,
    /// Unification failed.
    Error,
}

// ---------------------------------------------------------------------------
// Inference trace
// ---------------------------------------------------------------------------

/// A single step in an inference trace.
#[derive(Debug, Clone, Serialize)]
pub struct InferStep {
    pub expr: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub rule: InferRule,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<(u32, u32)>,
}

/// Which inference rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferRule {
    Literal,
    Identifier,
    Instantiate,
    Array,
    Function,
    Call,
    Pipe,
    Member,
    Index,
    Object,
    Binary,
    Logical,
    Unary,
    Conditional,
    Interpolation,
    Variable,
    Option,
    Generalize,
}
