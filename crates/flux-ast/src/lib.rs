//! Program tree and source spans for the Flux type checker.
//!
//! The tree is produced by the parser (not part of this workspace) or by
//! [`build::AstBuilder`]. Every expression carries a [`NodeId`] unique within
//! its program and a [`Span`] for diagnostics; the inference driver keys its
//! resolved types by `NodeId`.

pub mod build;
pub mod walk;

/// Identifies a source file in the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic span for nodes that have no source text (prelude, tests).
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.file == FileId(u32::MAX)
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Identity of a node within one program. Allocated densely by whoever builds
/// the tree; the checker never invents ids of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Nanoseconds since the Unix epoch.
    Time(i64),
    /// Nanoseconds.
    Duration(i64),
    /// Regular expression source, without the delimiting slashes.
    Regexp(String),
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    RegexMatch,
    NotRegexMatch,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::RegexMatch => "=~",
            BinaryOp::NotRegexMatch => "!~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Exists,
    Neg,
    Pos,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Exists => "exists",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Lit(Lit),

    /// Reference to a bound name.
    Identifier(String),

    /// Array literal: `[a, b, c]`.
    Array(Vec<Expr>),

    /// Function literal: `(a, b=1, tables=<-) => body`.
    Function(FunctionExpr),

    /// Call with labeled arguments: `f(a: 1, b: 2)`.
    Call(CallExpr),

    /// Pipe-forward: `argument |> call`. `call` is expected to be a
    /// [`ExprKind::Call`]; anything else is a type error.
    Pipe {
        argument: Box<Expr>,
        call: Box<Expr>,
    },

    /// Member access: `object.property` or `object["property"]`.
    Member {
        object: Box<Expr>,
        property: Spanned<String>,
    },

    /// Array indexing: `array[index]`.
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },

    /// Object literal: `{a: 1}` or `{base with a: 1}`.
    Object(ObjectExpr),

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
    },

    /// `if test then consequent else alternate`.
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// String interpolation: `"hello ${name}"`.
    StringInterp(Vec<InterpPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub params: Vec<FunctionParam>,
    pub body: FunctionBody,
}

/// A formal parameter. A parameter with a default is optional; the pipe
/// parameter (`tables=<-`) receives the left side of `|>` and is never
/// required.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParam {
    pub id: NodeId,
    pub name: Spanned<String>,
    pub default: Option<Expr>,
    pub is_pipe: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Box<Expr>),
    Block(Block),
}

/// Statements followed by the mandatory `return` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub result: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub arguments: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpr {
    pub with: Option<Box<Expr>>,
    pub properties: Vec<Property>,
}

/// `key: value`, used by object literals and call arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: Spanned<String>,
    pub value: Expr,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `name = init`
    Variable(VariableDecl),
    /// A bare expression; its value is produced as a result of the program.
    Expression(Expr),
    /// `option name = init`. Overrides a prelude binding of the same name.
    Option(VariableDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub id: NodeId,
    pub name: Spanned<String>,
    pub init: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub file: FileId,
    pub body: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge() {
        let a = Span::new(FileId(0), 5, 10);
        let b = Span::new(FileId(0), 8, 20);
        let merged = a.merge(b);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 20);
    }

    #[test]
    fn synthetic_span_is_recognised() {
        assert!(Span::synthetic().is_synthetic());
        assert!(!Span::new(FileId(0), 0, 1).is_synthetic());
    }

    #[test]
    fn operator_symbols() {
        assert_eq!(BinaryOp::RegexMatch.symbol(), "=~");
        assert_eq!(LogicalOp::Or.symbol(), "or");
        assert_eq!(UnaryOp::Exists.symbol(), "exists");
    }
}
