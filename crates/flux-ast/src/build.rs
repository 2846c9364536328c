//! Programmatic tree construction.
//!
//! `AstBuilder` hands out dense [`NodeId`]s and one-byte spans at an
//! increasing offset, so trees built in tests and benchmarks have stable,
//! distinct positions without any source text.

use crate::{
    BinaryOp, Block, CallExpr, Expr, ExprKind, FileId, FunctionBody, FunctionExpr, FunctionParam,
    InterpPart, Lit, LogicalOp, NodeId, ObjectExpr, Program, Property, Span, Spanned, Stmt,
    StmtKind, UnaryOp, VariableDecl,
};

pub struct AstBuilder {
    file: FileId,
    next_id: u32,
    offset: u32,
}

impl AstBuilder {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            next_id: 0,
            offset: 0,
        }
    }

    /// Number of node ids handed out so far.
    pub fn node_count(&self) -> u32 {
        self.next_id
    }

    fn id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn span(&mut self) -> Span {
        let span = Span::new(self.file, self.offset, self.offset + 1);
        self.offset += 1;
        span
    }

    fn name(&mut self, name: &str) -> Spanned<String> {
        let span = self.span();
        Spanned::new(name.to_string(), span)
    }

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        let id = self.id();
        let span = self.span();
        Expr { id, kind, span }
    }

    // -- literals -----------------------------------------------------------

    pub fn bool(&mut self, v: bool) -> Expr {
        self.expr(ExprKind::Lit(Lit::Bool(v)))
    }

    pub fn int(&mut self, v: i64) -> Expr {
        self.expr(ExprKind::Lit(Lit::Int(v)))
    }

    pub fn uint(&mut self, v: u64) -> Expr {
        self.expr(ExprKind::Lit(Lit::UInt(v)))
    }

    pub fn float(&mut self, v: f64) -> Expr {
        self.expr(ExprKind::Lit(Lit::Float(v)))
    }

    pub fn string(&mut self, v: &str) -> Expr {
        self.expr(ExprKind::Lit(Lit::String(v.to_string())))
    }

    pub fn time(&mut self, nanos: i64) -> Expr {
        self.expr(ExprKind::Lit(Lit::Time(nanos)))
    }

    pub fn duration(&mut self, nanos: i64) -> Expr {
        self.expr(ExprKind::Lit(Lit::Duration(nanos)))
    }

    pub fn regexp(&mut self, src: &str) -> Expr {
        self.expr(ExprKind::Lit(Lit::Regexp(src.to_string())))
    }

    // -- expressions --------------------------------------------------------

    pub fn ident(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Identifier(name.to_string()))
    }

    pub fn array(&mut self, elements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Array(elements))
    }

    pub fn call(&mut self, callee: Expr, args: Vec<(&str, Expr)>) -> Expr {
        let arguments = self.properties(args);
        self.expr(ExprKind::Call(CallExpr {
            callee: Box::new(callee),
            arguments,
        }))
    }

    /// `argument |> call`
    pub fn pipe(&mut self, argument: Expr, call: Expr) -> Expr {
        self.expr(ExprKind::Pipe {
            argument: Box::new(argument),
            call: Box::new(call),
        })
    }

    pub fn member(&mut self, object: Expr, property: &str) -> Expr {
        let property = self.name(property);
        self.expr(ExprKind::Member {
            object: Box::new(object),
            property,
        })
    }

    pub fn index(&mut self, array: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index {
            array: Box::new(array),
            index: Box::new(index),
        })
    }

    pub fn object(&mut self, props: Vec<(&str, Expr)>) -> Expr {
        let properties = self.properties(props);
        self.expr(ExprKind::Object(ObjectExpr {
            with: None,
            properties,
        }))
    }

    /// `{base with props}`
    pub fn object_with(&mut self, base: Expr, props: Vec<(&str, Expr)>) -> Expr {
        let properties = self.properties(props);
        self.expr(ExprKind::Object(ObjectExpr {
            with: Some(Box::new(base)),
            properties,
        }))
    }

    pub fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn logical(&mut self, op: LogicalOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, argument: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            argument: Box::new(argument),
        })
    }

    pub fn conditional(&mut self, test: Expr, consequent: Expr, alternate: Expr) -> Expr {
        self.expr(ExprKind::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    pub fn interp(&mut self, parts: Vec<InterpPart>) -> Expr {
        self.expr(ExprKind::StringInterp(parts))
    }

    // -- functions ----------------------------------------------------------

    pub fn param(&mut self, name: &str) -> FunctionParam {
        let id = self.id();
        let name = self.name(name);
        FunctionParam {
            id,
            name,
            default: None,
            is_pipe: false,
        }
    }

    pub fn param_default(&mut self, name: &str, default: Expr) -> FunctionParam {
        FunctionParam {
            default: Some(default),
            ..self.param(name)
        }
    }

    /// `name=<-`
    pub fn pipe_param(&mut self, name: &str) -> FunctionParam {
        FunctionParam {
            is_pipe: true,
            ..self.param(name)
        }
    }

    /// `(params) => body`
    pub fn lambda(&mut self, params: Vec<FunctionParam>, body: Expr) -> Expr {
        self.expr(ExprKind::Function(FunctionExpr {
            params,
            body: FunctionBody::Expr(Box::new(body)),
        }))
    }

    /// `(params) => { statements return result }`
    pub fn lambda_block(
        &mut self,
        params: Vec<FunctionParam>,
        statements: Vec<Stmt>,
        result: Expr,
    ) -> Expr {
        let span = self.span();
        self.expr(ExprKind::Function(FunctionExpr {
            params,
            body: FunctionBody::Block(Block {
                statements,
                result: Box::new(result),
                span,
            }),
        }))
    }

    // -- statements ---------------------------------------------------------

    pub fn var(&mut self, name: &str, init: Expr) -> Stmt {
        let decl = self.decl(name, init);
        let span = decl.name.span.merge(decl.init.span);
        Stmt {
            kind: StmtKind::Variable(decl),
            span,
        }
    }

    pub fn option(&mut self, name: &str, init: Expr) -> Stmt {
        let decl = self.decl(name, init);
        let span = decl.name.span.merge(decl.init.span);
        Stmt {
            kind: StmtKind::Option(decl),
            span,
        }
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        let span = expr.span;
        Stmt {
            kind: StmtKind::Expression(expr),
            span,
        }
    }

    pub fn program(&self, body: Vec<Stmt>) -> Program {
        Program {
            file: self.file,
            body,
        }
    }

    fn decl(&mut self, name: &str, init: Expr) -> VariableDecl {
        let id = self.id();
        let name = self.name(name);
        VariableDecl { id, name, init }
    }

    fn properties(&mut self, props: Vec<(&str, Expr)>) -> Vec<Property> {
        props
            .into_iter()
            .map(|(key, value)| Property {
                key: self.name(key),
                value,
            })
            .collect()
    }
}
