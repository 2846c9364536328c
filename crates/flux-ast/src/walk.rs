//! Depth-first traversal of the program tree.
//!
//! A [`Visitor`] decides per node whether the walk descends into its
//! children by returning [`Walk::Continue`] or [`Walk::Skip`]. Nodes are
//! visited in source order: children left to right, pre-order.

use crate::{Expr, ExprKind, FunctionBody, FunctionParam, InterpPart, Program, Stmt, StmtKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Skip,
}

pub trait Visitor {
    fn visit_stmt(&mut self, _stmt: &Stmt) -> Walk {
        Walk::Continue
    }

    fn visit_expr(&mut self, _expr: &Expr) -> Walk {
        Walk::Continue
    }

    /// Called for every function parameter before its default (if any).
    fn visit_param(&mut self, _param: &FunctionParam) {}
}

pub fn walk_program<V: Visitor + ?Sized>(visitor: &mut V, program: &Program) {
    for stmt in &program.body {
        walk_stmt(visitor, stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    if visitor.visit_stmt(stmt) == Walk::Skip {
        return;
    }
    match &stmt.kind {
        StmtKind::Variable(decl) | StmtKind::Option(decl) => walk_expr(visitor, &decl.init),
        StmtKind::Expression(expr) => walk_expr(visitor, expr),
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    if visitor.visit_expr(expr) == Walk::Skip {
        return;
    }
    match &expr.kind {
        ExprKind::Lit(_) | ExprKind::Identifier(_) => {}
        ExprKind::Array(elements) => {
            for e in elements {
                walk_expr(visitor, e);
            }
        }
        ExprKind::Function(func) => {
            for param in &func.params {
                visitor.visit_param(param);
                if let Some(default) = &param.default {
                    walk_expr(visitor, default);
                }
            }
            match &func.body {
                FunctionBody::Expr(body) => walk_expr(visitor, body),
                FunctionBody::Block(block) => {
                    for stmt in &block.statements {
                        walk_stmt(visitor, stmt);
                    }
                    walk_expr(visitor, &block.result);
                }
            }
        }
        ExprKind::Call(call) => {
            walk_expr(visitor, &call.callee);
            for arg in &call.arguments {
                walk_expr(visitor, &arg.value);
            }
        }
        ExprKind::Pipe { argument, call } => {
            walk_expr(visitor, argument);
            walk_expr(visitor, call);
        }
        ExprKind::Member { object, .. } => walk_expr(visitor, object),
        ExprKind::Index { array, index } => {
            walk_expr(visitor, array);
            walk_expr(visitor, index);
        }
        ExprKind::Object(obj) => {
            if let Some(base) = &obj.with {
                walk_expr(visitor, base);
            }
            for prop in &obj.properties {
                walk_expr(visitor, &prop.value);
            }
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            walk_expr(visitor, left);
            walk_expr(visitor, right);
        }
        ExprKind::Unary { argument, .. } => walk_expr(visitor, argument),
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            walk_expr(visitor, test);
            walk_expr(visitor, consequent);
            walk_expr(visitor, alternate);
        }
        ExprKind::StringInterp(parts) => {
            for part in parts {
                if let InterpPart::Expr(e) = part {
                    walk_expr(visitor, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::AstBuilder;
    use crate::{BinaryOp, FileId, NodeId};

    #[derive(Default)]
    struct Collect {
        ids: Vec<NodeId>,
        skip_functions: bool,
    }

    impl Visitor for Collect {
        fn visit_expr(&mut self, expr: &Expr) -> Walk {
            self.ids.push(expr.id);
            if self.skip_functions && matches!(expr.kind, ExprKind::Function(_)) {
                Walk::Skip
            } else {
                Walk::Continue
            }
        }
    }

    #[test]
    fn visits_in_source_order() {
        let mut b = AstBuilder::new(FileId(0));
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        let stmt = b.expr_stmt(sum);
        let program = b.program(vec![stmt]);

        let mut v = Collect::default();
        walk_program(&mut v, &program);
        assert_eq!(v.ids, vec![NodeId(2), NodeId(0), NodeId(1)]);
    }

    #[test]
    fn skip_prunes_children() {
        let mut b = AstBuilder::new(FileId(0));
        let x = b.param("x");
        let body = b.ident("x");
        let f = b.lambda(vec![x], body);
        let f_id = f.id;
        let stmt = b.var("f", f);
        let program = b.program(vec![stmt]);

        let mut v = Collect {
            skip_functions: true,
            ..Default::default()
        };
        walk_program(&mut v, &program);
        assert_eq!(v.ids, vec![f_id]);
    }
}
