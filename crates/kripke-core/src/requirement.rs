//! Compiled non-temporal predicates
//!
//! An implication antecedent is evaluated eagerly at a single node,
//! without spawning successor obligations. That is only possible when
//! the antecedent contains no temporal operator; [`Requirement::compile`]
//! checks that shape once so evaluation can proceed without re-checking.

use crate::expr::{Expr, PropError};
use crate::node::Node;
use std::sync::Arc;

/// A predicate over a single node, compiled from a non-temporal expression
#[derive(Clone, Debug)]
pub struct Requirement {
    expr: Arc<Expr>,
}

impl Requirement {
    /// Compile an expression into a node predicate
    ///
    /// Returns `None` when the expression contains a path-quantified
    /// subformula and therefore has no single-node truth value.
    pub fn compile(expr: &Arc<Expr>) -> Option<Self> {
        if is_temporal_free(expr) {
            Some(Requirement { expr: expr.clone() })
        } else {
            None
        }
    }

    pub fn expr(&self) -> &Arc<Expr> {
        &self.expr
    }

    /// Evaluate the predicate at a node
    pub fn holds(&self, node: &Node) -> Result<bool, PropError> {
        eval(&self.expr, node)
    }
}

fn is_temporal_free(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(_) | Expr::Atomic(_) => true,
        Expr::Precedence(e) | Expr::Not(e) => is_temporal_free(e),
        Expr::And(lhs, rhs)
        | Expr::Or(lhs, rhs)
        | Expr::Xor(lhs, rhs)
        | Expr::Xnor(lhs, rhs)
        | Expr::Implies(lhs, rhs) => is_temporal_free(lhs) && is_temporal_free(rhs),
        Expr::Quantified(_) => false,
    }
}

fn eval(expr: &Expr, node: &Node) -> Result<bool, PropError> {
    match expr {
        Expr::Lit(b) => Ok(*b),
        Expr::Atomic(prop) => prop.eval(node),
        Expr::Precedence(e) => eval(e, node),
        Expr::Not(e) => Ok(!eval(e, node)?),
        Expr::And(lhs, rhs) => Ok(eval(lhs, node)? && eval(rhs, node)?),
        Expr::Or(lhs, rhs) => Ok(eval(lhs, node)? || eval(rhs, node)?),
        Expr::Xor(lhs, rhs) => Ok(eval(lhs, node)? != eval(rhs, node)?),
        Expr::Xnor(lhs, rhs) => Ok(eval(lhs, node)? == eval(rhs, node)?),
        Expr::Implies(lhs, rhs) => Ok(!eval(lhs, node)? || eval(rhs, node)?),
        // `compile` rejects temporal subformulas
        Expr::Quantified(_) => unreachable!("temporal subformula in compiled requirement"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{PathExpr, PathOp};
    use crate::value::Value;

    fn node() -> Node {
        Node::read("Running", false, [("level", Value::Int(7))])
    }

    #[test]
    fn test_compile_and_evaluate() {
        let e = Expr::and(Expr::var_eq("level", 7i64), Expr::var_eq("level", 7i64));
        let req = Requirement::compile(&e).unwrap();
        assert_eq!(req.holds(&node()), Ok(true));
    }

    #[test]
    fn test_negation_evaluates() {
        let e = Expr::not(Expr::var_eq("level", 7i64));
        let req = Requirement::compile(&e).unwrap();
        assert_eq!(req.holds(&node()), Ok(false));
    }

    #[test]
    fn test_exclusive_connectives_evaluate() {
        let level = Expr::var_eq("level", 7i64);
        let wrong = Expr::var_eq("level", 0i64);
        let n = node();
        let xor = Requirement::compile(&Expr::xor(level.clone(), wrong.clone())).unwrap();
        assert_eq!(xor.holds(&n), Ok(true));
        let xnor = Requirement::compile(&Expr::xnor(level.clone(), wrong)).unwrap();
        assert_eq!(xnor.holds(&n), Ok(false));
        let lit = Requirement::compile(&Expr::and(level, Expr::lit(true))).unwrap();
        assert_eq!(lit.holds(&n), Ok(true));
    }

    #[test]
    fn test_temporal_shape_not_representable() {
        let e = Expr::implies(
            Expr::always(PathExpr::new(PathOp::Next(Expr::var_eq("level", 7i64)))),
            Expr::var_eq("level", 7i64),
        );
        assert!(Requirement::compile(&e).is_none());
    }
}
