//! Expression interning
//!
//! Every distinct subexpression encountered during a run gets a dense
//! [`ExprId`]. Obligation keys are (node id, expression id) pairs, so
//! interning is what bounds the store by |nodes| × |subexpressions| and
//! makes key comparison a pair of integer compares.

use kripke_core::Expr;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of an interned expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Deduplicating arena of expressions
#[derive(Default)]
pub struct ExprInterner {
    ids: FxHashMap<Arc<Expr>, ExprId>,
    exprs: Vec<Arc<Expr>>,
}

impl ExprInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an expression, returning the id of the canonical copy
    pub fn intern(&mut self, expr: &Arc<Expr>) -> ExprId {
        if let Some(&id) = self.ids.get(expr) {
            return id;
        }
        let id = ExprId(self.exprs.len() as u32);
        self.ids.insert(expr.clone(), id);
        self.exprs.push(expr.clone());
        id
    }

    pub fn resolve(&self, id: ExprId) -> &Arc<Expr> {
        &self.exprs[id.index()]
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structurally_equal_expressions_share_an_id() {
        let mut interner = ExprInterner::new();
        let a = Expr::var_eq("x", 1i64);
        let b = Expr::var_eq("x", 1i64);
        let id_a = interner.intern(&a);
        let id_b = interner.intern(&b);
        assert_eq!(id_a, id_b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_distinct_expressions_get_distinct_ids() {
        let mut interner = ExprInterner::new();
        let id_a = interner.intern(&Expr::var_eq("x", 1i64));
        let id_b = interner.intern(&Expr::var_eq("x", 2i64));
        assert_ne!(id_a, id_b);
        assert_eq!(interner.resolve(id_a).to_string(), "x == 1");
    }
}
