//! Requirement expression AST for timed temporal formulas
//!
//! This module defines the tree representation for TCTL requirements:
//! atomic predicates over a node's variables, boolean connectives, and
//! path-quantified temporal operators with optional cost bounds. The
//! tree is finite and acyclic; cycles only ever exist in the structure
//! being checked.
//!
//! Verification runs on a normalized tree (negation pushed to atoms),
//! produced once up front by [`Expr::normalize`].

use crate::node::Node;
use crate::quantity::{CostDimension, Quantity};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A term appearing on either side of an atomic comparison
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// A literal value
    Lit(Value),
    /// A variable from the node's snapshot
    Var(Arc<str>),
    /// The currently active state name
    State,
    /// The state the machine transitions into; defined only on write nodes
    NextState,
    /// Whether the state's entry action ran this ringlet
    EntryFlag,
}

impl Term {
    /// Resolve the term against a node's snapshot
    pub fn resolve(&self, node: &Node) -> Result<Value, PropError> {
        match self {
            Term::Lit(v) => Ok(v.clone()),
            Term::Var(name) => node
                .get(name)
                .cloned()
                .ok_or_else(|| PropError::UnknownVariable(name.clone())),
            Term::State => Ok(Value::Str(node.state().clone())),
            Term::NextState => node
                .next_state()
                .cloned()
                .map(Value::Str)
                .ok_or(PropError::NextStateOnRead),
            Term::EntryFlag => Ok(Value::Bool(node.executed_on_entry())),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Lit(v) => write!(f, "{}", v),
            Term::Var(name) => write!(f, "{}", name),
            Term::State => write!(f, "currentState"),
            Term::NextState => write!(f, "nextState"),
            Term::EntryFlag => write!(f, "executeOnEntry"),
        }
    }
}

/// Comparison operator of an atomic predicate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// The operator whose truth value is the logical negation of this one
    pub fn negated(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Failure while evaluating an atomic predicate at a node
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PropError {
    #[error("variable `{0}` is not present in the node's snapshot")]
    UnknownVariable(Arc<str>),
    #[error("nextState is referenced on a read node, which has no successor state")]
    NextStateOnRead,
    #[error("values `{lhs}` and `{rhs}` have no defined ordering")]
    Incomparable { lhs: Value, rhs: Value },
}

/// An atomic predicate: one comparison between two terms
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Prop {
    pub lhs: Term,
    pub op: CmpOp,
    pub rhs: Term,
}

impl Prop {
    pub fn new(lhs: Term, op: CmpOp, rhs: Term) -> Self {
        Prop { lhs, op, rhs }
    }

    /// The predicate with the opposite truth value
    pub fn negated(&self) -> Self {
        Prop {
            lhs: self.lhs.clone(),
            op: self.op.negated(),
            rhs: self.rhs.clone(),
        }
    }

    /// Evaluate the predicate against a single node
    ///
    /// Equality and inequality are defined across all value kinds
    /// (values of different kinds are unequal); ordering comparisons
    /// require two integers or two strings.
    pub fn eval(&self, node: &Node) -> Result<bool, PropError> {
        let lhs = self.lhs.resolve(node)?;
        let rhs = self.rhs.resolve(node)?;
        match self.op {
            CmpOp::Eq => Ok(lhs == rhs),
            CmpOp::Ne => Ok(lhs != rhs),
            op => {
                let ord = lhs
                    .ordering(&rhs)
                    .ok_or(PropError::Incomparable { lhs, rhs })?;
                Ok(match op {
                    CmpOp::Lt => ord.is_lt(),
                    CmpOp::Le => ord.is_le(),
                    CmpOp::Gt => ord.is_gt(),
                    CmpOp::Ge => ord.is_ge(),
                    CmpOp::Eq | CmpOp::Ne => unreachable!(),
                })
            }
        }
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// Comparison operator of a timed cost bound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl fmt::Display for BoundOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoundOp::Lt => "<",
            BoundOp::Le => "<=",
            BoundOp::Eq => "==",
            BoundOp::Ge => ">=",
            BoundOp::Gt => ">",
        };
        f.write_str(s)
    }
}

/// A cost bound attached to a path operator, e.g. `t < 100e-9`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub dimension: CostDimension,
    pub op: BoundOp,
    pub bound: Quantity,
}

impl Constraint {
    pub fn new(dimension: CostDimension, op: BoundOp, bound: Quantity) -> Self {
        Constraint {
            dimension,
            op,
            bound,
        }
    }

    /// Whether an accumulated cost can still lead to satisfaction
    ///
    /// Upper bounds (`<`, `<=`, `==`) are violated as soon as the
    /// accumulated cost exceeds the bound by more than the granularity
    /// tolerance, regardless of logical truth further along the path.
    /// Lower bounds cannot fail en route since cost only grows.
    pub fn admits_en_route(&self, accumulated: &Quantity, granularity: &Quantity) -> bool {
        match self.op {
            BoundOp::Lt | BoundOp::Le | BoundOp::Eq => {
                *accumulated <= self.bound.add(granularity)
            }
            BoundOp::Ge | BoundOp::Gt => true,
        }
    }

    /// Whether the bound holds for the final accumulated cost,
    /// within the granularity tolerance
    pub fn holds_on_resolve(&self, accumulated: &Quantity, granularity: &Quantity) -> bool {
        let upper = self.bound.add(granularity);
        match self.op {
            BoundOp::Lt | BoundOp::Le => *accumulated <= upper,
            BoundOp::Eq => {
                *accumulated <= upper && accumulated.add(granularity) >= self.bound
            }
            BoundOp::Ge | BoundOp::Gt => accumulated.add(granularity) >= self.bound,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.dimension, self.op, self.bound)
    }
}

/// Branching quantifier: does the path formula range over every path
/// from the node, or does one witnessing path suffice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathQuantifier {
    /// Must hold along all paths (A)
    All,
    /// Must hold along at least one path (E)
    Exists,
}

impl fmt::Display for PathQuantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathQuantifier::All => f.write_str("A"),
            PathQuantifier::Exists => f.write_str("E"),
        }
    }
}

/// Temporal operator applied along a path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathOp {
    /// Holds at the immediate successor (X)
    Next(Arc<Expr>),
    /// Holds at some node along the path (F, least fixpoint)
    Finally(Arc<Expr>),
    /// Holds at every node along the path (G, greatest fixpoint)
    Globally(Arc<Expr>),
    /// First operand holds until the second does (U, least fixpoint)
    Until(Arc<Expr>, Arc<Expr>),
}

impl fmt::Display for PathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathOp::Next(e) => write!(f, "X ({})", e),
            PathOp::Finally(e) => write!(f, "F ({})", e),
            PathOp::Globally(e) => write!(f, "G ({})", e),
            PathOp::Until(hold, until) => write!(f, "({}) U ({})", hold, until),
        }
    }
}

/// A path operator with its optional cost bound
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathExpr {
    pub op: PathOp,
    pub constraint: Option<Constraint>,
}

impl PathExpr {
    pub fn new(op: PathOp) -> Self {
        PathExpr {
            op,
            constraint: None,
        }
    }

    pub fn bounded(op: PathOp, constraint: Constraint) -> Self {
        PathExpr {
            op,
            constraint: Some(constraint),
        }
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{}{{{}}}", self.op, c),
            None => write!(f, "{}", self.op),
        }
    }
}

/// A path-quantified temporal formula
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quantified {
    pub quantifier: PathQuantifier,
    pub path: PathExpr,
}

impl fmt::Display for Quantified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.quantifier, self.path)
    }
}

/// Raised by [`Expr::normalize`] when negation cannot be pushed to atoms
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("negation of a temporal operator is outside the supported fragment: !({0})")]
pub struct NormalizeError(pub Arc<Expr>);

/// A requirement expression
///
/// The tree a specification loader produces may contain `Not` anywhere;
/// [`Expr::normalize`] rewrites it into the negation-free form the
/// scheduler evaluates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A constant truth value
    Lit(bool),
    /// An atomic comparison over the node's snapshot
    Atomic(Prop),
    /// Grouping wrapper, semantically transparent
    Precedence(Arc<Expr>),
    /// Logical negation
    Not(Arc<Expr>),
    /// Conjunction
    And(Arc<Expr>, Arc<Expr>),
    /// Disjunction
    Or(Arc<Expr>, Arc<Expr>),
    /// Exclusive disjunction; rewritten into and/or by normalization
    Xor(Arc<Expr>, Arc<Expr>),
    /// Negated exclusive disjunction; rewritten like [`Expr::Xor`]
    Xnor(Arc<Expr>, Arc<Expr>),
    /// Implication
    Implies(Arc<Expr>, Arc<Expr>),
    /// Path-quantified temporal formula
    Quantified(Quantified),
}

impl Expr {
    pub fn atomic(lhs: Term, op: CmpOp, rhs: Term) -> Arc<Self> {
        Arc::new(Expr::Atomic(Prop::new(lhs, op, rhs)))
    }

    /// Shorthand for `variable == literal`
    pub fn var_eq(name: impl Into<Arc<str>>, value: impl Into<Value>) -> Arc<Self> {
        Self::atomic(Term::Var(name.into()), CmpOp::Eq, Term::Lit(value.into()))
    }

    pub fn lit(value: bool) -> Arc<Self> {
        Arc::new(Expr::Lit(value))
    }

    pub fn not(expr: Arc<Expr>) -> Arc<Self> {
        Arc::new(Expr::Not(expr))
    }

    pub fn and(lhs: Arc<Expr>, rhs: Arc<Expr>) -> Arc<Self> {
        Arc::new(Expr::And(lhs, rhs))
    }

    pub fn or(lhs: Arc<Expr>, rhs: Arc<Expr>) -> Arc<Self> {
        Arc::new(Expr::Or(lhs, rhs))
    }

    pub fn xor(lhs: Arc<Expr>, rhs: Arc<Expr>) -> Arc<Self> {
        Arc::new(Expr::Xor(lhs, rhs))
    }

    pub fn xnor(lhs: Arc<Expr>, rhs: Arc<Expr>) -> Arc<Self> {
        Arc::new(Expr::Xnor(lhs, rhs))
    }

    pub fn implies(lhs: Arc<Expr>, rhs: Arc<Expr>) -> Arc<Self> {
        Arc::new(Expr::Implies(lhs, rhs))
    }

    pub fn always(path: PathExpr) -> Arc<Self> {
        Arc::new(Expr::Quantified(Quantified {
            quantifier: PathQuantifier::All,
            path,
        }))
    }

    pub fn exists(path: PathExpr) -> Arc<Self> {
        Arc::new(Expr::Quantified(Quantified {
            quantifier: PathQuantifier::Exists,
            path,
        }))
    }

    /// Rewrite the tree into negation-free form
    ///
    /// `Not` is pushed through connectives by De Morgan's laws and
    /// absorbed into atoms by flipping the comparison operator.
    /// Double negation cancels. Negating a quantified subformula is
    /// not representable in the supported fragment and fails.
    pub fn normalize(&self) -> Result<Arc<Self>, NormalizeError> {
        self.normalize_inner(false)
    }

    fn normalize_inner(&self, negate: bool) -> Result<Arc<Self>, NormalizeError> {
        match self {
            Expr::Lit(b) => Ok(Arc::new(Expr::Lit(*b != negate))),
            Expr::Atomic(prop) => Ok(Arc::new(Expr::Atomic(if negate {
                prop.negated()
            } else {
                prop.clone()
            }))),
            // Grouping is dropped during normalization; display of the
            // original tree is unaffected
            Expr::Precedence(inner) => inner.normalize_inner(negate),
            Expr::Not(inner) => inner.normalize_inner(!negate),
            Expr::And(lhs, rhs) => {
                let lhs = lhs.normalize_inner(negate)?;
                let rhs = rhs.normalize_inner(negate)?;
                Ok(if negate {
                    Expr::or(lhs, rhs)
                } else {
                    Expr::and(lhs, rhs)
                })
            }
            Expr::Or(lhs, rhs) => {
                let lhs = lhs.normalize_inner(negate)?;
                let rhs = rhs.normalize_inner(negate)?;
                Ok(if negate {
                    Expr::and(lhs, rhs)
                } else {
                    Expr::or(lhs, rhs)
                })
            }
            // p xor q == (p && !q) || (!p && q); its negation is the
            // xnor expansion (p && q) || (!p && !q), and vice versa
            Expr::Xor(lhs, rhs) | Expr::Xnor(lhs, rhs) => {
                let exclusive = matches!(self, Expr::Xor(_, _)) != negate;
                let pl = lhs.normalize_inner(false)?;
                let nl = lhs.normalize_inner(true)?;
                let pr = rhs.normalize_inner(false)?;
                let nr = rhs.normalize_inner(true)?;
                Ok(if exclusive {
                    Expr::or(Expr::and(pl, nr), Expr::and(nl, pr))
                } else {
                    Expr::or(Expr::and(pl, pr), Expr::and(nl, nr))
                })
            }
            // !(p -> q) == p && !q
            Expr::Implies(lhs, rhs) => {
                if negate {
                    let lhs = lhs.normalize_inner(false)?;
                    let rhs = rhs.normalize_inner(true)?;
                    Ok(Expr::and(lhs, rhs))
                } else {
                    let lhs = lhs.normalize_inner(false)?;
                    let rhs = rhs.normalize_inner(false)?;
                    Ok(Expr::implies(lhs, rhs))
                }
            }
            Expr::Quantified(q) => {
                if negate {
                    return Err(NormalizeError(Arc::new(self.clone())));
                }
                let path = normalize_path(&q.path)?;
                Ok(Arc::new(Expr::Quantified(Quantified {
                    quantifier: q.quantifier,
                    path,
                })))
            }
        }
    }
}

fn normalize_path(path: &PathExpr) -> Result<PathExpr, NormalizeError> {
    let op = match &path.op {
        PathOp::Next(e) => PathOp::Next(e.normalize_inner(false)?),
        PathOp::Finally(e) => PathOp::Finally(e.normalize_inner(false)?),
        PathOp::Globally(e) => PathOp::Globally(e.normalize_inner(false)?),
        PathOp::Until(hold, until) => PathOp::Until(
            hold.normalize_inner(false)?,
            until.normalize_inner(false)?,
        ),
    };
    Ok(PathExpr {
        op,
        constraint: path.constraint.clone(),
    })
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(b) => write!(f, "{}", b),
            Expr::Atomic(prop) => write!(f, "{}", prop),
            Expr::Precedence(e) => write!(f, "({})", e),
            Expr::Not(e) => write!(f, "!({})", e),
            Expr::And(lhs, rhs) => write!(f, "({}) && ({})", lhs, rhs),
            Expr::Or(lhs, rhs) => write!(f, "({}) || ({})", lhs, rhs),
            Expr::Xor(lhs, rhs) => write!(f, "({}) xor ({})", lhs, rhs),
            Expr::Xnor(lhs, rhs) => write!(f, "({}) xnor ({})", lhs, rhs),
            Expr::Implies(lhs, rhs) => write!(f, "({}) -> ({})", lhs, rhs),
            Expr::Quantified(q) => write!(f, "{}", q),
        }
    }
}
