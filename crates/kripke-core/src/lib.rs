//! Core data model for timed Kripke-structure verification
//!
//! This crate defines the value, cost, node, and expression types shared
//! by the verification engine in `kripke-check`:
//!
//! - [`value`]: variable snapshot values (booleans, integers, strings)
//! - [`quantity`]: exact scientific-notation scalars and two-dimensional
//!   transition costs
//! - [`node`]: ringlet snapshots, edges, and the Kripke structure
//! - [`expr`]: the TCTL requirement expression tree
//! - [`requirement`]: non-temporal predicates compiled for eager
//!   single-node evaluation
//!
//! Everything here is immutable plain data; the exploration algorithms
//! live in `kripke-check`.

pub mod expr;
pub mod node;
pub mod quantity;
pub mod requirement;
pub mod value;

pub use expr::{
    BoundOp, CmpOp, Constraint, Expr, PathExpr, PathOp, PathQuantifier, Prop, PropError,
    Quantified, Term,
};
pub use node::{Edge, Fingerprint, Node, NodeKind, Structure};
pub use quantity::{Cost, CostDimension, Quantity};
pub use requirement::Requirement;
pub use value::Value;
