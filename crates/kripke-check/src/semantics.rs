//! Node-local expression evaluation
//!
//! A subexpression with no temporal operator has a truth value at a
//! single node and is decided here without touching successors.
//! Anything else is handed back to the scheduler, which unrolls
//! temporal operators across edges.

use crate::error::VerifyError;
use kripke_core::{Expr, Node, PathOp, Requirement};
use std::sync::Arc;

/// Outcome of evaluating an expression against one node in isolation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LocalVerdict {
    Satisfied,
    Unsatisfied,
    /// The expression contains a temporal operator and has no
    /// single-node truth value
    NotLocal,
}

/// Evaluate an expression at a node without exploring successors
///
/// A term error (unknown variable, next-state reference on a read
/// node, ordering of unordered values) means the requirement is
/// outside the supported fragment for this structure and is fatal
/// to the run, never a pass or fail.
pub(crate) fn evaluate_local(expr: &Arc<Expr>, node: &Node) -> Result<LocalVerdict, VerifyError> {
    let Some(requirement) = Requirement::compile(expr) else {
        return Ok(LocalVerdict::NotLocal);
    };
    match requirement.holds(node) {
        Ok(true) => Ok(LocalVerdict::Satisfied),
        Ok(false) => Ok(LocalVerdict::Unsatisfied),
        Err(err) => Err(VerifyError::NotSupported(format!(
            "`{}` cannot be evaluated at node {}: {}",
            expr,
            node.fingerprint(),
            err
        ))),
    }
}

/// Fixpoint verdict when an obligation re-encounters its own
/// (node, expression) pair on the active exploration path
///
/// A `globally` that loops without violation holds (greatest
/// fixpoint); a `finally` or `until` that loops without reaching its
/// goal has no path to satisfaction within the cycle (least
/// fixpoint). `next` never re-injects itself and cannot cycle.
pub(crate) fn cycle_satisfied(op: &PathOp) -> bool {
    match op {
        PathOp::Globally(_) => true,
        PathOp::Finally(_) | PathOp::Until(_, _) => false,
        PathOp::Next(_) => false,
    }
}
