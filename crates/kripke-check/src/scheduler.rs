//! Obligation scheduler
//!
//! Drives recursive depth-first exploration from the initial nodes.
//! Each obligation ("expression E holds at node N") is looked up in the
//! store first, decided locally when it has a single-node truth value,
//! and otherwise unrolled: connectives spawn sibling obligations on the
//! same node, quantified operators spawn obligations on successors.
//!
//! Termination on cyclic structures rests on two mechanisms:
//!
//! - the active set of (node, expression) keys currently on the open
//!   recursion path; re-encountering a member applies the fixpoint
//!   verdict instead of recursing
//! - the store, which memoizes resolved keys so any single query is
//!   bounded by |nodes| × |subexpressions| obligations
//!
//! Two classes of verdict are exceptions to memoization and stay
//! pending in the store, kept only for trail reconstruction:
//!
//! - obligations carrying an open cost budget, whose verdict depends
//!   on the cost accumulated since the bound was opened, not on the
//!   key alone
//! - verdicts derived while a fixpoint assumption about an ancestor
//!   still on the open path is in force; these hold only if the
//!   ancestor resolves the way the cycle verdict assumed, so they are
//!   re-derived on the next query against the ancestor's settled
//!   status

use crate::error::{StoreError, VerifyError};
use crate::index::{NodeId, StructureIndex};
use crate::intern::ExprInterner;
use crate::semantics::{cycle_satisfied, evaluate_local, LocalVerdict};
use crate::store::{ObligationKey, ObligationStore, Status};
use kripke_core::{Constraint, Cost, Expr, PathOp, PathQuantifier, Quantified, Quantity, Requirement};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Why an obligation failed
///
/// `Unsatisfied` and `ConstraintViolated` are recoverable at the
/// nearest disjunctive or existential choice point; `Fatal` terminates
/// the run unconditionally.
#[derive(Debug)]
pub(crate) enum Failure {
    /// A logical condition did not hold; `at` is the obligation whose
    /// trail reconstructs the violating branch
    Unsatisfied { at: ObligationKey },
    /// Accumulated path cost broke a timed bound at `at`
    ConstraintViolated {
        at: ObligationKey,
        constraint: Constraint,
        accumulated: Quantity,
    },
    Fatal(VerifyError),
}

impl Failure {
    pub(crate) fn is_recoverable(&self) -> bool {
        !matches!(self, Failure::Fatal(_))
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Fatal(VerifyError::Store(err))
    }
}

pub(crate) type CheckResult = Result<(), Failure>;

/// Cost accumulated since a timed bound was opened
#[derive(Clone, Debug)]
struct Budget {
    constraint: Constraint,
    accumulated: Cost,
}

impl Budget {
    fn open(constraint: Constraint) -> Self {
        Budget {
            constraint,
            accumulated: Cost::zero(),
        }
    }

    fn advance(&self, cost: &Cost) -> Self {
        Budget {
            constraint: self.constraint.clone(),
            accumulated: self.accumulated.add(cost),
        }
    }

    /// Accumulated cost in the bound's dimension
    fn spent(&self) -> &Quantity {
        self.accumulated.dimension(self.constraint.dimension)
    }
}

pub(crate) struct Scheduler<'a> {
    index: &'a StructureIndex,
    interner: &'a mut ExprInterner,
    store: &'a mut dyn ObligationStore,
    /// Keys of quantified obligations on the open recursion path
    active: FxHashSet<ObligationKey>,
    /// Active keys whose fixpoint verdict has been assumed somewhere
    /// below them on the open path; emptied as their frames close
    assumed: FxHashSet<ObligationKey>,
}

impl<'a> Scheduler<'a> {
    pub(crate) fn new(
        index: &'a StructureIndex,
        interner: &'a mut ExprInterner,
        store: &'a mut dyn ObligationStore,
    ) -> Self {
        Scheduler {
            index,
            interner,
            store,
            active: FxHashSet::default(),
            assumed: FxHashSet::default(),
        }
    }

    /// Check a top-level requirement at an initial node
    pub(crate) fn check_root(&mut self, node: NodeId, expr: &Arc<Expr>) -> CheckResult {
        self.check(node, expr, None)
    }

    /// Check an obligation without an open cost budget
    fn check(
        &mut self,
        node: NodeId,
        expr: &Arc<Expr>,
        predecessor: Option<ObligationKey>,
    ) -> CheckResult {
        let key = ObligationKey::new(node, self.interner.intern(expr));
        trace!(%key, expr = %expr, "checking obligation");

        // Fixpoint: the pair is already on the open recursion path
        if self.active.contains(&key) {
            return match &**expr {
                Expr::Quantified(q) => {
                    self.assumed.insert(key);
                    if cycle_satisfied(&q.path.op) {
                        Ok(())
                    } else {
                        Err(Failure::Unsatisfied { at: key })
                    }
                }
                // only quantified obligations re-inject themselves
                _ => Err(Failure::Fatal(VerifyError::Inconsistent(format!(
                    "cycle through non-temporal obligation {}",
                    key
                )))),
            };
        }

        // Memoized result from an earlier visit. A constraint-violated
        // verdict is re-derived instead of reused so the failure
        // carries the violating cost and bound; derivation is
        // deterministic, so the re-resolution is idempotent.
        match self.store.get(key)? {
            Some(Status::Satisfied) => return Ok(()),
            Some(Status::Violated) => return Err(Failure::Unsatisfied { at: key }),
            Some(Status::ConstraintViolated) | Some(Status::Pending) | None => {}
        }

        self.store.insert_pending(key, predecessor)?;

        match evaluate_local(expr, self.index.node(node)).map_err(Failure::Fatal)? {
            LocalVerdict::Satisfied => return self.settle(key, Ok(())),
            LocalVerdict::Unsatisfied => {
                return self.settle(key, Err(Failure::Unsatisfied { at: key }))
            }
            LocalVerdict::NotLocal => {}
        }

        match &**expr {
            Expr::And(lhs, rhs) => {
                let result = self
                    .check(node, lhs, Some(key))
                    .and_then(|_| self.check(node, rhs, Some(key)));
                self.settle(key, result)
            }
            Expr::Or(lhs, rhs) => {
                let result = match self.check(node, lhs, Some(key)) {
                    Ok(()) => Ok(()),
                    Err(f) if f.is_recoverable() => self.check(node, rhs, Some(key)),
                    Err(fatal) => Err(fatal),
                };
                self.settle(key, result)
            }
            Expr::Implies(lhs, rhs) => {
                let Some(antecedent) = Requirement::compile(lhs) else {
                    return Err(Failure::Fatal(VerifyError::NotSupported(format!(
                        "implication antecedent `{}` contains a temporal operator",
                        lhs
                    ))));
                };
                match antecedent.holds(self.index.node(node)) {
                    // vacuously satisfied, no successor obligation
                    Ok(false) => self.settle(key, Ok(())),
                    Ok(true) => {
                        let result = self.check(node, rhs, Some(key));
                        self.settle(key, result)
                    }
                    Err(err) => Err(Failure::Fatal(VerifyError::NotSupported(format!(
                        "implication antecedent `{}` cannot be evaluated: {}",
                        lhs, err
                    )))),
                }
            }
            Expr::Precedence(inner) => {
                let result = self.check(node, inner, Some(key));
                self.settle(key, result)
            }
            Expr::Quantified(q) => {
                let budget = q.path.constraint.clone().map(Budget::open);
                self.active.insert(key);
                let result = self.process_quantified(key, expr, q, budget);
                self.active.remove(&key);
                // assumptions about this key are discharged by its own
                // fixpoint verdict
                self.assumed.remove(&key);
                self.settle(key, result)
            }
            // a bare negation that survives normalization wraps a
            // temporal operator, which the fragment does not support
            Expr::Not(inner) => Err(Failure::Fatal(VerifyError::NotSupported(format!(
                "negation of a temporal operator: !({})",
                inner
            )))),
            // normalization expands these into and/or before the
            // scheduler runs
            Expr::Xor(_, _) | Expr::Xnor(_, _) => Err(Failure::Fatal(VerifyError::Inconsistent(
                format!("unnormalized exclusive connective reached the scheduler: {}", expr),
            ))),
            // literals and atomic expressions always have a local verdict
            Expr::Lit(_) | Expr::Atomic(_) => {
                unreachable!("local obligation fell through local evaluation")
            }
        }
    }

    /// Record the obligation's terminal status and propagate the result
    ///
    /// A verdict reached through a fixpoint assumption about an
    /// ancestor still on the open path is provisional: the entry stays
    /// pending and the next query re-derives it against the ancestor's
    /// settled status.
    fn settle(&mut self, key: ObligationKey, result: CheckResult) -> CheckResult {
        if !self.assumed.is_empty() {
            trace!(%key, "verdict under an open fixpoint assumption, left pending");
            return result;
        }
        match &result {
            Ok(()) => {
                self.store.resolve(key, Status::Satisfied)?;
                debug!(%key, "obligation satisfied");
            }
            Err(Failure::Unsatisfied { .. }) => {
                self.store.resolve(key, Status::Violated)?;
                debug!(%key, "obligation violated");
            }
            Err(Failure::ConstraintViolated { .. }) => {
                self.store.resolve(key, Status::ConstraintViolated)?;
                debug!(%key, "obligation violated a timed bound");
            }
            Err(Failure::Fatal(_)) => {}
        }
        result
    }

    /// Unroll a quantified operator at `key.node`
    ///
    /// The local part of a fixpoint operator is checked here at the
    /// current node; what remains is re-injected onto every (or, for
    /// an existential quantifier, some) successor.
    fn process_quantified(
        &mut self,
        key: ObligationKey,
        expr: &Arc<Expr>,
        q: &Quantified,
        budget: Option<Budget>,
    ) -> CheckResult {
        match &q.path.op {
            // G e: e must hold here, on every path through this node
            PathOp::Globally(e) => self.check(key.node, e, Some(key))?,
            // F e: reaching e here resolves the obligation, provided
            // an attached bound holds for the cost spent so far
            PathOp::Finally(e) => match self.check(key.node, e, Some(key)) {
                Ok(()) => {
                    if self.bound_met(&budget) {
                        return Ok(());
                    }
                    // goal reached before a lower bound; keep unrolling
                }
                Err(f) if f.is_recoverable() => {}
                Err(fatal) => return Err(fatal),
            },
            // e1 U e2: e2 resolves, otherwise e1 must hold to continue
            PathOp::Until(hold, until) => match self.check(key.node, until, Some(key)) {
                Ok(()) => {
                    if self.bound_met(&budget) {
                        return Ok(());
                    }
                }
                Err(f) if f.is_recoverable() => self.check(key.node, hold, Some(key))?,
                Err(fatal) => return Err(fatal),
            },
            PathOp::Next(_) => {}
        }

        let index = self.index;
        let successors = index.successors(key.node);

        // A path ending here: a for-all next is vacuous and an
        // existential next has no witness, bound or not
        if successors.is_empty() {
            if let PathOp::Next(_) = &q.path.op {
                return match q.quantifier {
                    PathQuantifier::All => Ok(()),
                    PathQuantifier::Exists => Err(Failure::Unsatisfied { at: key }),
                };
            }
            // A fixpoint resolves where the path ends, and that is
            // where an attached lower or exact bound is checked
            if let Some(b) = &budget {
                if let Some(failure) = self.shortfall(key, b) {
                    return Err(failure);
                }
            }
            // a globally holds (its local part was just checked), a
            // finally or until never reaches its goal
            return match &q.path.op {
                PathOp::Globally(_) => Ok(()),
                _ => Err(Failure::Unsatisfied { at: key }),
            };
        }

        match q.quantifier {
            PathQuantifier::All => {
                // first failing successor short-circuits the rest
                for (succ, cost) in successors {
                    self.try_successor(key, expr, q, &budget, *succ, cost)?;
                }
                Ok(())
            }
            PathQuantifier::Exists => {
                // first satisfying successor short-circuits the rest
                let mut last = None;
                for (succ, cost) in successors {
                    match self.try_successor(key, expr, q, &budget, *succ, cost) {
                        Ok(()) => return Ok(()),
                        Err(f) if f.is_recoverable() => last = Some(f),
                        Err(fatal) => return Err(fatal),
                    }
                }
                match last {
                    Some(failure) => Err(failure),
                    None => Err(Failure::Unsatisfied { at: key }),
                }
            }
        }
    }

    /// One successor step of a quantified obligation
    fn try_successor(
        &mut self,
        key: ObligationKey,
        expr: &Arc<Expr>,
        q: &Quantified,
        budget: &Option<Budget>,
        succ: NodeId,
        cost: &Cost,
    ) -> CheckResult {
        let succ_key = match &q.path.op {
            PathOp::Next(e) => ObligationKey::new(succ, self.interner.intern(e)),
            _ => ObligationKey::new(succ, key.expr),
        };

        // Charge the traversed edge and check the bound before looking
        // at logical truth
        let budget = match budget {
            Some(b) => {
                let advanced = b.advance(cost);
                let granularity = self.index.granularity(advanced.constraint.dimension);
                if !advanced
                    .constraint
                    .admits_en_route(advanced.spent(), granularity)
                {
                    self.store.insert_pending(succ_key, Some(key))?;
                    return Err(Failure::ConstraintViolated {
                        at: succ_key,
                        constraint: advanced.constraint.clone(),
                        accumulated: advanced.spent().clone(),
                    });
                }
                Some(advanced)
            }
            None => None,
        };

        match &q.path.op {
            PathOp::Next(e) => {
                // a next obligation resolves exactly one edge out
                if let Some(b) = &budget {
                    if let Some(failure) = self.shortfall(succ_key, b) {
                        self.store.insert_pending(succ_key, Some(key))?;
                        return Err(failure);
                    }
                }
                self.check(succ, e, Some(key))
            }
            PathOp::Finally(_) | PathOp::Globally(_) | PathOp::Until(_, _) => {
                match budget {
                    // re-injection under an open budget bypasses
                    // memoization; the entry stays pending, kept only
                    // for its trail link
                    Some(b) => {
                        if self.active.contains(&succ_key) {
                            // the looping path resolves here; its bound
                            // is checked before the fixpoint verdict
                            if let Some(failure) = self.shortfall(succ_key, &b) {
                                return Err(failure);
                            }
                            self.assumed.insert(succ_key);
                            return if cycle_satisfied(&q.path.op) {
                                Ok(())
                            } else {
                                Err(Failure::Unsatisfied { at: succ_key })
                            };
                        }
                        self.store.insert_pending(succ_key, Some(key))?;
                        self.active.insert(succ_key);
                        let result = self.process_quantified(succ_key, expr, q, Some(b));
                        self.active.remove(&succ_key);
                        self.assumed.remove(&succ_key);
                        result
                    }
                    None => self.check(succ, expr, Some(key)),
                }
            }
        }
    }

    /// The failure for a bound the final accumulated cost does not
    /// meet; `None` while the bound holds. Only lower (`>`, `>=`) and
    /// exact (`==`) bounds can still fail here, since an excess over an
    /// upper bound is caught en route.
    fn shortfall(&self, at: ObligationKey, budget: &Budget) -> Option<Failure> {
        let granularity = self.index.granularity(budget.constraint.dimension);
        if budget.constraint.holds_on_resolve(budget.spent(), granularity) {
            None
        } else {
            Some(Failure::ConstraintViolated {
                at,
                constraint: budget.constraint.clone(),
                accumulated: budget.spent().clone(),
            })
        }
    }

    /// Whether the accumulated cost already meets an attached bound
    /// (trivially true without one)
    fn bound_met(&self, budget: &Option<Budget>) -> bool {
        match budget {
            Some(b) => {
                let granularity = self.index.granularity(b.constraint.dimension);
                b.constraint.holds_on_resolve(b.spent(), granularity)
            }
            None => true,
        }
    }
}
