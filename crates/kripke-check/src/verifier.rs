//! Verification entry point
//!
//! [`Verifier::verify`] is the single synchronous call: it indexes the
//! structure, pushes every requirement onto every initial node, and
//! returns on the first requirement that fails with a fully
//! reconstructed counterexample. Requirements are verified
//! independently in order; the store and interner are shared across
//! them so subexpression verdicts carry over within the batch.

use crate::counterexample::{build_report, CounterexampleReport, ViolationKind};
use crate::error::{Result, VerifyError};
use crate::index::StructureIndex;
use crate::intern::ExprInterner;
use crate::scheduler::{Failure, Scheduler};
use crate::store::{DiskStore, MemoryStore, ObligationStore};
use kripke_core::{Expr, Structure};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Which obligation store backend a run uses
#[derive(Clone, Debug, Default)]
pub enum StoreBackend {
    /// Hash table in memory, the default
    #[default]
    InMemory,
    /// Fixed-width-record file, for structures whose (node, expression)
    /// pairs exceed RAM. With no path, a uniquely named file under the
    /// system temp directory is used.
    OnDisk { path: Option<PathBuf> },
}

/// Run configuration
#[derive(Clone, Debug, Default)]
pub struct VerifyConfig {
    pub store: StoreBackend,
    /// Retain at most this many trailing nodes of a counterexample
    /// branch, dropping older nodes from the front. `None` keeps the
    /// whole branch.
    pub branch_cap: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Verifier {
    config: VerifyConfig,
}

impl Verifier {
    pub fn new(config: VerifyConfig) -> Self {
        Verifier { config }
    }

    /// Verify requirements whose count must match the number of
    /// requested requirement sources
    ///
    /// A mismatch means the specification loader dropped or duplicated
    /// a requirement and is fatal before any exploration starts.
    pub fn verify_counted(
        &self,
        structure: &Structure,
        requirements: &[Arc<Expr>],
        expected_sources: usize,
    ) -> Result<()> {
        if requirements.len() != expected_sources {
            return Err(VerifyError::CountMismatch {
                expected: expected_sources,
                actual: requirements.len(),
            });
        }
        self.verify(structure, requirements)
    }

    /// Verify every requirement against every initial node
    ///
    /// Returns `Ok(())` when all requirements hold, or the first
    /// failure: a [`VerifyError::Violation`] carrying the violating
    /// requirement and its reconstructed branch, or a fatal input or
    /// engine error.
    pub fn verify(&self, structure: &Structure, requirements: &[Arc<Expr>]) -> Result<()> {
        let index = StructureIndex::build(structure)?;
        info!(
            nodes = index.node_count(),
            edges = index.edge_count(),
            initial = index.initial().len(),
            "structure indexed"
        );

        let mut store: Box<dyn ObligationStore> = match &self.config.store {
            StoreBackend::InMemory => Box::new(MemoryStore::new()),
            StoreBackend::OnDisk { path: Some(path) } => Box::new(DiskStore::create(path)?),
            StoreBackend::OnDisk { path: None } => Box::new(DiskStore::create_temp()?),
        };
        let mut interner = ExprInterner::new();

        for requirement in requirements {
            debug!(requirement = %requirement, "verifying requirement");
            let normalized = requirement
                .normalize()
                .map_err(|err| VerifyError::NotSupported(err.to_string()))?;

            for &initial in index.initial() {
                let mut scheduler = Scheduler::new(&index, &mut interner, store.as_mut());
                match scheduler.check_root(initial, &normalized) {
                    Ok(()) => {}
                    Err(Failure::Unsatisfied { at }) => {
                        let report = build_report(
                            &index,
                            store.as_mut(),
                            at,
                            requirement,
                            ViolationKind::Unsatisfied,
                            self.config.branch_cap,
                        )?;
                        return Err(violation(report));
                    }
                    Err(Failure::ConstraintViolated {
                        at,
                        constraint,
                        accumulated,
                    }) => {
                        let report = build_report(
                            &index,
                            store.as_mut(),
                            at,
                            requirement,
                            ViolationKind::CostExceeded {
                                dimension: constraint.dimension,
                                op: constraint.op,
                                accumulated,
                                bound: constraint.bound,
                            },
                            self.config.branch_cap,
                        )?;
                        return Err(violation(report));
                    }
                    Err(Failure::Fatal(err)) => return Err(err),
                }
            }
            debug!(requirement = %requirement, "requirement holds");
        }
        Ok(())
    }
}

fn violation(report: CounterexampleReport) -> VerifyError {
    info!(%report, "requirement violated");
    VerifyError::Violation(Box::new(report))
}
