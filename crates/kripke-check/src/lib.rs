//! Timed-CTL verification engine for ringlet Kripke structures
//!
//! Verifies TCTL requirements against Kripke structures whose nodes are
//! read/write snapshots of finite state machine executions. Exploration
//! is a single-threaded recursive descent from the initial nodes,
//! memoized per (node, expression) pair, with explicit cycle detection
//! for the fixpoint operators and exact scientific-notation arithmetic
//! for timed cost bounds.
//!
//! ```no_run
//! use kripke_check::{Verifier, VerifyConfig};
//! use kripke_core::{Expr, PathExpr, PathOp, Structure};
//!
//! # fn load_structure() -> Structure { Structure::default() }
//! let structure = load_structure();
//! let requirement = Expr::always(PathExpr::new(PathOp::Globally(
//!     Expr::var_eq("failed", false),
//! )));
//!
//! let verifier = Verifier::new(VerifyConfig::default());
//! match verifier.verify(&structure, &[requirement]) {
//!     Ok(()) => println!("all requirements hold"),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

pub mod counterexample;
pub mod error;
pub mod index;
pub mod intern;
pub mod store;
pub mod verifier;

mod scheduler;
mod semantics;

pub use counterexample::{
    AnnotatedEdge, AnnotatedNode, AnnotatedStructure, CounterexampleReport, ViolationKind,
};
pub use error::{Result, StoreError, VerifyError};
pub use index::{NodeId, StructureIndex};
pub use intern::{ExprId, ExprInterner};
pub use store::{DiskStore, MemoryStore, ObligationKey, ObligationStore, Status};
pub use verifier::{StoreBackend, Verifier, VerifyConfig};
