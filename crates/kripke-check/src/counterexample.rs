//! Counterexample reconstruction
//!
//! When an obligation resolves violated, the trail of predecessor links
//! in the store is walked back to an initial node and turned into an
//! ordered branch of structure nodes. Consecutive obligations on the
//! same node (spawned by connectives rather than edges) collapse into
//! one step, and every remaining step is checked against a real edge
//! in the original structure. A trail that crosses no real edge is an
//! engine bug, not a verification outcome.

use crate::error::VerifyError;
use crate::index::{NodeId, StructureIndex};
use crate::store::{ObligationKey, ObligationStore};
use kripke_core::{BoundOp, Cost, CostDimension, Edge, Expr, Node, Quantity, Structure};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Why the branch violates the requirement
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// A logical condition failed at the branch's final node
    Unsatisfied,
    /// The accumulated path cost broke a timed bound before the
    /// logical condition was met
    CostExceeded {
        dimension: CostDimension,
        op: BoundOp,
        accumulated: Quantity,
        bound: Quantity,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Unsatisfied => f.write_str("unsatisfied"),
            ViolationKind::CostExceeded {
                dimension,
                op,
                accumulated,
                bound,
            } => write!(
                f,
                "accumulated {} cost {} breaks the bound {} {} {}",
                dimension, accumulated, dimension, op, bound
            ),
        }
    }
}

/// A reconstructed violating branch, ready for external rendering
#[derive(Clone, Debug)]
pub struct CounterexampleReport {
    /// The requirement that did not hold
    pub requirement: Arc<Expr>,
    pub kind: ViolationKind,
    /// Ordered nodes from an initial node (or the oldest retained node
    /// when capped) to the failing node
    pub branch: Vec<Node>,
    /// Edge costs between consecutive branch nodes
    pub costs: Vec<Cost>,
    /// Whether older nodes were dropped from the front by the branch cap
    pub truncated: bool,
}

/// The full structure with every node and edge marked as on or off the
/// violating branch
///
/// The alternative to [`CounterexampleReport::induced_structure`] for
/// renderers that show the failure in context. With a capped branch
/// only the retained trailing nodes are marked.
#[derive(Clone, Debug)]
pub struct AnnotatedStructure {
    pub nodes: Vec<AnnotatedNode>,
    pub initial: Vec<Node>,
}

#[derive(Clone, Debug)]
pub struct AnnotatedNode {
    pub node: Node,
    pub on_branch: bool,
    pub edges: Vec<AnnotatedEdge>,
}

#[derive(Clone, Debug)]
pub struct AnnotatedEdge {
    pub edge: Edge,
    pub on_branch: bool,
}

impl CounterexampleReport {
    /// Mark every node and edge of the explored structure with its
    /// branch membership
    pub fn annotated_structure(&self, structure: &Structure) -> AnnotatedStructure {
        let on_branch: FxHashSet<&Node> = self.branch.iter().collect();
        let crossed: FxHashSet<(&Node, &Node)> = self
            .branch
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .collect();
        let nodes = structure
            .edges
            .iter()
            .map(|(node, edges)| AnnotatedNode {
                node: node.clone(),
                on_branch: on_branch.contains(node),
                edges: edges
                    .iter()
                    .map(|edge| AnnotatedEdge {
                        on_branch: crossed.contains(&(node, &edge.target)),
                        edge: edge.clone(),
                    })
                    .collect(),
            })
            .collect();
        AnnotatedStructure {
            nodes,
            initial: structure.initial.clone(),
        }
    }

    /// The sub-structure induced by the branch: its nodes, the edges
    /// actually crossed, and the branch head as the sole initial node
    pub fn induced_structure(&self) -> Structure {
        let mut edges: Vec<(Node, Vec<Edge>)> = Vec::with_capacity(self.branch.len());
        for (i, node) in self.branch.iter().enumerate() {
            let mut out = Vec::new();
            if let (Some(next), Some(cost)) = (self.branch.get(i + 1), self.costs.get(i)) {
                out.push(Edge::new(next.clone(), cost.clone()));
            }
            if let Some((_, existing)) = edges.iter_mut().find(|(n, _)| n == node) {
                existing.extend(out);
            } else {
                edges.push((node.clone(), out));
            }
        }
        let initial = self.branch.first().cloned().into_iter().collect();
        Structure::new(edges, initial)
    }
}

impl fmt::Display for CounterexampleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "requirement does not hold: {}", self.requirement)?;
        writeln!(f, "cause: {}", self.kind)?;
        if self.truncated {
            writeln!(f, "branch (oldest nodes dropped):")?;
        } else {
            writeln!(f, "branch:")?;
        }
        for (i, node) in self.branch.iter().enumerate() {
            if i > 0 {
                writeln!(f, "   | cost {}", self.costs[i - 1])?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

/// Walk predecessor links from the failing obligation back to the
/// first-discovered ancestor and assemble the report
pub(crate) fn build_report(
    index: &StructureIndex,
    store: &mut dyn ObligationStore,
    failing: ObligationKey,
    requirement: &Arc<Expr>,
    kind: ViolationKind,
    branch_cap: Option<usize>,
) -> Result<CounterexampleReport, VerifyError> {
    // Trail keys, failing obligation first
    let mut keys: SmallVec<[ObligationKey; 16]> = SmallVec::new();
    let mut seen: FxHashSet<ObligationKey> = FxHashSet::default();
    let mut current = failing;
    loop {
        if !seen.insert(current) {
            return Err(VerifyError::Inconsistent(format!(
                "predecessor links cycle through obligation {}",
                current
            )));
        }
        keys.push(current);
        match store.predecessor(current)? {
            Some(pred) => current = pred,
            None => break,
        }
    }
    keys.reverse();

    // Obligations spawned within one node collapse into a single step
    let mut ids: Vec<NodeId> = Vec::with_capacity(keys.len());
    for key in &keys {
        if ids.last() != Some(&key.node) {
            ids.push(key.node);
        }
    }

    // Every step of the trail must be a real transition
    let mut costs = Vec::with_capacity(ids.len().saturating_sub(1));
    for pair in ids.windows(2) {
        let cost = index
            .successors(pair[0])
            .iter()
            .find(|(target, _)| *target == pair[1])
            .map(|(_, cost)| cost.clone())
            .ok_or_else(|| {
                VerifyError::Inconsistent(format!(
                    "trail step {} -> {} does not correspond to an edge in the structure",
                    pair[0], pair[1]
                ))
            })?;
        costs.push(cost);
    }

    let mut truncated = false;
    if let Some(cap) = branch_cap {
        let cap = cap.max(1);
        if ids.len() > cap {
            let drop = ids.len() - cap;
            ids.drain(..drop);
            costs.drain(..drop);
            truncated = true;
        }
    }

    let branch = ids.iter().map(|&id| index.node(id).clone()).collect();
    Ok(CounterexampleReport {
        requirement: requirement.clone(),
        kind,
        branch,
        costs,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::ExprId;
    use crate::store::{MemoryStore, Status};
    use kripke_core::Value;

    fn read(state: &str) -> Node {
        Node::read(state, false, [("x", Value::Int(0))])
    }

    fn structure_chain() -> (Structure, Vec<Node>) {
        let a = read("A");
        let b = read("B");
        let c = read("C");
        let cost = Cost::new(Quantity::new(1, -6), Quantity::zero());
        let s = Structure::new(
            vec![
                (a.clone(), vec![Edge::new(b.clone(), cost.clone())]),
                (b.clone(), vec![Edge::new(c.clone(), cost)]),
                (c.clone(), vec![]),
            ],
            vec![a.clone()],
        );
        (s, vec![a, b, c])
    }

    fn key(node: u32, expr: u32) -> ObligationKey {
        ObligationKey::new(NodeId(node), ExprId(expr))
    }

    #[test]
    fn test_branch_follows_trail_and_collapses_same_node_links() {
        let (s, nodes) = structure_chain();
        let index = StructureIndex::build(&s).unwrap();
        let mut store = MemoryStore::new();
        // two obligations on node 0 (connective + quantified), then edges
        store.insert_pending(key(0, 0), None).unwrap();
        store.insert_pending(key(0, 1), Some(key(0, 0))).unwrap();
        store.insert_pending(key(1, 1), Some(key(0, 1))).unwrap();
        store.insert_pending(key(2, 2), Some(key(1, 1))).unwrap();
        store.resolve(key(2, 2), Status::Violated).unwrap();

        let req = Expr::var_eq("x", 1i64);
        let report = build_report(
            &index,
            &mut store,
            key(2, 2),
            &req,
            ViolationKind::Unsatisfied,
            None,
        )
        .unwrap();
        assert_eq!(report.branch, nodes);
        assert_eq!(report.costs.len(), 2);
        assert!(!report.truncated);
    }

    #[test]
    fn test_branch_cap_drops_oldest_nodes() {
        let (s, nodes) = structure_chain();
        let index = StructureIndex::build(&s).unwrap();
        let mut store = MemoryStore::new();
        store.insert_pending(key(0, 0), None).unwrap();
        store.insert_pending(key(1, 0), Some(key(0, 0))).unwrap();
        store.insert_pending(key(2, 0), Some(key(1, 0))).unwrap();

        let req = Expr::var_eq("x", 1i64);
        let report = build_report(
            &index,
            &mut store,
            key(2, 0),
            &req,
            ViolationKind::Unsatisfied,
            Some(2),
        )
        .unwrap();
        assert_eq!(report.branch, nodes[1..]);
        assert_eq!(report.costs.len(), 1);
        assert!(report.truncated);
    }

    #[test]
    fn test_trail_without_real_edge_is_inconsistent() {
        let (s, _) = structure_chain();
        let index = StructureIndex::build(&s).unwrap();
        let mut store = MemoryStore::new();
        // node 2 has no edge back to node 0
        store.insert_pending(key(2, 0), None).unwrap();
        store.insert_pending(key(0, 0), Some(key(2, 0))).unwrap();

        let req = Expr::var_eq("x", 1i64);
        let result = build_report(
            &index,
            &mut store,
            key(0, 0),
            &req,
            ViolationKind::Unsatisfied,
            None,
        );
        assert!(matches!(result, Err(VerifyError::Inconsistent(_))));
    }

    #[test]
    fn test_annotated_structure_marks_branch_membership() {
        // fork: the trail crosses A -> B, leaving C and A -> C off it
        let a = read("A");
        let b = read("B");
        let c = read("C");
        let cost = Cost::new(Quantity::new(1, -6), Quantity::zero());
        let s = Structure::new(
            vec![
                (
                    a.clone(),
                    vec![
                        Edge::new(b.clone(), cost.clone()),
                        Edge::new(c.clone(), cost),
                    ],
                ),
                (b.clone(), vec![]),
                (c.clone(), vec![]),
            ],
            vec![a.clone()],
        );
        let index = StructureIndex::build(&s).unwrap();
        let mut store = MemoryStore::new();
        store.insert_pending(key(0, 0), None).unwrap();
        store.insert_pending(key(1, 0), Some(key(0, 0))).unwrap();

        let req = Expr::var_eq("x", 1i64);
        let report = build_report(
            &index,
            &mut store,
            key(1, 0),
            &req,
            ViolationKind::Unsatisfied,
            None,
        )
        .unwrap();
        let annotated = report.annotated_structure(&s);
        assert_eq!(annotated.nodes.len(), 3);
        assert_eq!(annotated.initial, vec![a.clone()]);
        let at_a = annotated.nodes.iter().find(|n| n.node == a).unwrap();
        assert!(at_a.on_branch);
        assert!(at_a.edges.iter().find(|e| e.edge.target == b).unwrap().on_branch);
        assert!(!at_a.edges.iter().find(|e| e.edge.target == c).unwrap().on_branch);
        assert!(annotated.nodes.iter().find(|n| n.node == b).unwrap().on_branch);
        assert!(!annotated.nodes.iter().find(|n| n.node == c).unwrap().on_branch);
    }

    #[test]
    fn test_induced_structure_restricted_to_branch() {
        let (s, nodes) = structure_chain();
        let index = StructureIndex::build(&s).unwrap();
        let mut store = MemoryStore::new();
        store.insert_pending(key(0, 0), None).unwrap();
        store.insert_pending(key(1, 0), Some(key(0, 0))).unwrap();

        let req = Expr::var_eq("x", 1i64);
        let report = build_report(
            &index,
            &mut store,
            key(1, 0),
            &req,
            ViolationKind::Unsatisfied,
            None,
        )
        .unwrap();
        let induced = report.induced_structure();
        assert_eq!(induced.node_count(), 2);
        assert_eq!(induced.edge_count(), 1);
        assert_eq!(induced.initial, vec![nodes[0].clone()]);
        assert!(induced.has_edge(&nodes[0], &nodes[1]));
    }
}
