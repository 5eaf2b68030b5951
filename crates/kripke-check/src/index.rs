//! Identifier-addressed view of a Kripke structure
//!
//! The index assigns each distinct node a stable [`NodeId`] in first
//! encounter order, stores adjacency by identifier, and derives the
//! per-dimension granularity tolerances used for timed bound checks.
//! It is built once per verification run and never mutated afterwards.

use crate::error::VerifyError;
use kripke_core::{Cost, CostDimension, Node, Quantity, Structure};
use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a node within a [`StructureIndex`]
///
/// Identifiers are dense, assigned in structure iteration order, and
/// never reused within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Read-only identifier-addressed view of a structure
pub struct StructureIndex {
    /// Node arena; `NodeId` indexes into it
    nodes: Vec<Node>,
    /// Reverse lookup from node content to its identifier
    ids: FxHashMap<Node, NodeId>,
    /// Outgoing edges per node, parallel to `nodes`
    adjacency: Vec<Vec<(NodeId, Cost)>>,
    /// Identifiers of the designated initial nodes
    initial: Vec<NodeId>,
    time_granularity: Quantity,
    energy_granularity: Quantity,
}

impl StructureIndex {
    /// Build the index from a structure
    ///
    /// Fails with [`VerifyError::Inconsistent`] when an edge targets a
    /// node without an edge-mapping entry, or when a write node is
    /// designated initial. These are input errors, not verification
    /// outcomes.
    pub fn build(structure: &Structure) -> Result<Self, VerifyError> {
        let mut nodes = Vec::with_capacity(structure.edges.len());
        let mut ids = FxHashMap::default();
        for (node, _) in &structure.edges {
            let id = NodeId(nodes.len() as u32);
            if ids.insert(node.clone(), id).is_some() {
                return Err(VerifyError::Inconsistent(format!(
                    "duplicate edge-mapping entry for node {}",
                    node.fingerprint()
                )));
            }
            nodes.push(node.clone());
        }

        let mut min_exponent: [Option<i32>; 2] = [None, None];
        let mut observe = |dim: usize, q: &Quantity| {
            if !q.is_zero() {
                let e = q.exponent();
                min_exponent[dim] = Some(min_exponent[dim].map_or(e, |m| m.min(e)));
            }
        };

        let mut adjacency = Vec::with_capacity(nodes.len());
        for (node, edges) in &structure.edges {
            let mut out = Vec::with_capacity(edges.len());
            for edge in edges {
                let target = *ids.get(&edge.target).ok_or_else(|| {
                    VerifyError::Inconsistent(format!(
                        "edge from {} targets node {} which has no edge-mapping entry",
                        node.fingerprint(),
                        edge.target.fingerprint()
                    ))
                })?;
                observe(0, &edge.cost.time);
                observe(1, &edge.cost.energy);
                out.push((target, edge.cost.clone()));
            }
            adjacency.push(out);
        }

        let mut initial = Vec::with_capacity(structure.initial.len());
        for node in &structure.initial {
            if !node.kind().is_read() {
                return Err(VerifyError::Inconsistent(format!(
                    "initial node {} is a write snapshot; only read snapshots may be initial",
                    node.fingerprint()
                )));
            }
            let id = *ids.get(node).ok_or_else(|| {
                VerifyError::Inconsistent(format!(
                    "initial node {} has no edge-mapping entry",
                    node.fingerprint()
                ))
            })?;
            initial.push(id);
        }

        Ok(StructureIndex {
            nodes,
            ids,
            adjacency,
            initial,
            time_granularity: granularity_from(min_exponent[0]),
            energy_granularity: granularity_from(min_exponent[1]),
        })
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn id_of(&self, node: &Node) -> Option<NodeId> {
        self.ids.get(node).copied()
    }

    /// Outgoing edges in the structure's original edge order
    pub fn successors(&self, id: NodeId) -> &[(NodeId, Cost)] {
        &self.adjacency[id.index()]
    }

    pub fn initial(&self) -> &[NodeId] {
        &self.initial
    }

    /// Tolerance for comparing an accumulated cost against a bound in
    /// the given dimension
    pub fn granularity(&self, dimension: CostDimension) -> &Quantity {
        match dimension {
            CostDimension::Time => &self.time_granularity,
            CostDimension::Energy => &self.energy_granularity,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }
}

/// `5 × 10^(minExponent − 2)`, absorbing representation-level rounding
/// below the coarseness of the structure's own costs
fn granularity_from(min_exponent: Option<i32>) -> Quantity {
    match min_exponent {
        Some(e) => Quantity::new(5, e - 2),
        None => Quantity::zero(),
    }
}
