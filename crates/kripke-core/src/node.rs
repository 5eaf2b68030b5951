//! Kripke node, edge, and structure representation
//!
//! A node is a point-in-time snapshot of one finite state machine,
//! taken either immediately before a ringlet begins (*read*) or
//! immediately after it ends (*write*). Nodes are:
//! - Immutable: transitions create new nodes, never mutate existing ones
//! - Hashable: node identity drives the obligation store and the index
//! - Comparable: for deterministic diagnostics ordering
//!
//! # Fingerprinting
//!
//! Nodes are identified by a 64-bit fingerprint computed via FNV-1a over
//! the full content (kind, state name, entry flag, variable snapshot).
//! The fingerprint is cached at construction; equality always falls back
//! to full content comparison, so a collision can never merge two
//! distinct nodes.

use crate::quantity::Cost;
use crate::value::Value;
use im::OrdMap;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// A 64-bit node fingerprint for fast comparison and hashing
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FP({:016x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Which side of a ringlet the snapshot was taken on
///
/// Only a write snapshot knows where the machine goes next; a read
/// snapshot never exposes a next state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Snapshot taken immediately before a ringlet begins
    Read,
    /// Snapshot taken immediately after a ringlet ends, carrying the
    /// state the machine will transition into
    Write { target: Arc<str> },
}

impl NodeKind {
    pub fn is_read(&self) -> bool {
        matches!(self, NodeKind::Read)
    }
}

/// A point-in-time snapshot of a single state machine
#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    /// Currently active state name
    state: Arc<str>,
    /// Whether the state's entry action executed this ringlet
    executed_on_entry: bool,
    /// Variable snapshot (unique keys; order is canonical, not semantic)
    vars: OrdMap<Arc<str>, Value>,
    /// Cached fingerprint (computed at construction time)
    fingerprint: Fingerprint,
}

impl Node {
    /// Create a read snapshot
    pub fn read<K: Into<Arc<str>>>(
        state: impl Into<Arc<str>>,
        executed_on_entry: bool,
        vars: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        Self::with_kind(NodeKind::Read, state, executed_on_entry, vars)
    }

    /// Create a write snapshot with the state the machine moves to next
    pub fn write<K: Into<Arc<str>>>(
        state: impl Into<Arc<str>>,
        target: impl Into<Arc<str>>,
        executed_on_entry: bool,
        vars: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        Self::with_kind(
            NodeKind::Write {
                target: target.into(),
            },
            state,
            executed_on_entry,
            vars,
        )
    }

    fn with_kind<K: Into<Arc<str>>>(
        kind: NodeKind,
        state: impl Into<Arc<str>>,
        executed_on_entry: bool,
        vars: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        let state = state.into();
        let vars: OrdMap<Arc<str>, Value> =
            vars.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let fingerprint = compute_fingerprint(&kind, &state, executed_on_entry, &vars);
        Node {
            kind,
            state,
            executed_on_entry,
            vars,
            fingerprint,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Currently active state name
    pub fn state(&self) -> &Arc<str> {
        &self.state
    }

    /// The state the machine transitions into next. `None` on read nodes.
    pub fn next_state(&self) -> Option<&Arc<str>> {
        match &self.kind {
            NodeKind::Read => None,
            NodeKind::Write { target } => Some(target),
        }
    }

    pub fn executed_on_entry(&self) -> bool {
        self.executed_on_entry
    }

    /// Look up a variable's value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// All variables as (name, value) pairs in canonical order
    pub fn vars(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.vars.iter()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

fn fnv_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn fnv_value(hash: u64, value: &Value) -> u64 {
    match value {
        Value::Bool(b) => fnv_bytes(fnv_bytes(hash, &[0]), &[*b as u8]),
        Value::Int(n) => fnv_bytes(fnv_bytes(hash, &[1]), &n.to_le_bytes()),
        Value::Str(s) => fnv_bytes(fnv_bytes(hash, &[2]), s.as_bytes()),
    }
}

fn compute_fingerprint(
    kind: &NodeKind,
    state: &str,
    executed_on_entry: bool,
    vars: &OrdMap<Arc<str>, Value>,
) -> Fingerprint {
    let mut hash = FNV_OFFSET;
    hash = match kind {
        NodeKind::Read => fnv_bytes(hash, &[0]),
        NodeKind::Write { target } => fnv_bytes(fnv_bytes(hash, &[1]), target.as_bytes()),
    };
    hash = fnv_bytes(hash, state.as_bytes());
    hash = fnv_bytes(hash, &[executed_on_entry as u8]);
    // OrdMap iterates in sorted key order, so the digest is canonical
    for (name, value) in vars {
        hash = fnv_bytes(hash, name.as_bytes());
        hash = fnv_value(hash, value);
    }
    Fingerprint(hash)
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
            && self.kind == other.kind
            && self.state == other.state
            && self.executed_on_entry == other.executed_on_entry
            && self.vars == other.vars
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.0.hash(state);
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Fingerprint first for speed; full content only on collision
        self.fingerprint
            .cmp(&other.fingerprint)
            .then_with(|| self.content_order(other))
    }
}

impl Node {
    /// Full content ordering, the collision tiebreak for [`Ord`];
    /// `Equal` exactly when the nodes are equal
    fn content_order(&self, other: &Self) -> Ordering {
        (&self.kind, &self.state, self.executed_on_entry, &self.vars).cmp(&(
            &other.kind,
            &other.state,
            other.executed_on_entry,
            &other.vars,
        ))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Read => writeln!(f, "read({})", self.state)?,
            NodeKind::Write { target } => writeln!(f, "write({} -> {})", self.state, target)?,
        }
        writeln!(f, "   entry: {}", self.executed_on_entry)?;
        for (name, value) in &self.vars {
            writeln!(f, "   {} = {}", name, value)?;
        }
        Ok(())
    }
}

/// A directed transition between two nodes, carrying a two-dimensional cost
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub target: Node,
    pub cost: Cost,
}

impl Edge {
    pub fn new(target: Node, cost: Cost) -> Self {
        Edge { target, cost }
    }
}

/// A Kripke structure: nodes, their outgoing edges, and initial nodes
///
/// Every node reachable from an initial node must have an entry in
/// `edges` (possibly empty); a referenced node without an entry is a
/// structural inconsistency detected at index construction. Only read
/// nodes may be initial.
#[derive(Clone, Debug, Default)]
pub struct Structure {
    /// Outgoing edges per node; the key set is the node set
    pub edges: Vec<(Node, Vec<Edge>)>,
    /// Designated initial nodes
    pub initial: Vec<Node>,
}

impl Structure {
    pub fn new(edges: Vec<(Node, Vec<Edge>)>, initial: Vec<Node>) -> Self {
        Structure { edges, initial }
    }

    /// Outgoing edges of a node, if the node is part of the structure
    pub fn edges_of(&self, node: &Node) -> Option<&[Edge]> {
        self.edges
            .iter()
            .find(|(n, _)| n == node)
            .map(|(_, es)| es.as_slice())
    }

    /// Whether an edge from `from` to `to` exists
    pub fn has_edge(&self, from: &Node, to: &Node) -> bool {
        self.edges_of(from)
            .is_some_and(|es| es.iter().any(|e| &e.target == to))
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(|(_, es)| es.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Quantity;

    fn sample_read() -> Node {
        Node::read("Initial", true, [("x", Value::Int(1)), ("go", Value::Bool(false))])
    }

    #[test]
    fn test_value_equality_and_hash() {
        let a = sample_read();
        let b = Node::read("Initial", true, [("go", Value::Bool(false)), ("x", Value::Int(1))]);
        // Insertion order of variables is irrelevant
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_kind_distinguishes_nodes() {
        let r = sample_read();
        let w = Node::write("Initial", "Next", true, [("x", Value::Int(1)), ("go", Value::Bool(false))]);
        assert_ne!(r, w);
        assert_ne!(r.fingerprint(), w.fingerprint());
    }

    #[test]
    fn test_collision_tiebreak_separates_kinds() {
        // same state, flag and vars; only the kind differs
        let r = Node::read("A", true, [("x", Value::Int(1))]);
        let w = Node::write("A", "B", true, [("x", Value::Int(1))]);
        assert_ne!(r.content_order(&w), Ordering::Equal);
        assert_eq!(r.content_order(&r.clone()), Ordering::Equal);
    }

    #[test]
    fn test_read_has_no_next_state() {
        assert_eq!(sample_read().next_state(), None);
        let w = Node::write("A", "B", false, [] as [(&str, Value); 0]);
        assert_eq!(w.next_state().map(|s| &**s), Some("B"));
    }

    #[test]
    fn test_flag_changes_fingerprint() {
        let a = Node::read("A", true, [("x", Value::Int(0))]);
        let b = Node::read("A", false, [("x", Value::Int(0))]);
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_structure_edge_lookup() {
        let a = Node::read("A", false, [("x", Value::Int(0))]);
        let b = Node::read("B", false, [("x", Value::Int(1))]);
        let cost = Cost::new(Quantity::new(1, -6), Quantity::zero());
        let s = Structure::new(
            vec![
                (a.clone(), vec![Edge::new(b.clone(), cost)]),
                (b.clone(), vec![]),
            ],
            vec![a.clone()],
        );
        assert!(s.has_edge(&a, &b));
        assert!(!s.has_edge(&b, &a));
        assert_eq!(s.node_count(), 2);
        assert_eq!(s.edge_count(), 1);
    }
}
