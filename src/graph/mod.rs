//! Graph structures used by the models and the inference engines.
//!
//! Nodes are plain `NodeId`s; the graphs only hold structure. A `BayesNet` associates each node
//! of its `Dag` with a `Variable` and a CPT, and a `CliqueGraph` associates each of its nodes with
//! the set of graph nodes forming a clique.

pub mod clique_graph;
pub mod dag;
pub mod undigraph;

pub use self::clique_graph::CliqueGraph;
pub use self::dag::Dag;
pub use self::undigraph::UndiGraph;

use crate::util::NodeId;

use std::collections::BTreeSet;

/// An ordered set of nodes. Iteration follows increasing node ids, so every algorithm walking a
/// `NodeSet` is deterministic.
pub type NodeSet = BTreeSet<NodeId>;

/// Build a `NodeSet` from any collection of ids
pub fn node_set<I: IntoIterator<Item = NodeId>>(ids: I) -> NodeSet {
    ids.into_iter().collect()
}
