//! Structural constraints on the DAGs explored by structure learning.

use crate::graph::{Dag, NodeSet};
use crate::learning::GraphChange;
use crate::util::{Error, NodeId, Result};

use log::trace;

use std::collections::BTreeSet;


/// Tracks the current DAG of a structure search and tells which changes keep it a valid DAG.
///
/// Besides acyclicity, some arcs may be forbidden and the number of parents of a node may be
/// bounded. The checks never modify the graph: a change is only made by `apply_modification`.
#[derive(Clone, Debug, Default)]
pub struct StructuralConstraintDag {
    dag: Dag,

    forbidden: BTreeSet<(NodeId, NodeId)>,

    /// The maximal number of parents of a node, if bounded
    max_parents: Option<usize>
}


impl StructuralConstraintDag {

    /// Constraints over `nodes`, starting from a graph without arcs
    pub fn new(nodes: &NodeSet) -> Result<Self> {
        let mut dag = Dag::new();
        for &n in nodes.iter() {
            dag.add_node_with_id(n)?;
        }
        Ok(StructuralConstraintDag::from_dag(&dag))
    }

    /// Constraints starting from an existing graph
    pub fn from_dag(dag: &Dag) -> Self {
        StructuralConstraintDag { dag: dag.clone(), forbidden: BTreeSet::new(), max_parents: None }
    }

    /// Forbid the arcs `arcs`. They can neither be added nor obtained by a reversal.
    pub fn with_forbidden_arcs<I: IntoIterator<Item = (NodeId, NodeId)>>(mut self, arcs: I) -> Self {
        self.forbidden.extend(arcs);
        self
    }

    pub fn with_max_parents(mut self, max_parents: usize) -> Self {
        self.max_parents = Some(max_parents);
        self
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// Replace the current graph
    pub fn set_graph(&mut self, dag: &Dag) {
        self.dag = dag.clone();
    }

    pub fn is_forbidden(&self, tail: NodeId, head: NodeId) -> bool {
        self.forbidden.contains(&(tail, head))
    }

    fn has_room_for_parent(&self, node: NodeId) -> bool {
        match (self.max_parents, self.dag.parents(node)) {
            (Some(max), Ok(parents)) => parents.len() < max,
            (None, Ok(_)) => true,
            (_, Err(_)) => false
        }
    }

    /// Whether the arc `tail -> head` can be added to the current graph
    pub fn check_arc_addition_alone(&self, tail: NodeId, head: NodeId) -> bool {
        self.dag.exists_node(tail)
            && self.dag.exists_node(head)
            && !self.dag.exists_arc(tail, head)
            && !self.is_forbidden(tail, head)
            && self.has_room_for_parent(head)
            && !self.dag.would_create_cycle(tail, head)
    }

    /// Whether the arc `tail -> head` can be removed from the current graph
    pub fn check_arc_deletion_alone(&self, tail: NodeId, head: NodeId) -> bool {
        self.dag.exists_arc(tail, head)
    }

    /// Whether the arc `tail -> head` can be turned into `head -> tail`. The reversal creates a
    /// cycle when another directed path leads from `tail` to `head`.
    pub fn check_arc_reversal_alone(&self, tail: NodeId, head: NodeId) -> bool {
        self.dag.exists_arc(tail, head)
            && !self.is_forbidden(head, tail)
            && self.has_room_for_parent(tail)
            && !self.has_indirect_path(tail, head)
    }

    /// Whether `change` can be applied to the current graph
    pub fn check_modification_alone(&self, change: &GraphChange) -> bool {
        match *change {
            GraphChange::ArcAddition(t, h) => self.check_arc_addition_alone(t, h),
            GraphChange::ArcDeletion(t, h) => self.check_arc_deletion_alone(t, h),
            GraphChange::ArcReversal(t, h) => self.check_arc_reversal_alone(t, h)
        }
    }

    /// Whether `change` is invalid whatever the graph: a loop, a forbidden arc, or a node which
    /// may not have parents
    pub fn is_always_invalid(&self, change: &GraphChange) -> bool {
        let (tail, head) = (change.tail(), change.head());
        if tail == head {
            return true;
        }

        match *change {
            GraphChange::ArcAddition(..) => self.is_forbidden(tail, head) || self.max_parents == Some(0),
            GraphChange::ArcReversal(..) => self.is_forbidden(head, tail) || self.max_parents == Some(0),
            GraphChange::ArcDeletion(..) => false
        }
    }

    /// Apply `change` to the current graph.
    ///
    /// # Errors
    /// * `Error::InvalidArc` if the change is not legal on the current graph
    pub fn apply_modification(&mut self, change: &GraphChange) -> Result<()> {
        if !self.check_modification_alone(change) {
            return Err(Error::InvalidArc(change.tail(), change.head()));
        }

        trace!("applying {}", change);
        match *change {
            GraphChange::ArcAddition(t, h) => self.dag.add_arc(t, h),
            GraphChange::ArcDeletion(t, h) => {
                self.dag.erase_arc(t, h);
                Ok(())
            },
            GraphChange::ArcReversal(t, h) => {
                self.dag.erase_arc(t, h);
                self.dag.add_arc(h, t)
            }
        }
    }

    /// Whether a directed path from `tail` to `head` exists besides the arc `tail -> head`
    fn has_indirect_path(&self, tail: NodeId, head: NodeId) -> bool {
        let children = match self.dag.children(tail) {
            Ok(children) => children,
            Err(_) => return false
        };
        children.iter().any(|&c| c != head && self.dag.has_directed_path(c, head))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::graph::node_set;

    /// 0 -> 1 -> 2, 0 -> 2, and an isolated node 3
    fn graph() -> Dag {
        let mut dag = Dag::new();
        for i in 0..4 {
            dag.add_node_with_id(i).unwrap();
        }
        dag.add_arc(0, 1).unwrap();
        dag.add_arc(1, 2).unwrap();
        dag.add_arc(0, 2).unwrap();
        dag
    }

    #[test]
    fn additions() {
        let c = StructuralConstraintDag::from_dag(&graph());
        assert!(c.check_arc_addition_alone(2, 3));
        assert!(c.check_arc_addition_alone(3, 0));
        // cycle, existing arc, loop, unknown node
        assert!(!c.check_arc_addition_alone(2, 0));
        assert!(!c.check_arc_addition_alone(0, 1));
        assert!(!c.check_arc_addition_alone(3, 3));
        assert!(!c.check_arc_addition_alone(3, 9));

        let c = c.with_forbidden_arcs(vec![(2, 3)]).with_max_parents(2);
        assert!(!c.check_arc_addition_alone(2, 3));
        assert!(!c.check_arc_addition_alone(3, 2));
        assert!(c.check_arc_addition_alone(3, 1));
    }

    #[test]
    fn deletions_and_reversals() {
        let c = StructuralConstraintDag::from_dag(&graph());
        assert!(c.check_arc_deletion_alone(0, 2));
        assert!(!c.check_arc_deletion_alone(2, 0));

        // 0 -> 1 -> 2 prevents the reversal of 0 -> 2
        assert!(!c.check_arc_reversal_alone(0, 2));
        assert!(c.check_arc_reversal_alone(0, 1));
        assert!(c.check_arc_reversal_alone(1, 2));
        assert!(!c.check_arc_reversal_alone(2, 1));

        let c = c.with_forbidden_arcs(vec![(1, 0)]);
        assert!(!c.check_arc_reversal_alone(0, 1));
    }

    #[test]
    fn always_invalid() {
        let c = StructuralConstraintDag::new(&node_set(vec![0, 1])).unwrap().with_forbidden_arcs(vec![(0, 1)]);
        assert!(c.is_always_invalid(&GraphChange::ArcAddition(1, 1)));
        assert!(c.is_always_invalid(&GraphChange::ArcAddition(0, 1)));
        assert!(c.is_always_invalid(&GraphChange::ArcReversal(1, 0)));
        assert!(!c.is_always_invalid(&GraphChange::ArcAddition(1, 0)));
        assert!(!c.is_always_invalid(&GraphChange::ArcDeletion(0, 1)));

        let c = c.with_max_parents(0);
        assert!(c.is_always_invalid(&GraphChange::ArcAddition(1, 0)));
    }

    #[test]
    fn applying() {
        let mut c = StructuralConstraintDag::from_dag(&graph());

        c.apply_modification(&GraphChange::ArcReversal(1, 2)).unwrap();
        assert!(c.dag().exists_arc(2, 1));
        assert!(!c.dag().exists_arc(1, 2));

        c.apply_modification(&GraphChange::ArcDeletion(0, 2)).unwrap();
        c.apply_modification(&GraphChange::ArcAddition(3, 2)).unwrap();
        assert_eq!(&node_set(vec![3]), c.dag().parents(2).unwrap());

        // 3 -> 2 -> 1 is now a path
        assert_eq!(Err(Error::InvalidArc(1, 3)), c.apply_modification(&GraphChange::ArcAddition(1, 3)));
        assert!(!c.dag().exists_arc(1, 3));
    }
}
