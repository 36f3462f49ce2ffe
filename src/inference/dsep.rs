//! d-separation analysis with the Bayes-Ball algorithm.
//!
//! A ball is sent from every query node. Moving through the DAG, it passes, bounces or is
//! blocked at each node depending on whether the node is observed and on the direction it comes
//! from. The nodes whose top is marked are the nodes whose CPT is needed to answer the query;
//! the observed nodes the ball reaches carry the evidence that can change the answer.
//!
//! Soft evidence on a node behaves like an observed virtual child of the node: it is relevant
//! when the ball goes down through the node.
//!
//! See R. Shachter, "Bayes-Ball: The Rational Pastime", UAI 1998, and Koller & Friedman 3.3.3.

use crate::graph::{Dag, NodeSet};
use crate::util::{NodeId, Result};

use log::trace;

use std::collections::{BTreeMap, VecDeque};


/// The outcome of a Bayes-Ball run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Requisites {
    /// The nodes whose CPT is needed
    pub nodes: NodeSet,

    /// The nodes with hard evidence that are not d-separated from the query
    pub hard_evidence: NodeSet,

    /// The nodes with soft evidence that are not d-separated from the query
    pub soft_evidence: NodeSet,

    /// Every node the ball reached
    pub visited: NodeSet
}


#[derive(Clone, Copy, Debug, Default)]
struct Marks {
    visited: bool,
    top: bool,
    bottom: bool
}


/// Run Bayes-Ball from `query` given the hard evidence nodes `hard` and the soft evidence nodes
/// `soft`.
///
/// # Errors
/// * `Error::InvalidNode` if a query node is not in the graph
pub fn bayes_ball(dag: &Dag, query: &NodeSet, hard: &NodeSet, soft: &NodeSet) -> Result<Requisites> {
    let mut marks: BTreeMap<NodeId, Marks> = BTreeMap::new();

    // (node, whether the ball comes from a child)
    let mut queue: VecDeque<(NodeId, bool)> = VecDeque::new();
    for &q in query {
        dag.parents(q)?;
        queue.push_back((q, true));
    }

    while let Some((node, from_child)) = queue.pop_front() {
        let m = marks.entry(node).or_default();
        m.visited = true;
        let observed = hard.contains(&node);

        // an unobserved node passes a ball coming from a child both ways. An observed node
        // bounces a ball coming from a parent back to the parents, and so does a node with soft
        // evidence through its virtual observed child.
        let go_up = if from_child { !observed } else { observed || soft.contains(&node) };
        let go_down = !observed;

        if go_up && !m.top {
            m.top = true;
            for &p in dag.parents(node)?.iter() {
                queue.push_back((p, true));
            }
        }
        if go_down && !m.bottom {
            m.bottom = true;
            for &c in dag.children(node)?.iter() {
                queue.push_back((c, false));
            }
        }
    }

    let mut res = Requisites::default();
    for (&node, m) in marks.iter() {
        res.visited.insert(node);
        if m.top {
            res.nodes.insert(node);
        }
        if hard.contains(&node) {
            res.hard_evidence.insert(node);
        }
        if soft.contains(&node) && m.bottom {
            res.soft_evidence.insert(node);
        }
    }

    trace!(
        "bayes ball from {:?}: {} requisite nodes, {} hard and {} soft findings kept",
        query, res.nodes.len(), res.hard_evidence.len(), res.soft_evidence.len()
    );
    Ok(res)
}


/// Whether the nodes `a` are d-separated from the nodes `b` given the observed nodes `given`.
///
/// # Errors
/// * `Error::InvalidNode` if a node of `a` is not in the graph
pub fn d_separated(dag: &Dag, a: &NodeSet, b: &NodeSet, given: &NodeSet) -> Result<bool> {
    let res = bayes_ball(dag, a, given, &NodeSet::new())?;
    Ok(!b.iter().any(|n| !given.contains(n) && res.visited.contains(n)))
}


/// The nodes of `candidates` which are not d-separated from `query` (without any evidence)
pub fn relevant_nodes(dag: &Dag, query: &NodeSet, candidates: &NodeSet) -> Result<NodeSet> {
    let res = bayes_ball(dag, query, &NodeSet::new(), &NodeSet::new())?;
    Ok(candidates.iter().filter(|n| res.visited.contains(*n)).cloned().collect())
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::graph::node_set;

    /// The Student network of Koller & Friedman 3.4:
    /// D(0) -> G(2) <- I(1), I -> S(3), G -> L(4)
    fn student() -> Dag {
        let mut dag = Dag::new();
        for i in 0..5 {
            dag.add_node_with_id(i).unwrap();
        }
        dag.add_arc(0, 2).unwrap();
        dag.add_arc(1, 2).unwrap();
        dag.add_arc(1, 3).unwrap();
        dag.add_arc(2, 4).unwrap();
        dag
    }

    #[test]
    fn v_structure() {
        let dag = student();
        let none = NodeSet::new();

        assert!(d_separated(&dag, &node_set(vec![0]), &node_set(vec![1]), &none).unwrap());
        assert!(!d_separated(&dag, &node_set(vec![0]), &node_set(vec![1]), &node_set(vec![2])).unwrap());
        // observing a descendant of the collider also activates the trail
        assert!(!d_separated(&dag, &node_set(vec![0]), &node_set(vec![1]), &node_set(vec![4])).unwrap());
        assert!(d_separated(&dag, &node_set(vec![0]), &node_set(vec![3]), &none).unwrap());
        assert!(!d_separated(&dag, &node_set(vec![0]), &node_set(vec![3]), &node_set(vec![2])).unwrap());
        assert!(d_separated(&dag, &node_set(vec![4]), &node_set(vec![3]), &node_set(vec![1])).unwrap());
    }

    #[test]
    fn requisite_nodes() {
        let dag = student();

        // P(I): no evidence, only I's own CPT is needed
        let res = bayes_ball(&dag, &node_set(vec![1]), &NodeSet::new(), &NodeSet::new()).unwrap();
        assert_eq!(node_set(vec![1]), res.nodes);

        // P(I | L): the path through G is active
        let res = bayes_ball(&dag, &node_set(vec![1]), &node_set(vec![4]), &NodeSet::new()).unwrap();
        assert_eq!(node_set(vec![0, 1, 2, 4]), res.nodes);
        assert_eq!(node_set(vec![4]), res.hard_evidence);

        // P(G | I, S): S is d-separated by I
        let res = bayes_ball(&dag, &node_set(vec![2]), &node_set(vec![1, 3]), &NodeSet::new()).unwrap();
        assert_eq!(node_set(vec![1]), res.hard_evidence);
        assert_eq!(node_set(vec![0, 2]), res.nodes);
    }

    #[test]
    fn soft_evidence() {
        let dag = student();

        let res = bayes_ball(&dag, &node_set(vec![0]), &NodeSet::new(), &node_set(vec![3, 4])).unwrap();
        // L is below the collider G, its virtual child activates the trail to I and then S
        assert_eq!(node_set(vec![3, 4]), res.soft_evidence);

        let res = bayes_ball(&dag, &node_set(vec![0]), &NodeSet::new(), &node_set(vec![3])).unwrap();
        assert!(res.soft_evidence.is_empty());
    }
}
