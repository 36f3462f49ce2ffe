//! Directed acyclic graphs.

use crate::graph::{NodeSet, UndiGraph};
use crate::util::{Error, NodeId, Result};

use std::collections::{BTreeMap, VecDeque};


/// A Directed Acyclic Graph. Every mutation keeps the graph acyclic: an arc that would close a
/// directed cycle is rejected before the graph is modified.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dag {
    /// The parents of each node
    parents: BTreeMap<NodeId, NodeSet>,

    /// The children of each node
    children: BTreeMap<NodeId, NodeSet>
}


impl Dag {

    pub fn new() -> Self {
        Dag { parents: BTreeMap::new(), children: BTreeMap::new() }
    }

    /// Add a node with a fresh id (one more than the largest id in the graph).
    pub fn add_node(&mut self) -> NodeId {
        let id = self.parents.keys().next_back().map(|&n| n + 1).unwrap_or(0);
        self.parents.insert(id, NodeSet::new());
        self.children.insert(id, NodeSet::new());
        id
    }

    /// Add a node with the given id.
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if the node already exists
    pub fn add_node_with_id(&mut self, id: NodeId) -> Result<()> {
        if self.exists_node(id) {
            return Err(Error::DuplicateElement(format!("node {}", id)));
        }
        self.parents.insert(id, NodeSet::new());
        self.children.insert(id, NodeSet::new());
        Ok(())
    }

    /// Remove a node and every arc touching it. Removing a missing node does nothing.
    pub fn erase_node(&mut self, id: NodeId) {
        if let Some(parents) = self.parents.remove(&id) {
            for p in parents {
                if let Some(ch) = self.children.get_mut(&p) {
                    ch.remove(&id);
                }
            }
        }
        if let Some(children) = self.children.remove(&id) {
            for c in children {
                if let Some(pa) = self.parents.get_mut(&c) {
                    pa.remove(&id);
                }
            }
        }
    }

    pub fn exists_node(&self, id: NodeId) -> bool {
        self.parents.contains_key(&id)
    }

    /// The number of nodes
    pub fn size(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.parents.keys().cloned()
    }

    /// The number of arcs
    pub fn size_arcs(&self) -> usize {
        self.parents.values().map(|p| p.len()).sum()
    }

    /// Every arc as `(tail, head)`, ordered by head then tail
    pub fn arcs(&self) -> Vec<(NodeId, NodeId)> {
        self.parents.iter()
                    .flat_map(|(&h, pa)| pa.iter().map(move |&t| (t, h)))
                    .collect()
    }

    /// # Errors
    /// * `Error::InvalidNode` if the node is not in the graph
    pub fn parents(&self, id: NodeId) -> Result<&NodeSet> {
        self.parents.get(&id).ok_or(Error::InvalidNode(id))
    }

    /// # Errors
    /// * `Error::InvalidNode` if the node is not in the graph
    pub fn children(&self, id: NodeId) -> Result<&NodeSet> {
        self.children.get(&id).ok_or(Error::InvalidNode(id))
    }

    pub fn exists_arc(&self, tail: NodeId, head: NodeId) -> bool {
        self.parents.get(&head).map_or(false, |pa| pa.contains(&tail))
    }

    /// Check whether a directed path leads from `from` to `to`. A node reaches itself.
    pub fn has_directed_path(&self, from: NodeId, to: NodeId) -> bool {
        if !self.exists_node(from) || !self.exists_node(to) {
            return false;
        }

        let mut seen = NodeSet::new();
        let mut stack = vec![from];
        while let Some(n) = stack.pop() {
            if n == to {
                return true;
            }
            if seen.insert(n) {
                stack.extend(self.children[&n].iter().cloned());
            }
        }
        false
    }

    /// Check whether adding the arc `tail -> head` would create a directed cycle.
    pub fn would_create_cycle(&self, tail: NodeId, head: NodeId) -> bool {
        tail == head || self.has_directed_path(head, tail)
    }

    /// Add the arc `tail -> head`. Adding an existing arc does nothing.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if an extremity is not in the graph
    /// * `Error::DirectedCycle` if the arc would create a directed cycle
    pub fn add_arc(&mut self, tail: NodeId, head: NodeId) -> Result<()> {
        if !self.exists_node(tail) {
            return Err(Error::InvalidNode(tail));
        }
        if !self.exists_node(head) {
            return Err(Error::InvalidNode(head));
        }
        if self.exists_arc(tail, head) {
            return Ok(());
        }
        if self.would_create_cycle(tail, head) {
            return Err(Error::DirectedCycle(tail, head));
        }

        self.parents.entry(head).or_default().insert(tail);
        self.children.entry(tail).or_default().insert(head);
        Ok(())
    }

    /// Remove the arc `tail -> head`. Removing a missing arc does nothing.
    pub fn erase_arc(&mut self, tail: NodeId, head: NodeId) {
        if let Some(pa) = self.parents.get_mut(&head) {
            pa.remove(&tail);
        }
        if let Some(ch) = self.children.get_mut(&tail) {
            ch.remove(&head);
        }
    }

    /// A topological order of the nodes. Among the nodes ready at the same time, smaller ids come
    /// first.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: BTreeMap<NodeId, usize> = self.parents.iter()
                                                                 .map(|(&n, pa)| (n, pa.len()))
                                                                 .collect();
        let mut ready: NodeSet = in_degree.iter()
                                          .filter(|(_, &d)| d == 0)
                                          .map(|(&n, _)| n)
                                          .collect();
        let mut order = Vec::with_capacity(self.size());

        while let Some(&n) = ready.iter().next() {
            ready.remove(&n);
            order.push(n);
            for c in self.children[&n].iter() {
                let d = in_degree.get_mut(c).expect("children are nodes of the graph");
                *d -= 1;
                if *d == 0 {
                    ready.insert(*c);
                }
            }
        }

        order
    }

    /// The nodes with no parent
    pub fn roots(&self) -> NodeSet {
        self.parents.iter().filter(|(_, pa)| pa.is_empty()).map(|(&n, _)| n).collect()
    }

    /// The ancestors of a set of nodes, the nodes themselves included
    pub fn ancestors(&self, nodes: &NodeSet) -> NodeSet {
        self.closure(nodes, &self.parents)
    }

    /// The descendants of a set of nodes, the nodes themselves included
    pub fn descendants(&self, nodes: &NodeSet) -> NodeSet {
        self.closure(nodes, &self.children)
    }

    fn closure(&self, nodes: &NodeSet, links: &BTreeMap<NodeId, NodeSet>) -> NodeSet {
        let mut res = NodeSet::new();
        let mut queue: VecDeque<NodeId> = nodes.iter().cloned().filter(|n| self.exists_node(*n)).collect();
        while let Some(n) = queue.pop_front() {
            if res.insert(n) {
                queue.extend(links[&n].iter().cloned());
            }
        }
        res
    }

    /// The moral graph: every node is linked to its parents, its children and the other parents
    /// of its children.
    pub fn moral_graph(&self) -> UndiGraph {
        self.moral_subgraph(&self.nodes().collect())
    }

    /// The moral graph of the subgraph induced by `nodes`
    pub fn moral_subgraph(&self, nodes: &NodeSet) -> UndiGraph {
        let mut moral = UndiGraph::new();
        for &n in nodes.iter().filter(|n| self.exists_node(**n)) {
            moral.add_node_with_id(n).expect("node ids are unique");
        }

        for &n in nodes.iter().filter(|n| self.exists_node(**n)) {
            let parents: Vec<NodeId> = self.parents[&n].iter().cloned().filter(|p| nodes.contains(p)).collect();
            for (i, &p) in parents.iter().enumerate() {
                moral.add_edge(p, n).expect("both extremities were added");
                for &q in parents[i + 1..].iter() {
                    moral.add_edge(p, q).expect("both extremities were added");
                }
            }
        }

        moral
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node_set;

    /// 0 -> 2 <- 1, 2 -> 3
    fn v_structure() -> Dag {
        let mut dag = Dag::new();
        for _ in 0..4 {
            dag.add_node();
        }
        dag.add_arc(0, 2).unwrap();
        dag.add_arc(1, 2).unwrap();
        dag.add_arc(2, 3).unwrap();
        dag
    }

    #[test]
    fn arcs() {
        let mut dag = v_structure();
        assert_eq!(3, dag.size_arcs());

        // already present: no-op
        dag.add_arc(0, 2).unwrap();
        assert_eq!(3, dag.size_arcs());

        assert_eq!(Err(Error::DirectedCycle(3, 0)), dag.add_arc(3, 0));
        assert_eq!(Err(Error::DirectedCycle(1, 1)), dag.add_arc(1, 1));
        assert_eq!(Err(Error::InvalidNode(7)), dag.add_arc(0, 7));
        assert_eq!(3, dag.size_arcs());

        // missing arc: no-op
        dag.erase_arc(3, 0);
        dag.erase_arc(2, 3);
        assert_eq!(2, dag.size_arcs());
        dag.add_arc(3, 0).unwrap();
        assert_eq!(vec![(3, 0), (0, 2), (1, 2)], dag.arcs());
    }

    #[test]
    fn cycle_detection() {
        let dag = v_structure();
        assert!(dag.would_create_cycle(3, 0));
        assert!(dag.would_create_cycle(2, 2));
        assert!(!dag.would_create_cycle(0, 1));
        assert!(!dag.would_create_cycle(0, 3));
    }

    #[test]
    fn order_and_closures() {
        let mut dag = v_structure();
        dag.add_node_with_id(10).unwrap();
        dag.add_arc(10, 0).unwrap();

        let order = dag.topological_order();
        assert_eq!(vec![1, 10, 0, 2, 3], order);

        assert_eq!(node_set(vec![0, 1, 2, 10]), dag.ancestors(&node_set(vec![2])));
        assert_eq!(node_set(vec![0, 2, 3]), dag.descendants(&node_set(vec![0])));
        assert_eq!(node_set(vec![1, 10]), dag.roots());
    }

    #[test]
    fn erase_node() {
        let mut dag = v_structure();
        dag.erase_node(2);
        dag.erase_node(2);
        assert_eq!(3, dag.size());
        assert_eq!(0, dag.size_arcs());
        assert!(dag.children(0).unwrap().is_empty());
        assert!(dag.parents(2).is_err());
    }

    #[test]
    fn moralization() {
        let moral = v_structure().moral_graph();
        assert_eq!(4, moral.size());
        assert_eq!(vec![(0, 1), (0, 2), (1, 2), (2, 3)], moral.edges());

        let sub = v_structure().moral_subgraph(&node_set(vec![0, 2, 3]));
        assert_eq!(vec![(0, 2), (2, 3)], sub.edges());
    }
}
