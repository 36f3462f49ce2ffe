//! Undirected graphs: moral graphs, triangulated graphs, and the support of clique graphs.

use crate::graph::NodeSet;
use crate::util::{Error, NodeId, Result};

use std::collections::{BTreeMap, VecDeque};


/// An undirected graph stored as adjacency sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UndiGraph {
    adjacency: BTreeMap<NodeId, NodeSet>
}


impl UndiGraph {

    pub fn new() -> Self {
        UndiGraph { adjacency: BTreeMap::new() }
    }

    /// Add a node with a fresh id (one more than the largest id in the graph).
    pub fn add_node(&mut self) -> NodeId {
        let id = self.adjacency.keys().next_back().map(|&n| n + 1).unwrap_or(0);
        self.adjacency.insert(id, NodeSet::new());
        id
    }

    /// Add a node with the given id.
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if the node already exists
    pub fn add_node_with_id(&mut self, id: NodeId) -> Result<()> {
        if self.adjacency.contains_key(&id) {
            return Err(Error::DuplicateElement(format!("node {}", id)));
        }
        self.adjacency.insert(id, NodeSet::new());
        Ok(())
    }

    /// Remove a node and its edges. Removing a missing node does nothing.
    pub fn erase_node(&mut self, id: NodeId) {
        if let Some(neighbours) = self.adjacency.remove(&id) {
            for n in neighbours {
                if let Some(adj) = self.adjacency.get_mut(&n) {
                    adj.remove(&id);
                }
            }
        }
    }

    pub fn exists_node(&self, id: NodeId) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// The number of nodes
    pub fn size(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().cloned()
    }

    /// Add the edge `a - b`. Adding an existing edge does nothing.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if an extremity is not in the graph
    /// * `Error::InvalidArc` for a self-loop
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.check_node(a)?;
        self.check_node(b)?;
        if a == b {
            return Err(Error::InvalidArc(a, b));
        }

        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        Ok(())
    }

    /// Remove the edge `a - b`. Removing a missing edge does nothing.
    pub fn erase_edge(&mut self, a: NodeId, b: NodeId) {
        if let Some(adj) = self.adjacency.get_mut(&a) {
            adj.remove(&b);
        }
        if let Some(adj) = self.adjacency.get_mut(&b) {
            adj.remove(&a);
        }
    }

    pub fn exists_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency.get(&a).map_or(false, |adj| adj.contains(&b))
    }

    /// The number of edges
    pub fn size_edges(&self) -> usize {
        self.adjacency.values().map(|adj| adj.len()).sum::<usize>() / 2
    }

    /// Every edge once, as `(a, b)` with `a < b`, in lexicographic order
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.adjacency.iter()
                      .flat_map(|(&a, adj)| adj.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
                      .collect()
    }

    /// The neighbours of a node.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if the node is not in the graph
    pub fn neighbours(&self, id: NodeId) -> Result<&NodeSet> {
        self.adjacency.get(&id).ok_or(Error::InvalidNode(id))
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if self.exists_node(id) {
            Ok(())
        } else {
            Err(Error::InvalidNode(id))
        }
    }

    /// Check whether the nodes are pairwise adjacent
    pub fn is_clique(&self, nodes: &NodeSet) -> bool {
        nodes.iter().all(|&a| {
            nodes.iter().all(|&b| a == b || self.exists_edge(a, b))
        })
    }

    /// Check whether the subgraph induced by `nodes` is connected. The empty set is connected.
    pub fn is_connected_subset(&self, nodes: &NodeSet) -> bool {
        let start = match nodes.iter().next() {
            Some(&n) => n,
            None => return true
        };

        let mut seen = NodeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(n) = queue.pop_front() {
            if let Some(adj) = self.adjacency.get(&n) {
                for &m in adj.iter().filter(|m| nodes.contains(*m)) {
                    if seen.insert(m) {
                        queue.push_back(m);
                    }
                }
            }
        }

        seen.len() == nodes.len()
    }

    /// The connected components, each given as a set of nodes, ordered by smallest id
    pub fn connected_components(&self) -> Vec<NodeSet> {
        let mut seen = NodeSet::new();
        let mut components = Vec::new();

        for &start in self.adjacency.keys() {
            if seen.contains(&start) {
                continue;
            }

            let mut component = NodeSet::new();
            let mut queue = VecDeque::new();
            component.insert(start);
            queue.push_back(start);
            while let Some(n) = queue.pop_front() {
                for &m in self.adjacency[&n].iter() {
                    if component.insert(m) {
                        queue.push_back(m);
                    }
                }
            }

            seen.extend(component.iter().cloned());
            components.push(component);
        }

        components
    }

    /// Check whether every cycle of length at least four has a chord.
    ///
    /// Uses a maximum cardinality search: the graph is chordal iff the visit order reversed is a
    /// perfect elimination order. See Tarjan & Yannakakis, 1984.
    pub fn is_chordal(&self) -> bool {
        ///////////////////////////////////////////////////////////////////////
        // 1) maximum cardinality search, ties broken by smallest id
        let mut weight: BTreeMap<NodeId, usize> = self.adjacency.keys().map(|&n| (n, 0)).collect();
        let mut rank: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.size());

        while !weight.is_empty() {
            let (&best, _) = weight.iter()
                                   .max_by(|(na, wa), (nb, wb)| wa.cmp(wb).then(nb.cmp(na)))
                                   .expect("weight is not empty");
            weight.remove(&best);
            rank.insert(best, order.len());
            order.push(best);

            for n in self.adjacency[&best].iter() {
                if let Some(w) = weight.get_mut(n) {
                    *w += 1;
                }
            }
        }

        ///////////////////////////////////////////////////////////////////////
        // 2) each node's earlier neighbours minus the latest one must be adjacent to it
        for &v in order.iter() {
            let earlier: Vec<NodeId> = self.adjacency[&v].iter()
                                                         .cloned()
                                                         .filter(|n| rank[n] < rank[&v])
                                                         .collect();
            if let Some(&latest) = earlier.iter().max_by_key(|n| rank[*n]) {
                if earlier.iter().any(|&n| n != latest && !self.exists_edge(n, latest)) {
                    return false;
                }
            }
        }

        true
    }
}
