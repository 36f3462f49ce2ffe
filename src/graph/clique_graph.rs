//! Clique graphs: undirected graphs whose nodes hold cliques of another graph. Junction trees are
//! clique graphs that are forests and satisfy the running intersection property.

use crate::graph::{NodeSet, UndiGraph};
use crate::util::{Error, NodeId, Result};

use std::collections::{BTreeMap, VecDeque};


#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliqueGraph {
    /// The structure of the clique graph
    graph: UndiGraph,

    /// The content of each clique
    cliques: BTreeMap<NodeId, NodeSet>
}


impl CliqueGraph {

    pub fn new() -> Self {
        CliqueGraph { graph: UndiGraph::new(), cliques: BTreeMap::new() }
    }

    /// Add a clique with the given id.
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if the id is already used
    pub fn add_clique_with_id(&mut self, id: NodeId, clique: NodeSet) -> Result<()> {
        self.graph.add_node_with_id(id)?;
        self.cliques.insert(id, clique);
        Ok(())
    }

    pub fn add_clique(&mut self, clique: NodeSet) -> NodeId {
        let id = self.graph.add_node();
        self.cliques.insert(id, clique);
        id
    }

    /// Remove a clique and its edges. Removing a missing clique does nothing.
    pub fn erase_clique(&mut self, id: NodeId) {
        self.graph.erase_node(id);
        self.cliques.remove(&id);
    }

    /// # Errors
    /// * `Error::InvalidNode` if there is no such clique
    pub fn clique(&self, id: NodeId) -> Result<&NodeSet> {
        self.cliques.get(&id).ok_or(Error::InvalidNode(id))
    }

    /// Replace the content of a clique.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if there is no such clique
    pub fn set_clique(&mut self, id: NodeId, clique: NodeSet) -> Result<()> {
        match self.cliques.get_mut(&id) {
            Some(c) => {
                *c = clique;
                Ok(())
            },
            None => Err(Error::InvalidNode(id))
        }
    }

    /// Iterate over `(id, clique)` in increasing id order
    pub fn cliques(&self) -> impl Iterator<Item = (NodeId, &NodeSet)> + '_ {
        self.cliques.iter().map(|(&id, c)| (id, c))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.cliques.keys().cloned()
    }

    /// The number of cliques
    pub fn size(&self) -> usize {
        self.cliques.len()
    }

    pub fn exists_clique(&self, id: NodeId) -> bool {
        self.cliques.contains_key(&id)
    }

    /// # Errors
    /// * `Error::InvalidNode` if a clique does not exist
    /// * `Error::InvalidArc` for a self-loop
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.graph.add_edge(a, b)
    }

    pub fn erase_edge(&mut self, a: NodeId, b: NodeId) {
        self.graph.erase_edge(a, b);
    }

    pub fn exists_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.graph.exists_edge(a, b)
    }

    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.graph.edges()
    }

    pub fn size_edges(&self) -> usize {
        self.graph.size_edges()
    }

    /// # Errors
    /// * `Error::InvalidNode` if there is no such clique
    pub fn neighbours(&self, id: NodeId) -> Result<&NodeSet> {
        self.graph.neighbours(id)
    }

    /// The underlying undirected graph
    pub fn graph(&self) -> &UndiGraph {
        &self.graph
    }

    /// The separator of two adjacent cliques: the intersection of their contents.
    ///
    /// # Errors
    /// * `Error::InvalidArc` if the cliques are not adjacent
    pub fn separator(&self, a: NodeId, b: NodeId) -> Result<NodeSet> {
        if !self.exists_edge(a, b) {
            return Err(Error::InvalidArc(a, b));
        }
        Ok(self.cliques[&a].intersection(&self.cliques[&b]).cloned().collect())
    }

    /// The smallest clique containing `node`, if any
    pub fn clique_containing(&self, node: NodeId) -> Option<NodeId> {
        self.cliques.iter()
                    .filter(|(_, c)| c.contains(&node))
                    .min_by_key(|(&id, c)| (c.len(), id))
                    .map(|(&id, _)| id)
    }

    /// The cliques on the path from `from` to `to`, both included.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if a clique does not exist
    /// * `Error::NotFound` if no path links the cliques
    pub fn path(&self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>> {
        if !self.exists_clique(from) {
            return Err(Error::InvalidNode(from));
        }
        if !self.exists_clique(to) {
            return Err(Error::InvalidNode(to));
        }

        let mut predecessor: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut queue = VecDeque::new();
        predecessor.insert(from, from);
        queue.push_back(from);

        while let Some(n) = queue.pop_front() {
            if n == to {
                let mut path = vec![to];
                let mut current = to;
                while current != from {
                    current = predecessor[&current];
                    path.push(current);
                }
                path.reverse();
                return Ok(path);
            }

            for &m in self.graph.neighbours(n)?.iter() {
                if !predecessor.contains_key(&m) {
                    predecessor.insert(m, n);
                    queue.push_back(m);
                }
            }
        }

        Err(Error::NotFound(format!("path from clique {} to clique {}", from, to)))
    }

    /// Check whether the graph has no cycle
    pub fn is_forest(&self) -> bool {
        self.size_edges() + self.graph.connected_components().len() == self.size()
    }

    /// Check the running intersection property: for every node, the cliques containing it form a
    /// connected subtree.
    pub fn has_running_intersection(&self) -> bool {
        let mut containing: BTreeMap<NodeId, NodeSet> = BTreeMap::new();
        for (&id, clique) in self.cliques.iter() {
            for &n in clique.iter() {
                containing.entry(n).or_default().insert(id);
            }
        }

        containing.values().all(|ids| self.graph.is_connected_subset(ids))
    }

    /// Check whether the clique graph is a junction tree (a forest with the running intersection
    /// property)
    pub fn is_junction_tree(&self) -> bool {
        self.is_forest() && self.has_running_intersection()
    }
}
