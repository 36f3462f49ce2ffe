//! Elimination sequence strategies: the heuristics choosing in which order the nodes of an
//! undirected graph are eliminated during triangulation.

use crate::graph::{NodeSet, UndiGraph};
use crate::triangulation::TriangulationConfig;
use crate::util::{Error, NodeId, Result};

use log::trace;

use std::cmp::Ordering;
use std::collections::BTreeMap;


/// The interface of an elimination sequence heuristic.
///
/// A strategy works on its own copy of the graph: every call to `elimination_update` connects the
/// neighbours of the node pairwise and removes the node from that copy.
pub trait EliminationSequenceStrategy {

    /// Attach a graph and the domain size of each of its nodes.
    ///
    /// # Returns
    /// `true` if the internal structures changed, `false` when the same graph and sizes were
    /// already attached and no node has been eliminated since.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if a node of the graph has no domain size
    fn set_graph(&mut self, graph: &UndiGraph, domain_sizes: &BTreeMap<NodeId, usize>) -> Result<bool>;

    /// The next node to eliminate.
    ///
    /// # Errors
    /// * `Error::NotFound` if the graph is empty (or no graph is attached)
    fn next_node_to_eliminate(&mut self) -> Result<NodeId>;

    /// Eliminate `node`: connect its neighbours pairwise and remove it.
    ///
    /// # Errors
    /// * `Error::NotFound` if `node` is not in the graph anymore
    fn elimination_update(&mut self, node: NodeId) -> Result<()>;

    /// The fill-in edges added by the eliminations so far
    fn fill_ins(&self) -> &[(NodeId, NodeId)];

    /// The graph remaining after the eliminations so far
    fn graph(&self) -> Option<&UndiGraph>;

    /// Detach the graph
    fn clear(&mut self);
}


/// Eliminate `node` from `graph`, recording the fill-ins. Returns the neighbours of the node.
fn eliminate(graph: &mut UndiGraph, node: NodeId, fill_ins: &mut Vec<(NodeId, NodeId)>) -> Result<NodeSet> {
    let neighbours = match graph.neighbours(node) {
        Ok(n) => n.clone(),
        Err(_) => return Err(Error::NotFound(format!("node {} in the graph to triangulate", node)))
    };

    let ns: Vec<NodeId> = neighbours.iter().cloned().collect();
    for (i, &a) in ns.iter().enumerate() {
        for &b in ns[i + 1..].iter() {
            if !graph.exists_edge(a, b) {
                graph.add_edge(a, b)?;
                fill_ins.push((a, b));
            }
        }
    }

    graph.erase_node(node);
    Ok(neighbours)
}


fn check_sizes(graph: &UndiGraph, domain_sizes: &BTreeMap<NodeId, usize>) -> Result<BTreeMap<NodeId, usize>> {
    graph.nodes()
         .map(|n| match domain_sizes.get(&n) {
             Some(&d) => Ok((n, d)),
             None => Err(Error::InvalidArgument(format!("node {} has no domain size", n)))
         })
         .collect()
}


/// The classes of nodes considered by `DefaultEliminationStrategy`, best first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// The neighbours already form a clique
    Simplicial,

    /// All the neighbours but one form a clique
    AlmostSimplicial,

    /// Most of the pairs of neighbours are already linked
    QuasiSimplicial,

    Other
}


/// The default heuristic: eliminate simplicial nodes first, then almost-simplicial, then
/// quasi-simplicial ones, and fall back on the node whose elimination creates the lightest clique
/// (Kjaerulff, 1990). Within a tier the lightest node wins, then the smallest id.
///
/// The weight of a node is the product of the domain sizes of the node and its neighbours; it is
/// kept in log space. Almost- and quasi-simplicial nodes are only chosen when their weight is at
/// most `(1 + weight_threshold)` times the lightest remaining weight.
#[derive(Clone, Debug)]
pub struct DefaultEliminationStrategy {
    config: TriangulationConfig,

    /// The graph as attached, used to detect identical `set_graph` calls
    original: Option<UndiGraph>,

    domain_sizes: BTreeMap<NodeId, usize>,

    /// The remaining graph
    graph: UndiGraph,

    log_weights: BTreeMap<NodeId, f64>,

    tiers: BTreeMap<NodeId, Tier>,

    fill_ins: Vec<(NodeId, NodeId)>
}


fn cmp_candidates(a: &(f64, NodeId), b: &(f64, NodeId)) -> Ordering {
    a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1))
}


impl DefaultEliminationStrategy {

    pub fn new(config: TriangulationConfig) -> Self {
        DefaultEliminationStrategy {
            config,
            original: None,
            domain_sizes: BTreeMap::new(),
            graph: UndiGraph::new(),
            log_weights: BTreeMap::new(),
            tiers: BTreeMap::new(),
            fill_ins: Vec::new()
        }
    }

    pub fn config(&self) -> &TriangulationConfig {
        &self.config
    }

    /// The current tier of a node, if it is still in the graph
    pub fn tier(&self, node: NodeId) -> Option<Tier> {
        self.tiers.get(&node).cloned()
    }

    fn log_weight(&self, node: NodeId) -> f64 {
        let own = (self.domain_sizes[&node] as f64).ln();
        self.graph.neighbours(node)
                  .map(|ns| ns.iter().map(|n| (self.domain_sizes[n] as f64).ln()).sum::<f64>())
                  .unwrap_or(0.0) + own
    }

    fn classify(&self, node: NodeId) -> Tier {
        let neighbours: Vec<NodeId> = match self.graph.neighbours(node) {
            Ok(ns) => ns.iter().cloned().collect(),
            Err(_) => return Tier::Other
        };

        let nb_pairs = neighbours.len() * neighbours.len().saturating_sub(1) / 2;
        if nb_pairs == 0 {
            return Tier::Simplicial;
        }

        // count the missing edges among the neighbours, and how many of them touch each neighbour
        let mut missing = 0;
        let mut missing_with = vec![0; neighbours.len()];
        for i in 0..neighbours.len() {
            for j in i + 1..neighbours.len() {
                if !self.graph.exists_edge(neighbours[i], neighbours[j]) {
                    missing += 1;
                    missing_with[i] += 1;
                    missing_with[j] += 1;
                }
            }
        }

        if missing == 0 {
            Tier::Simplicial
        } else if missing_with.iter().any(|&m| m == missing) {
            Tier::AlmostSimplicial
        } else if ((nb_pairs - missing) as f64) / (nb_pairs as f64) >= self.config.quasi_ratio {
            Tier::QuasiSimplicial
        } else {
            Tier::Other
        }
    }

    fn update(&mut self, nodes: &NodeSet) {
        for &n in nodes.iter() {
            let w = self.log_weight(n);
            let t = self.classify(n);
            self.log_weights.insert(n, w);
            self.tiers.insert(n, t);
        }
    }

    fn best_in(&self, tier: Tier, max_log_weight: f64) -> Option<NodeId> {
        self.tiers.iter()
                  .filter(|(_, &t)| t == tier)
                  .map(|(&n, _)| (self.log_weights[&n], n))
                  .filter(|&(w, _)| w <= max_log_weight)
                  .min_by(cmp_candidates)
                  .map(|(_, n)| n)
    }
}


impl Default for DefaultEliminationStrategy {
    fn default() -> Self {
        DefaultEliminationStrategy::new(TriangulationConfig::default())
    }
}


impl EliminationSequenceStrategy for DefaultEliminationStrategy {

    fn set_graph(&mut self, graph: &UndiGraph, domain_sizes: &BTreeMap<NodeId, usize>) -> Result<bool> {
        let sizes = check_sizes(graph, domain_sizes)?;

        if self.original.as_ref() == Some(graph) && self.domain_sizes == sizes && self.graph == *graph {
            return Ok(false);
        }

        self.original = Some(graph.clone());
        self.domain_sizes = sizes;
        self.graph = graph.clone();
        self.fill_ins.clear();
        self.log_weights.clear();
        self.tiers.clear();

        let all: NodeSet = graph.nodes().collect();
        self.update(&all);
        Ok(true)
    }

    fn next_node_to_eliminate(&mut self) -> Result<NodeId> {
        if self.graph.is_empty() {
            return Err(Error::NotFound(String::from("no node left to eliminate")));
        }

        let min_weight = self.log_weights.values().cloned().fold(std::f64::INFINITY, f64::min);
        let bound = min_weight + (1.0 + self.config.weight_threshold).ln();

        let choice = self.best_in(Tier::Simplicial, std::f64::INFINITY)
                         .map(|n| (n, Tier::Simplicial))
                         .or_else(|| self.best_in(Tier::AlmostSimplicial, bound).map(|n| (n, Tier::AlmostSimplicial)))
                         .or_else(|| self.best_in(Tier::QuasiSimplicial, bound).map(|n| (n, Tier::QuasiSimplicial)))
                         .or_else(|| {
                             self.log_weights.iter()
                                             .map(|(&n, &w)| (w, n))
                                             .min_by(cmp_candidates)
                                             .map(|(_, n)| (n, Tier::Other))
                         });

        match choice {
            Some((node, tier)) => {
                trace!("next node to eliminate: {} ({:?}, log weight {:.3})", node, tier, self.log_weights[&node]);
                Ok(node)
            },
            None => Err(Error::NotFound(String::from("no node left to eliminate")))
        }
    }

    fn elimination_update(&mut self, node: NodeId) -> Result<()> {
        let neighbours = eliminate(&mut self.graph, node, &mut self.fill_ins)?;
        self.log_weights.remove(&node);
        self.tiers.remove(&node);

        // the weights change for the neighbours only, the tiers for the neighbours and theirs
        let mut dirty = neighbours.clone();
        for &n in neighbours.iter() {
            dirty.extend(self.graph.neighbours(n)?.iter().cloned());
        }
        self.update(&dirty);
        Ok(())
    }

    fn fill_ins(&self) -> &[(NodeId, NodeId)] {
        &self.fill_ins
    }

    fn graph(&self) -> Option<&UndiGraph> {
        self.original.as_ref().map(|_| &self.graph)
    }

    fn clear(&mut self) {
        *self = DefaultEliminationStrategy::new(self.config);
    }
}


/// A strategy eliminating the nodes in an order given by the caller.
#[derive(Clone, Debug, Default)]
pub struct OrderedEliminationStrategy {
    order: Vec<NodeId>,

    /// The position in `order` of the next candidate
    next: usize,

    original: Option<UndiGraph>,

    graph: UndiGraph,

    fill_ins: Vec<(NodeId, NodeId)>
}


impl OrderedEliminationStrategy {

    pub fn new(order: Vec<NodeId>) -> Self {
        OrderedEliminationStrategy { order, ..Default::default() }
    }

    /// Replace the elimination order. The graph, if any, is reset to its attached state.
    pub fn set_order(&mut self, order: Vec<NodeId>) {
        self.order = order;
        self.next = 0;
        self.fill_ins.clear();
        if let Some(g) = self.original.as_ref() {
            self.graph = g.clone();
        }
    }

    pub fn order(&self) -> &[NodeId] {
        &self.order
    }
}


impl EliminationSequenceStrategy for OrderedEliminationStrategy {

    fn set_graph(&mut self, graph: &UndiGraph, domain_sizes: &BTreeMap<NodeId, usize>) -> Result<bool> {
        check_sizes(graph, domain_sizes)?;

        if self.original.as_ref() == Some(graph) && self.graph == *graph {
            return Ok(false);
        }

        self.original = Some(graph.clone());
        self.graph = graph.clone();
        self.next = 0;
        self.fill_ins.clear();
        Ok(true)
    }

    fn next_node_to_eliminate(&mut self) -> Result<NodeId> {
        while self.next < self.order.len() && !self.graph.exists_node(self.order[self.next]) {
            self.next += 1;
        }

        if self.graph.is_empty() || self.next >= self.order.len() {
            return Err(Error::NotFound(String::from("no node left to eliminate in the given order")));
        }
        Ok(self.order[self.next])
    }

    fn elimination_update(&mut self, node: NodeId) -> Result<()> {
        eliminate(&mut self.graph, node, &mut self.fill_ins)?;
        Ok(())
    }

    fn fill_ins(&self) -> &[(NodeId, NodeId)] {
        &self.fill_ins
    }

    fn graph(&self) -> Option<&UndiGraph> {
        self.original.as_ref().map(|_| &self.graph)
    }

    fn clear(&mut self) {
        let order = std::mem::replace(&mut self.order, Vec::new());
        *self = OrderedEliminationStrategy::new(order);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn graph(n: usize, edges: &[(NodeId, NodeId)]) -> UndiGraph {
        let mut g = UndiGraph::new();
        for _ in 0..n {
            g.add_node();
        }
        for &(a, b) in edges {
            g.add_edge(a, b).unwrap();
        }
        g
    }

    fn sizes(n: usize, d: usize) -> BTreeMap<NodeId, usize> {
        (0..n).map(|i| (i, d)).collect()
    }

    #[test]
    fn empty_graph() {
        let mut s = DefaultEliminationStrategy::default();
        assert!(s.next_node_to_eliminate().is_err());

        s.set_graph(&UndiGraph::new(), &BTreeMap::new()).unwrap();
        match s.next_node_to_eliminate() {
            Err(Error::NotFound(_)) => (),
            other => panic!("expected NotFound, got {:?}", other)
        }
    }

    #[test]
    fn set_graph_is_idempotent() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let mut s = DefaultEliminationStrategy::default();
        assert!(s.set_graph(&g, &sizes(3, 2)).unwrap());
        assert!(!s.set_graph(&g, &sizes(3, 2)).unwrap());
        assert!(s.set_graph(&g, &sizes(3, 3)).unwrap());

        let node = s.next_node_to_eliminate().unwrap();
        s.elimination_update(node).unwrap();
        assert!(s.set_graph(&g, &sizes(3, 3)).unwrap());

        assert!(s.set_graph(&g, &sizes(2, 2)).is_err());
    }

    #[test]
    fn simplicial_first() {
        // a 4-cycle 0-1-2-3 with a pendant node 4 attached to 0
        let g = graph(5, &[(0, 1), (1, 2), (2, 3), (3, 0), (0, 4)]);
        let mut s = DefaultEliminationStrategy::default();
        s.set_graph(&g, &sizes(5, 2)).unwrap();

        assert_eq!(Some(Tier::Simplicial), s.tier(4));
        assert_eq!(Some(Tier::AlmostSimplicial), s.tier(1));
        assert_eq!(4, s.next_node_to_eliminate().unwrap());
    }

    #[test]
    fn double_elimination() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let mut s = DefaultEliminationStrategy::default();
        s.set_graph(&g, &sizes(3, 2)).unwrap();

        s.elimination_update(1).unwrap();
        assert_eq!(&[(0, 2)], s.fill_ins());
        match s.elimination_update(1) {
            Err(Error::NotFound(_)) => (),
            other => panic!("expected NotFound, got {:?}", other)
        }
    }

    #[test]
    fn incremental_tiers() {
        // a 4-cycle: no simplicial node until one is eliminated
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let mut s = DefaultEliminationStrategy::default();
        s.set_graph(&g, &sizes(4, 2)).unwrap();

        for n in 0..4 {
            assert_eq!(Some(Tier::AlmostSimplicial), s.tier(n));
        }

        let first = s.next_node_to_eliminate().unwrap();
        assert_eq!(0, first);
        s.elimination_update(first).unwrap();
        assert_eq!(&[(1, 3)], s.fill_ins());

        // the remaining triangle is made of simplicial nodes
        for n in 1..4 {
            assert_eq!(Some(Tier::Simplicial), s.tier(n));
        }
    }

    #[test]
    fn quasi_and_other() {
        // 0 is linked to 1..=4, whose only links are 1-2 and 3-4
        let g = graph(5, &[(0, 1), (0, 2), (0, 3), (0, 4), (1, 2), (3, 4)]);
        let mut s = DefaultEliminationStrategy::default();
        s.set_graph(&g, &sizes(5, 2)).unwrap();
        assert_eq!(Some(Tier::Other), s.tier(0));

        let mut s = DefaultEliminationStrategy::new(TriangulationConfig::default().with_quasi_ratio(0.3));
        s.set_graph(&g, &sizes(5, 2)).unwrap();
        assert_eq!(Some(Tier::QuasiSimplicial), s.tier(0));
    }

    #[test]
    fn almost_simplicial() {
        // 0 is linked to the triangle 1-2-3 and to 4; 4 is linked to 5
        let g = graph(6, &[(1, 2), (2, 3), (1, 3), (0, 1), (0, 2), (0, 3), (0, 4), (4, 5), (3, 5)]);
        let mut s = DefaultEliminationStrategy::default();
        s.set_graph(&g, &sizes(6, 2)).unwrap();
        assert_eq!(Some(Tier::AlmostSimplicial), s.tier(0));
    }

    #[test]
    fn ordered_strategy() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let mut s = OrderedEliminationStrategy::new(vec![2, 0, 1, 3]);
        s.set_graph(&g, &sizes(4, 2)).unwrap();

        let mut order = Vec::new();
        while let Ok(n) = s.next_node_to_eliminate() {
            s.elimination_update(n).unwrap();
            order.push(n);
        }
        assert_eq!(vec![2, 0, 1, 3], order);
        assert_eq!(&[(1, 3)], s.fill_ins());
    }
}
