//! Triangulation of undirected graphs and construction of junction trees.
//!
//! A `Triangulation` eliminates the nodes of a graph in the order chosen by an
//! `EliminationSequenceStrategy`. Each elimination creates a clique (the node and its remaining
//! neighbours); linking every clique to the clique of its earliest-eliminated neighbour gives the
//! elimination tree, and absorbing the non-maximal cliques of that tree into their neighbours gives
//! the junction tree.
//!
//! See Koller & Friedman 9.4 and 10.4.

pub mod elimination;

pub use self::elimination::{DefaultEliminationStrategy, EliminationSequenceStrategy, OrderedEliminationStrategy, Tier};

use crate::graph::{CliqueGraph, NodeSet, UndiGraph};
use crate::util::{Error, NodeId, Result};

use log::debug;

use std::collections::BTreeMap;


/// The knobs of the default elimination heuristic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangulationConfig {
    /// Minimal fraction of the pairs of neighbours already linked for a node to be
    /// quasi-simplicial
    pub quasi_ratio: f64,

    /// An almost- or quasi-simplicial node is only eliminated if its weight is at most
    /// `(1 + weight_threshold)` times the lightest weight of the graph
    pub weight_threshold: f64
}


impl Default for TriangulationConfig {
    fn default() -> Self {
        TriangulationConfig { quasi_ratio: 0.99, weight_threshold: 0.5 }
    }
}


impl TriangulationConfig {

    pub fn with_quasi_ratio(mut self, ratio: f64) -> Self {
        self.quasi_ratio = ratio;
        self
    }

    pub fn with_weight_threshold(mut self, threshold: f64) -> Self {
        self.weight_threshold = threshold;
        self
    }
}


/// The results of a triangulation run
#[derive(Clone, Debug, Default)]
struct Triangulated {
    elimination_order: Vec<NodeId>,

    /// The position of each node in the elimination order
    reverse_order: BTreeMap<NodeId, usize>,

    fill_ins: Vec<(NodeId, NodeId)>,

    triangulated_graph: UndiGraph,

    elimination_tree: CliqueGraph,

    junction_tree: CliqueGraph,

    /// The junction tree clique created by the elimination of each node
    node_to_clique: BTreeMap<NodeId, NodeId>
}


/// Triangulates a graph and derives its junction tree. The results are computed lazily on the
/// first query and cached until a new graph is attached.
#[derive(Clone, Debug)]
pub struct Triangulation<S: EliminationSequenceStrategy = DefaultEliminationStrategy> {
    strategy: S,

    graph: Option<UndiGraph>,

    domain_sizes: BTreeMap<NodeId, usize>,

    result: Option<Triangulated>
}


impl Triangulation<DefaultEliminationStrategy> {

    /// A `Triangulation` using the default heuristic with the given settings
    pub fn with_config(config: TriangulationConfig) -> Self {
        Triangulation::new(DefaultEliminationStrategy::new(config))
    }
}


impl Default for Triangulation<DefaultEliminationStrategy> {
    fn default() -> Self {
        Triangulation::with_config(TriangulationConfig::default())
    }
}


impl<S: EliminationSequenceStrategy> Triangulation<S> {

    pub fn new(strategy: S) -> Self {
        Triangulation { strategy, graph: None, domain_sizes: BTreeMap::new(), result: None }
    }

    /// Attach the graph to triangulate and the domain size of each node. Cached results are
    /// dropped.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if a node has no domain size
    pub fn set_graph(&mut self, graph: &UndiGraph, domain_sizes: &BTreeMap<NodeId, usize>) -> Result<()> {
        if let Some(n) = graph.nodes().find(|n| !domain_sizes.contains_key(n)) {
            return Err(Error::InvalidArgument(format!("node {} has no domain size", n)));
        }

        self.graph = Some(graph.clone());
        self.domain_sizes = graph.nodes().map(|n| (n, domain_sizes[&n])).collect();
        self.result = None;
        Ok(())
    }

    /// Detach the graph and drop every result
    pub fn clear(&mut self) {
        self.graph = None;
        self.domain_sizes.clear();
        self.result = None;
        self.strategy.clear();
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The graph attached, if any
    pub fn original_graph(&self) -> Option<&UndiGraph> {
        self.graph.as_ref()
    }

    /// The order in which the nodes are eliminated
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if no graph is attached
    pub fn elimination_order(&mut self) -> Result<&[NodeId]> {
        Ok(&self.triangulate()?.elimination_order)
    }

    /// The position of `node` in the elimination order
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if no graph is attached
    /// * `Error::NotFound` if `node` is not in the graph
    pub fn elimination_index(&mut self, node: NodeId) -> Result<usize> {
        self.triangulate()?
            .reverse_order
            .get(&node)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {} in the triangulated graph", node)))
    }

    /// The edges added by the triangulation
    pub fn fill_ins(&mut self) -> Result<&[(NodeId, NodeId)]> {
        Ok(&self.triangulate()?.fill_ins)
    }

    /// The original graph plus the fill-ins
    pub fn triangulated_graph(&mut self) -> Result<&UndiGraph> {
        Ok(&self.triangulate()?.triangulated_graph)
    }

    /// One clique per node, identified by its elimination index
    pub fn elimination_tree(&mut self) -> Result<&CliqueGraph> {
        Ok(&self.triangulate()?.elimination_tree)
    }

    /// The junction tree: the elimination tree without its non-maximal cliques
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if no graph is attached
    pub fn junction_tree(&mut self) -> Result<&CliqueGraph> {
        Ok(&self.triangulate()?.junction_tree)
    }

    /// The junction tree clique created by the elimination of `node`. It contains the node and
    /// its neighbours at elimination time.
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if no graph is attached
    /// * `Error::NotFound` if `node` is not in the graph
    pub fn created_clique(&mut self, node: NodeId) -> Result<NodeId> {
        self.triangulate()?
            .node_to_clique
            .get(&node)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {} in the triangulated graph", node)))
    }

    /// A map from every node to the clique created by its elimination
    pub fn node_to_clique(&mut self) -> Result<&BTreeMap<NodeId, NodeId>> {
        Ok(&self.triangulate()?.node_to_clique)
    }

    /// A junction tree clique containing every node of `nodes`.
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if no graph is attached
    /// * `Error::NotFound` if no clique contains all the nodes
    pub fn clique_containing(&mut self, nodes: &NodeSet) -> Result<NodeId> {
        let result = self.triangulate()?;

        // the clique created by the first eliminated node holds the others when they form a
        // clique of the triangulated graph
        let first = nodes.iter()
                         .filter_map(|n| result.reverse_order.get(n).map(|&i| (i, *n)))
                         .min()
                         .map(|(_, n)| n);
        if let Some(first) = first {
            let id = result.node_to_clique[&first];
            if nodes.is_subset(result.junction_tree.clique(id)?) {
                return Ok(id);
            }
        }

        result.junction_tree
              .cliques()
              .find(|(_, c)| nodes.is_subset(c))
              .map(|(id, _)| id)
              .ok_or_else(|| Error::NotFound(format!("clique containing {:?}", nodes)))
    }

    /// The log10 of the domain size of the largest clique of the junction tree
    pub fn max_log10_clique_domain_size(&mut self) -> Result<f64> {
        let sizes = self.domain_sizes.clone();
        let result = self.triangulate()?;
        Ok(result.junction_tree
                 .cliques()
                 .map(|(_, c)| c.iter().map(|n| (sizes[n] as f64).log10()).sum::<f64>())
                 .fold(0.0, f64::max))
    }

    /// Run the triangulation if it has not been run on the current graph.
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if no graph is attached
    fn triangulate(&mut self) -> Result<&Triangulated> {
        let result = match self.result.take() {
            Some(result) => result,
            None => {
                let graph = self.graph
                                .as_ref()
                                .ok_or_else(|| Error::UndefinedElement(String::from("no graph to triangulate")))?;
                Self::run(&mut self.strategy, graph, &self.domain_sizes)?
            }
        };

        Ok(self.result.get_or_insert(result))
    }

    fn run(strategy: &mut S, graph: &UndiGraph, domain_sizes: &BTreeMap<NodeId, usize>) -> Result<Triangulated> {
        let mut res = Triangulated::default();

        ///////////////////////////////////////////////////////////////////////
        // 1) eliminate every node, recording the clique it creates
        strategy.set_graph(graph, domain_sizes)?;
        let mut created: Vec<NodeSet> = Vec::with_capacity(graph.size());

        for _ in 0..graph.size() {
            let node = strategy.next_node_to_eliminate()?;
            let mut clique = strategy.graph()
                                     .ok_or_else(|| Error::UndefinedElement(String::from("no graph to triangulate")))?
                                     .neighbours(node)?
                                     .clone();
            clique.insert(node);

            strategy.elimination_update(node)?;
            res.reverse_order.insert(node, res.elimination_order.len());
            res.elimination_order.push(node);
            created.push(clique);
        }

        res.fill_ins = strategy.fill_ins().to_vec();
        res.triangulated_graph = graph.clone();
        for &(a, b) in res.fill_ins.iter() {
            res.triangulated_graph.add_edge(a, b)?;
        }

        ///////////////////////////////////////////////////////////////////////
        // 2) the elimination tree: link each clique to the clique of its earliest eliminated
        //    remaining neighbour
        for (i, clique) in created.iter().enumerate() {
            res.elimination_tree.add_clique_with_id(i, clique.clone())?;
        }

        for (i, clique) in created.iter().enumerate() {
            let node = res.elimination_order[i];
            let parent = clique.iter()
                               .filter(|&&n| n != node)
                               .map(|n| res.reverse_order[n])
                               .min();
            if let Some(j) = parent {
                res.elimination_tree.add_edge(i, j)?;
            }
        }

        ///////////////////////////////////////////////////////////////////////
        // 3) the junction tree: from the last clique created to the first, absorb a clique into an
        //    adjacent earlier clique holding one more node (hence all of its nodes)
        let mut junction_tree = res.elimination_tree.clone();
        let mut substitution: Vec<usize> = (0..created.len()).collect();

        for i in (0..created.len()).rev() {
            let size = created[i].len();
            let neighbours = junction_tree.neighbours(i)?.clone();
            let absorber = neighbours.iter()
                                     .cloned()
                                     .filter(|&j| j < i)
                                     .find(|&j| created[j].len() == size + 1 && created[i].is_subset(&created[j]));

            if let Some(j) = absorber {
                for &k in neighbours.iter().filter(|&&k| k != j) {
                    junction_tree.add_edge(j, k)?;
                }
                junction_tree.erase_clique(i);
                substitution[i] = j;
            }
        }

        // substitutions may chain: resolve them transitively
        for i in 0..substitution.len() {
            let mut j = substitution[i];
            while substitution[j] != j {
                j = substitution[j];
            }
            substitution[i] = j;
        }

        res.node_to_clique = res.elimination_order
                                .iter()
                                .enumerate()
                                .map(|(i, &n)| (n, substitution[i]))
                                .collect();
        res.junction_tree = junction_tree;

        debug!(
            "triangulated {} nodes: {} fill-ins, {} cliques in the junction tree",
            graph.size(), res.fill_ins.len(), res.junction_tree.size()
        );

        Ok(res)
    }
}
