//! Defines a `BayesNet`, the factorization of a probability distribution P over a set of discrete
//! `Variable`s along a Directed Acyclic Graph: ```P(X_1, ..., X_n) = prod_i P(X_i | Pa(X_i))```

use crate::graph::{Dag, NodeSet, UndiGraph};
use crate::init::Initialization;
use crate::instantiation::Instantiation;
use crate::potential::Potential;
use crate::util::{Error, NodeId, Result};
use crate::variable::Variable;

use bidir_map::BidirMap;
use indexmap::IndexMap;
use log::debug;

use std::fmt;


/// Represents a Bayesian Network - a Directed Probabilistic Graphical Model.
///
/// # Representation
/// Every `Variable` is attached to a node of a `Dag`, and holds a Conditional Probability Table
/// over ```Pa(X), X```. The parents come first, ordered by node id, and the child variable last.
/// The structure can be edited after construction: adding or erasing an arc extends or shrinks
/// the CPT of its head accordingly.
#[derive(Clone)]
pub struct BayesNet {

    dag: Dag,

    /// The `Variable` of each node
    variables: IndexMap<NodeId, Variable>,

    /// The CPT of each node
    cpts: IndexMap<NodeId, Potential>,

    /// The user-defined names of each node. This is a two way lookup ```(node->Name)``` and
    /// ```(Name->node)```
    names: BidirMap<NodeId, String>

}


impl BayesNet {

    /// Construct an empty `BayesNet`
    pub fn new() -> Self {
        BayesNet { dag: Dag::new(), variables: IndexMap::new(), cpts: IndexMap::new(), names: BidirMap::new() }
    }

    /// The underlying graph
    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// The number of nodes
    pub fn size(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn size_arcs(&self) -> usize {
        self.dag.size_arcs()
    }

    /// The nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.variables.keys().cloned()
    }

    pub fn node_set(&self) -> NodeSet {
        self.nodes().collect()
    }

    pub fn exists_node(&self, node: NodeId) -> bool {
        self.variables.contains_key(&node)
    }

    /// # Errors
    /// * `Error::InvalidNode` if `node` is not in the network
    pub fn variable(&self, node: NodeId) -> Result<&Variable> {
        self.variables.get(&node).ok_or(Error::InvalidNode(node))
    }

    /// The CPT of `node`, over ```Pa(node), node```
    ///
    /// # Errors
    /// * `Error::InvalidNode` if `node` is not in the network
    pub fn cpt(&self, node: NodeId) -> Result<&Potential> {
        self.cpts.get(&node).ok_or(Error::InvalidNode(node))
    }

    /// Lookup the node of a `Variable`
    pub fn node_id(&self, var: &Variable) -> Result<NodeId> {
        self.variables
            .iter()
            .find(|(_, v)| *v == var)
            .map(|(&n, _)| n)
            .ok_or_else(|| Error::NotFound(format!("variable {}", var.name())))
    }

    /// Lookup a node based on its name
    pub fn id_from_name(&self, name: &str) -> Result<NodeId> {
        self.names
            .get_by_second(&String::from(name))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node named {}", name)))
    }

    /// Lookup the name of a node
    pub fn name(&self, node: NodeId) -> Result<&str> {
        self.names.get_by_first(&node).map(|s| s.as_str()).ok_or(Error::InvalidNode(node))
    }

    /// Lookup a `Variable` based on the name of its node
    pub fn variable_from_name(&self, name: &str) -> Result<&Variable> {
        self.variable(self.id_from_name(name)?)
    }

    pub fn parents(&self, node: NodeId) -> Result<&NodeSet> {
        self.dag.parents(node)
    }

    pub fn children(&self, node: NodeId) -> Result<&NodeSet> {
        self.dag.children(node)
    }

    pub fn exists_arc(&self, tail: NodeId, head: NodeId) -> bool {
        self.dag.exists_arc(tail, head)
    }

    pub fn arcs(&self) -> Vec<(NodeId, NodeId)> {
        self.dag.arcs()
    }

    /// A topological order of the nodes
    pub fn topological_order(&self) -> Vec<NodeId> {
        self.dag.topological_order()
    }

    /// The moral graph: the DAG with parents of a common child married and arcs undirected
    pub fn moral_graph(&self) -> UndiGraph {
        self.dag.moral_graph()
    }

    /// Add a `Variable` with no parents and a uniform CPT.
    ///
    /// # Args
    /// * `var`: the variable
    /// * `name`: the name of the node, defaults to the name of the variable
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if the variable or the name is already in the network
    pub fn add_variable(&mut self, var: &Variable, name: Option<&str>) -> Result<NodeId> {
        let name = String::from(name.unwrap_or_else(|| var.name()));
        if self.variables.values().any(|v| v == var) {
            return Err(Error::DuplicateElement(format!("variable {}", var.name())));
        }
        if self.names.contains_second_key(&name) {
            return Err(Error::DuplicateElement(format!("node name {}", name)));
        }

        let cpt = Initialization::Uniform.build_cpt(var, &[])?;
        let node = self.dag.add_node();
        self.variables.insert(node, var.clone());
        self.cpts.insert(node, cpt);
        self.names.insert(node, name);
        Ok(node)
    }

    /// Remove a node, its arcs and its variable from the CPTs of its children. The children keep
    /// the slice of their CPT matching the first value of the removed variable.
    ///
    /// Removing a node which is not in the network does nothing.
    pub fn erase_variable(&mut self, node: NodeId) -> Result<()> {
        let var = match self.variables.get(&node) {
            Some(v) => v.clone(),
            None => return Ok(())
        };

        let children: Vec<NodeId> = self.dag.children(node)?.iter().cloned().collect();
        for child in children {
            if let Some(cpt) = self.cpts.get_mut(&child) {
                cpt.erase_variable(&var)?;
            }
        }

        self.dag.erase_node(node);
        self.variables.shift_remove(&node);
        self.cpts.shift_remove(&node);
        self.names.remove_by_first(&node);
        Ok(())
    }

    /// Add the arc ```tail -> head```. The CPT of `head` is extended over `tail`, its values
    /// repeated along the new dimension. Adding an existing arc does nothing.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if one of the nodes is not in the network
    /// * `Error::DirectedCycle` if the arc would create a directed cycle
    pub fn add_arc(&mut self, tail: NodeId, head: NodeId) -> Result<()> {
        if self.dag.exists_arc(tail, head) {
            return Ok(());
        }

        let parent = self.variable(tail)?.clone();
        self.variable(head)?;
        self.dag.add_arc(tail, head)?;

        let order = self.cpt_order(head)?;
        if let Some(cpt) = self.cpts.get_mut(&head) {
            cpt.add_variable(&parent)?;
            *cpt = cpt.reorganize(&order)?;
        }
        Ok(())
    }

    /// Remove the arc ```tail -> head```. The CPT of `head` keeps the slice matching the first
    /// value of `tail`. Removing an arc which is not in the network does nothing.
    pub fn erase_arc(&mut self, tail: NodeId, head: NodeId) -> Result<()> {
        if !self.dag.exists_arc(tail, head) {
            return Ok(());
        }

        let parent = self.variable(tail)?.clone();
        self.dag.erase_arc(tail, head);
        if let Some(cpt) = self.cpts.get_mut(&head) {
            cpt.erase_variable(&parent)?;
        }
        Ok(())
    }

    /// Replace the CPT of `node`.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if `node` is not in the network
    /// * `Error::InvalidArgument` if `cpt` does not range exactly over ```Pa(node), node```
    /// * `Error::NotACpt` if `cpt` is not normalized over the variable of `node`
    pub fn set_cpt(&mut self, node: NodeId, cpt: Potential) -> Result<()> {
        let var = self.variable(node)?.clone();
        let order = self.cpt_order(node)?;
        let cpt = Initialization::Table(cpt).build_cpt(&var, &order[..order.len() - 1])?;
        self.cpts.insert(node, cpt);
        Ok(())
    }

    /// The variables of the CPT of `node`, in storage order
    fn cpt_order(&self, node: NodeId) -> Result<Vec<Variable>> {
        let mut order = Vec::new();
        for &p in self.dag.parents(node)?.iter() {
            order.push(self.variable(p)?.clone());
        }
        order.push(self.variable(node)?.clone());
        Ok(order)
    }

    /// All the variables of the network, in node order
    pub fn variables(&self) -> Vec<Variable> {
        self.variables.values().cloned().collect()
    }

    /// An `Instantiation` over every variable of the network, set to the first value of each
    pub fn complete_instantiation(&self) -> Instantiation {
        Instantiation::from_vars(&self.variables())
    }

    /// Determine the probability of a complete `Instantiation` of the network.
    ///
    /// Specifically, this computes ```P(zeta) = prod_i P(zeta[X_i] | zeta[Pa(X_i)])``` (chain rule
    /// for Bayesian Networks, Koller & Friedman 3.2.3).
    ///
    /// # Errors
    /// * `Error::IncompleteInstantiation` if a variable has no value
    pub fn probability(&self, inst: &Instantiation) -> Result<f64> {
        self.cpts
            .values()
            .map(|cpt| cpt.get(inst))
            .fold(Ok(1.0), |acc, val| acc.and_then(|p| val.map(|v| p * v)))
    }

    /// ```log2 P(zeta)```, see `probability`
    pub fn log2_probability(&self, inst: &Instantiation) -> Result<f64> {
        Ok(self.probability(inst)?.log2())
    }

    /// The full joint distribution, as the product of every CPT. Only tractable for small networks.
    pub fn joint_distribution(&self) -> Potential {
        let joint = self.cpts.values().fold(Potential::new(), |acc, cpt| acc.product(cpt));
        debug!("joint distribution of {} nodes has {} entries", self.size(), joint.domain_size());
        joint
    }

    /// The number of free parameters of the network: ```sum_i (|X_i| - 1) * |Pa(X_i)|```
    pub fn dim(&self) -> usize {
        self.cpts
            .iter()
            .map(|(n, cpt)| {
                let size = self.variables[n].domain_size();
                (size - 1) * cpt.domain_size() / size
            })
            .sum()
    }
}


impl Default for BayesNet {

    fn default() -> Self {
        BayesNet::new()
    }
}


impl fmt::Debug for BayesNet {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BayesNet {{ nodes: {}, arcs: {:?} }}", self.size(), self.arcs())
    }
}


/// An implementation of the [builder pattern] for creating a `BayesNet`.
///
/// Variables must be added in a topological order: the parents of a variable are added before
/// it. Nodes are numbered in insertion order, starting at 0.
///
/// [builder pattern]: https://en.wikipedia.org/wiki/Builder_pattern
pub struct BayesNetBuilder {

    /// The `Variable`s and their associated CPTs
    factors: IndexMap<Variable, Potential>,

    /// The parents of each `Variable`
    parents: IndexMap<Variable, Vec<Variable>>,

    /// The names of each `Variable`
    names: BidirMap<Variable, String>,

    /// The error state of the builder
    err: Option<Error>

}


impl Default for BayesNetBuilder {

    fn default() -> Self {
        BayesNetBuilder::new()
    }
}


impl BayesNetBuilder {

    /// Construct a new `BayesNetBuilder` representing an empty `BayesNet`
    pub fn new() -> Self {
        BayesNetBuilder {
            factors: IndexMap::new(),
            parents: IndexMap::new(),
            names: BidirMap::new(),
            err: None
        }
    }

    /// Add a `Variable`, named after itself, to the `BayesNet`.
    ///
    /// # Args
    /// * `var`: the variable to add to the model
    /// * `parents`: the parent variables. The parents must already be in the model.
    /// * `init`: the initialization mechanism for the CPT of `var` in the model.
    pub fn with_variable(self, var: &Variable, parents: &[Variable], init: Initialization) -> Self {
        let name = String::from(var.name());
        self.add_variable(var, name, parents, init)
    }

    /// Add a named `Variable` to the `BayesNet`.
    ///
    /// # Args
    /// * `var`: the variable to add to the model
    /// * `name`: the name for the variable.
    /// * `parents`: the parent variables. The parents must already be in the model.
    /// * `init`: the initialization mechanism for the CPT of `var` in the model.
    pub fn with_named_variable(self, var: &Variable, name: &str, parents: &[Variable], init: Initialization) -> Self {
        self.add_variable(var, String::from(name), parents, init)
    }

    /// Complete building the model.
    ///
    /// # Returns
    /// the `BayesNet`, or the first error generated during the building process
    pub fn build(self) -> Result<BayesNet> {
        if let Some(e) = self.err {
            return Err(e);
        }

        let mut bn = BayesNet::new();
        let mut ids = IndexMap::new();
        for (var, _) in self.factors.iter() {
            let name = self.names.get_by_first(var).cloned().unwrap_or_else(|| String::from(var.name()));
            let node = bn.add_variable(var, Some(&name))?;
            ids.insert(var.clone(), node);
        }

        for (var, parents) in self.parents.iter() {
            for p in parents {
                bn.dag.add_arc(ids[p], ids[var])?;
            }
        }

        for (var, cpt) in self.factors.into_iter() {
            let node = ids[&var];
            let order = bn.cpt_order(node)?;
            bn.cpts.insert(node, cpt.reorganize(&order)?);
        }

        debug!("built a bayes net with {} nodes and {} arcs", bn.size(), bn.size_arcs());
        Ok(bn)
    }

    /// Internal function that actually does the variable addition to the model
    fn add_variable(mut self, var: &Variable, name: String, parents: &[Variable], init: Initialization) -> Self {
        ///////////////////////////////////////////////////////////////////////
        // 1) if we are in an error state, do nothing
        if self.err.is_some() {
            return self;
        }

        ///////////////////////////////////////////////////////////////////////
        // 2) Check for error conditions
        if let Some(p) = parents.iter().find(|v| !self.factors.contains_key(*v)) {
            self.err = Some(Error::MissingParent(String::from(p.name())));
            return self;
        }

        if self.factors.contains_key(var) || self.names.contains_second_key(&name) {
            self.err = Some(Error::DuplicateElement(name));
            return self;
        }

        ///////////////////////////////////////////////////////////////////////
        // 3) Build the CPT based on the initialization
        match init.build_cpt(var, parents) {
            Ok(cpt) => {
                ///////////////////////////////////////////////////////////////
                // 4) Add to current model
                self.factors.insert(var.clone(), cpt);
                self.parents.insert(var.clone(), parents.to_vec());
                self.names.insert(var.clone(), name);
            }
            Err(e) => self.err = Some(e)
        }

        self
    }
}
