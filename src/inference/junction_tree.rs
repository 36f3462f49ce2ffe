//! Exact inference by message passing over a junction tree.
//!
//! The moral graph of the network, without the nodes with hard evidence, is triangulated into a
//! junction tree. Each requisite CPT, reduced by the hard evidence, is assigned to a clique
//! containing its family, and each relevant soft finding to the clique of its node. Messages are
//! then passed in both directions along every edge of the tree (Shafer-Shenoy): the message from
//! clique `i` to clique `j` is the combination of the tables of `i` and of the messages `i`
//! received from its other neighbours, with the variables outside the separator summed out. The
//! whole propagation is planned into a `Schedule` before being executed.
//!
//! The posterior of a node is extracted from a clique containing it, by combining the clique's
//! tables with all of its incoming messages.
//!
//! Implementation of Koller & Friedman Algorithm 10.2 - Sum-Product message passing on a clique
//! tree, with the calibration of section 10.2.2.

use crate::combination::MultiDimCombineAndProject;
use crate::graph::{node_set, CliqueGraph, NodeSet};
use crate::inference::dsep::bayes_ball;
use crate::inference::{
    BayesNetInference, Evidence, EvidenceChange, InferenceConfig, MarginalTargetedInference, MarginalTargets,
    PosteriorProvider
};
use crate::model::BayesNet;
use crate::parallel::{thread_range, ThreadExecutor};
use crate::potential::{CombineOp, Potential, ProjectOp};
use crate::schedule::{MultiDimId, Schedule};
use crate::triangulation::Triangulation;
use crate::util::{Error, NodeId, Result};
use crate::variable::Variable;

use log::{debug, trace};

use std::collections::BTreeMap;


/// Where an engine stands with respect to its evidence and targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InferenceState {
    /// The junction tree must be rebuilt: the hard evidence nodes or the joint targets changed
    OutdatedStructure,

    /// The junction tree is valid but the messages and posteriors must be recomputed
    OutdatedPotentials,

    /// The posterior of every target is available
    Done
}


/// Exact inference engine over a `BayesNet` using a junction tree.
///
/// Every node is a target by default. Besides single nodes, sets of nodes can be declared as
/// joint targets; the junction tree is then built so that each one fits in a clique.
pub struct JunctionTreeInference<'a> {
    bn: &'a BayesNet,

    config: InferenceConfig,

    targets: MarginalTargets,

    joint_targets: Vec<NodeSet>,

    evidence: Evidence,

    state: InferenceState,

    triangulation: Triangulation,

    junction_tree: CliqueGraph,

    /// A clique containing each node of the junction tree
    node_to_clique: BTreeMap<NodeId, NodeId>,

    /// A clique containing each joint target, hard evidence nodes excluded
    joint_target_to_clique: BTreeMap<NodeSet, NodeId>,

    /// The tables assigned to each clique
    clique_tables: BTreeMap<NodeId, Vec<Potential>>,

    /// The message sent along each directed edge `(from, to)`, as a set of tables
    messages: BTreeMap<(NodeId, NodeId), Vec<Potential>>,

    posteriors: BTreeMap<NodeId, Potential>,

    joint_posteriors: BTreeMap<NodeSet, Potential>
}


impl<'a> JunctionTreeInference<'a> {

    pub fn new(bn: &'a BayesNet) -> Self {
        JunctionTreeInference::with_config(bn, InferenceConfig::default())
    }

    pub fn with_config(bn: &'a BayesNet, config: InferenceConfig) -> Self {
        JunctionTreeInference {
            bn,
            config,
            targets: MarginalTargets::new(bn.node_set()),
            joint_targets: Vec::new(),
            evidence: Evidence::new(),
            state: InferenceState::OutdatedStructure,
            triangulation: Triangulation::with_config(config.triangulation),
            junction_tree: CliqueGraph::new(),
            node_to_clique: BTreeMap::new(),
            joint_target_to_clique: BTreeMap::new(),
            clique_tables: BTreeMap::new(),
            messages: BTreeMap::new(),
            posteriors: BTreeMap::new(),
            joint_posteriors: BTreeMap::new()
        }
    }

    pub fn state(&self) -> InferenceState {
        self.state
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// The junction tree for the current hard evidence and joint targets, built if needed
    pub fn junction_tree(&mut self) -> Result<&CliqueGraph> {
        if self.state == InferenceState::OutdatedStructure {
            self.prepare_structure()?;
            self.state = InferenceState::OutdatedPotentials;
        }
        Ok(&self.junction_tree)
    }

    /// Declare `nodes` as a joint target. A set included in an existing joint target is not
    /// added; existing joint targets included in `nodes` are replaced.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if `nodes` is empty
    /// * `Error::InvalidNode` if a node is not in the network
    pub fn add_joint_target(&mut self, nodes: &NodeSet) -> Result<()> {
        if nodes.is_empty() {
            return Err(Error::InvalidArgument(String::from("empty joint target")));
        }
        if let Some(&n) = nodes.iter().find(|&&n| !self.bn.exists_node(n)) {
            return Err(Error::InvalidNode(n));
        }
        if self.joint_targets.iter().any(|t| nodes.is_subset(t)) {
            return Ok(());
        }

        self.joint_targets.retain(|t| !t.is_subset(nodes));
        self.joint_targets.push(nodes.clone());
        self.outdate(InferenceState::OutdatedStructure);
        Ok(())
    }

    /// Remove a joint target. Removing a set which is not a joint target does nothing.
    pub fn erase_joint_target(&mut self, nodes: &NodeSet) {
        let before = self.joint_targets.len();
        self.joint_targets.retain(|t| t != nodes);
        if self.joint_targets.len() != before {
            self.joint_posteriors.retain(|k, _| !k.is_subset(nodes));
        }
    }

    pub fn erase_all_joint_targets(&mut self) {
        self.joint_targets.clear();
        self.joint_posteriors.clear();
    }

    pub fn joint_targets(&self) -> &[NodeSet] {
        &self.joint_targets
    }

    /// The posterior of the nodes `nodes` given the evidence, over their variables in increasing
    /// node order.
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if `nodes` is not included in a joint target
    /// * `Error::IncompatibleEvidence` if the requisite evidence has a null probability
    pub fn joint_posterior(&mut self, nodes: &NodeSet) -> Result<&Potential> {
        let declared = self.joint_targets
                           .iter()
                           .filter(|t| nodes.is_subset(t))
                           .min_by_key(|t| t.len())
                           .cloned()
                           .ok_or_else(|| Error::UndefinedElement(format!("joint target {:?}", nodes)))?;

        if self.state != InferenceState::Done {
            self.make_inference()?;
        }

        if !self.joint_posteriors.contains_key(nodes) {
            let keep = self.variables_of(nodes)?;
            let joint = self.joint_posteriors
                            .get(&declared)
                            .ok_or_else(|| Error::UndefinedElement(format!("joint target {:?}", declared)))?;
            let marginal = joint.marginalize_keeping(&keep).reorganize(&keep)?;
            self.joint_posteriors.insert(nodes.clone(), marginal);
        }

        self.joint_posteriors
            .get(nodes)
            .ok_or_else(|| Error::UndefinedElement(format!("joint target {:?}", nodes)))
    }

    /// The table ```P(target | evs)``` over the variables of the relevant nodes of `evs`
    /// followed by the variable of `target`. The nodes of `evs` which are d-separated from
    /// `target` by the other nodes of `evs` are left out. The evidence of the engine is not
    /// taken into account.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if `target` belongs to `evs`
    /// * `Error::InvalidNode` if a node is not in the network
    pub fn evidence_impact(&self, target: NodeId, evs: &NodeSet) -> Result<Potential> {
        if evs.contains(&target) {
            return Err(Error::InvalidArgument(format!("node {} is both the target and evidence", target)));
        }
        let target_var = self.bn.variable(target)?.clone();
        let ev_vars = self.variables_of(evs)?;
        trace!("evidence impact of {:?} on {}", ev_vars, target_var);

        let relevant = bayes_ball(self.bn.dag(), &node_set(vec![target]), evs, &NodeSet::new())?.hard_evidence;

        let mut engine = JunctionTreeInference::with_config(self.bn, self.config);
        engine.erase_all_targets()?;
        if relevant.is_empty() {
            engine.add_target(target)?;
            return Ok(engine.posterior(target)?.clone());
        }

        let mut joint_nodes = relevant.clone();
        joint_nodes.insert(target);
        engine.add_joint_target(&joint_nodes)?;
        let joint = engine.joint_posterior(&joint_nodes)?;

        let mut order = self.variables_of(&relevant)?;
        order.push(target_var.clone());
        joint.divide(&joint.marginalize_out(&[target_var]))?.reorganize(&order)
    }

    fn variables_of<'b, I: IntoIterator<Item = &'b NodeId>>(&self, nodes: I) -> Result<Vec<Variable>> {
        nodes.into_iter().map(|&n| self.bn.variable(n).map(|v| v.clone())).collect()
    }

    /// Move back to `state` if the engine is ahead of it, dropping what `state` invalidates
    fn outdate(&mut self, state: InferenceState) {
        match state {
            InferenceState::OutdatedStructure => self.state = state,
            InferenceState::OutdatedPotentials if self.state == InferenceState::Done => self.state = state,
            _ => ()
        }

        if self.state != InferenceState::Done {
            self.messages.clear();
            self.posteriors.clear();
            self.joint_posteriors.clear();
        }
    }

    /// Build the junction tree of the moral graph without the hard evidence nodes, each joint
    /// target being completed into a clique first
    fn prepare_structure(&mut self) -> Result<()> {
        let hard = self.evidence.hard_nodes();

        let mut graph = self.bn.moral_graph();
        for &node in hard.iter() {
            graph.erase_node(node);
        }
        for target in self.joint_targets.iter() {
            let nodes: Vec<NodeId> = target.difference(&hard).cloned().collect();
            for (k, &a) in nodes.iter().enumerate() {
                for &b in nodes[k + 1..].iter() {
                    graph.add_edge(a, b)?;
                }
            }
        }

        self.junction_tree = CliqueGraph::new();
        self.node_to_clique.clear();
        self.joint_target_to_clique.clear();
        if graph.is_empty() {
            debug!("every node has hard evidence, empty junction tree");
            return Ok(());
        }

        let mut domain_sizes = BTreeMap::new();
        for node in graph.nodes() {
            domain_sizes.insert(node, self.bn.variable(node)?.domain_size());
        }

        self.triangulation.set_graph(&graph, &domain_sizes)?;
        self.junction_tree = self.triangulation.junction_tree()?.clone();
        self.node_to_clique = self.triangulation.node_to_clique()?.clone();

        for target in self.joint_targets.iter() {
            let key: NodeSet = target.difference(&hard).cloned().collect();
            if !key.is_empty() {
                let clique = self.triangulation.clique_containing(&key)?;
                self.joint_target_to_clique.insert(key, clique);
            }
        }

        debug!(
            "junction tree built: {} cliques, {} fill-ins, largest clique of log10 size {:.2}",
            self.junction_tree.size(),
            self.triangulation.fill_ins()?.len(),
            self.triangulation.max_log10_clique_domain_size()?
        );
        Ok(())
    }

    /// Assign the requisite CPTs and the relevant soft findings to the cliques
    fn collect_tables(&mut self) -> Result<()> {
        let hard = self.evidence.hard_nodes();
        let soft = self.evidence.soft_nodes();

        let mut query = self.targets.targets().clone();
        for target in self.joint_targets.iter() {
            query.extend(target.iter().cloned());
        }
        let requisites = bayes_ball(self.bn.dag(), &query, &hard, &soft)?;
        let hard_inst = self.evidence.hard_instantiation()?;

        self.clique_tables.clear();
        for &node in requisites.nodes.iter() {
            let table = self.bn.cpt(node)?.reduce(&hard_inst);
            if table.nb_dims() == 0 {
                continue;
            }

            let mut family: NodeSet = self.bn.parents(node)?.difference(&hard).cloned().collect();
            if !hard.contains(&node) {
                family.insert(node);
            }
            let clique = self.triangulation.clique_containing(&family)?;
            self.clique_tables.entry(clique).or_insert_with(Vec::new).push(table);
        }

        for &node in requisites.soft_evidence.iter() {
            let clique = *self.node_to_clique
                              .get(&node)
                              .ok_or_else(|| Error::NotFound(format!("clique of node {}", node)))?;
            if let Some(likelihood) = self.evidence.likelihood(node) {
                self.clique_tables.entry(clique).or_insert_with(Vec::new).push(likelihood.clone());
            }
        }

        trace!(
            "{} requisite CPTs and {} soft findings over {} cliques",
            requisites.nodes.len(), requisites.soft_evidence.len(), self.clique_tables.len()
        );
        Ok(())
    }

    /// The directed edges of the junction tree in an order where every message is sent after
    /// the messages it depends on: first towards the root of each connected component, then
    /// back to the leaves.
    fn message_order(&self) -> Result<Vec<(NodeId, NodeId)>> {
        let mut visited = NodeSet::new();
        let mut collect = Vec::new();
        let mut distribute = Vec::new();

        for root in self.junction_tree.nodes() {
            if visited.contains(&root) {
                continue;
            }

            let mut preorder: Vec<(NodeId, Option<NodeId>)> = Vec::new();
            let mut stack = vec![(root, None)];
            while let Some((clique, parent)) = stack.pop() {
                if !visited.insert(clique) {
                    continue;
                }
                preorder.push((clique, parent));
                for &n in self.junction_tree.neighbours(clique)?.iter() {
                    if !visited.contains(&n) {
                        stack.push((n, Some(clique)));
                    }
                }
            }

            collect.extend(preorder.iter().rev().filter_map(|&(c, p)| p.map(|p| (c, p))));
            distribute.extend(preorder.iter().filter_map(|&(c, p)| p.map(|p| (p, c))));
        }

        collect.extend(distribute);
        Ok(collect)
    }

    /// Plan every message into a schedule, execute it and keep the messages
    fn propagate(&mut self) -> Result<()> {
        let cp = MultiDimCombineAndProject::new(CombineOp::Mul, ProjectOp::Sum);
        let mut schedule = Schedule::new();

        let mut table_ids: BTreeMap<NodeId, Vec<MultiDimId>> = BTreeMap::new();
        for (&clique, tables) in self.clique_tables.iter() {
            let ids = tables.iter().map(|t| schedule.insert_table(t.clone(), true)).collect();
            table_ids.insert(clique, ids);
        }

        let mut message_ids: BTreeMap<(NodeId, NodeId), Vec<MultiDimId>> = BTreeMap::new();
        for (from, to) in self.message_order()? {
            let mut args: Vec<MultiDimId> = table_ids.get(&from).cloned().unwrap_or_default();
            for &k in self.junction_tree.neighbours(from)?.iter() {
                if k != to {
                    if let Some(ids) = message_ids.get(&(k, from)) {
                        args.extend(ids.iter().cloned());
                    }
                }
            }

            let ids = if args.is_empty() {
                Vec::new()
            } else {
                let separator = self.junction_tree.separator(from, to)?;
                let del_vars = self.variables_of(self.junction_tree.clique(from)?.difference(&separator))?;
                let ids = cp.schedule_combine_and_project(&mut schedule, &args, &del_vars)?;
                for &id in ids.iter() {
                    schedule.set_persistent(id, true)?;
                }
                ids
            };
            message_ids.insert((from, to), ids);
        }

        let (peak, _) = schedule.memory_usage()?;
        debug!(
            "junction tree propagation: {} operations, about {} elementary operations, peak memory {} entries",
            schedule.len(), schedule.nb_operations()?, peak
        );
        schedule.execute_all()?;

        self.messages.clear();
        for (edge, ids) in message_ids {
            let tables = ids.iter().map(|&id| schedule.potential(id).map(|p| p.clone())).collect::<Result<Vec<_>>>()?;
            self.messages.insert(edge, tables);
        }
        Ok(())
    }

    /// The unnormalized marginal of `keep` in `clique`, over the variables of `keep` in
    /// increasing node order
    fn clique_marginal(&self, clique: NodeId, keep: &NodeSet) -> Result<Potential> {
        let mut tables: Vec<&Potential> = self.clique_tables
                                              .get(&clique)
                                              .map(|ts| ts.iter().collect())
                                              .unwrap_or_default();
        for &k in self.junction_tree.neighbours(clique)?.iter() {
            if let Some(message) = self.messages.get(&(k, clique)) {
                tables.extend(message.iter());
            }
        }

        let keep_vars = self.variables_of(keep)?;
        let mut res = if tables.is_empty() {
            Potential::new()
        } else {
            let del_vars = self.variables_of(self.junction_tree.clique(clique)?.difference(keep))?;
            MultiDimCombineAndProject::new(CombineOp::Mul, ProjectOp::Sum).combine_and_project_to_table(&tables, &del_vars)?
        };

        // a variable no table mentions is uniform
        for v in keep_vars.iter() {
            if !res.contains(v) {
                res.add_variable(v)?;
            }
        }
        res.reorganize(&keep_vars)
    }

    fn compute_posterior(&self, node: NodeId) -> Result<Potential> {
        if let (true, Some(likelihood)) = (self.evidence.is_hard(node), self.evidence.likelihood(node)) {
            return Ok(likelihood.clone());
        }

        let clique = *self.node_to_clique
                          .get(&node)
                          .ok_or_else(|| Error::NotFound(format!("clique of node {}", node)))?;
        normalized(self.clique_marginal(clique, &node_set(vec![node]))?)
    }

    fn compute_joint_posterior(&self, nodes: &NodeSet) -> Result<Potential> {
        let hard = self.evidence.hard_nodes();
        let key: NodeSet = nodes.difference(&hard).cloned().collect();

        let mut res = if key.is_empty() {
            Potential::new()
        } else {
            let clique = *self.joint_target_to_clique
                              .get(&key)
                              .ok_or_else(|| Error::NotFound(format!("clique of joint target {:?}", key)))?;
            self.clique_marginal(clique, &key)?
        };

        for node in nodes.intersection(&hard) {
            if let Some(likelihood) = self.evidence.likelihood(*node) {
                res = res.product(likelihood);
            }
        }

        normalized(res)?.reorganize(&self.variables_of(nodes)?)
    }

    /// Compute the posterior of every target, spread over the workers
    fn compute_posteriors(&mut self) -> Result<()> {
        let targets: Vec<NodeId> = self.targets.targets().iter().cloned().collect();
        let this = &*self;
        let computed = ThreadExecutor::execute_collect(self.config.num_threads, |this_thread, num_threads, bucket| {
            for i in thread_range(this_thread, num_threads, targets.len()) {
                bucket.push((targets[i], this.compute_posterior(targets[i])?));
            }
            Ok(())
        })?;
        self.posteriors = computed.into_iter().collect();

        let mut joint_posteriors = BTreeMap::new();
        for nodes in self.joint_targets.iter() {
            joint_posteriors.insert(nodes.clone(), self.compute_joint_posterior(nodes)?);
        }
        self.joint_posteriors = joint_posteriors;
        Ok(())
    }
}


/// Normalize a posterior, a null table meaning the evidence is impossible
fn normalized(table: Potential) -> Result<Potential> {
    let total = table.sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(Error::IncompatibleEvidence(String::from("the evidence has a null probability")));
    }
    Ok(table.scale(1.0 / total))
}


impl<'a> BayesNetInference for JunctionTreeInference<'a> {

    fn bn(&self) -> &BayesNet {
        self.bn
    }

    fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    fn update_evidence(&mut self, update: &mut dyn FnMut(&mut Evidence) -> Result<EvidenceChange>) -> Result<()> {
        match update(&mut self.evidence)? {
            EvidenceChange::Unchanged => (),
            EvidenceChange::Values => self.outdate(InferenceState::OutdatedPotentials),
            EvidenceChange::Structure => self.outdate(InferenceState::OutdatedStructure)
        }
        Ok(())
    }

    fn make_inference(&mut self) -> Result<()> {
        if self.state == InferenceState::OutdatedStructure {
            self.prepare_structure()?;
            self.state = InferenceState::OutdatedPotentials;
        }

        if self.state == InferenceState::OutdatedPotentials {
            self.collect_tables()?;
            self.propagate()?;
            self.compute_posteriors()?;
            self.state = InferenceState::Done;
            debug!("inference done for {} targets and {} joint targets", self.posteriors.len(), self.joint_targets.len());
        }
        Ok(())
    }
}


impl<'a> MarginalTargetedInference for JunctionTreeInference<'a> {

    fn marginal_targets(&self) -> &MarginalTargets {
        &self.targets
    }

    fn update_targets(&mut self, update: &mut dyn FnMut(&mut MarginalTargets) -> Result<bool>) -> Result<()> {
        let before = self.targets.targets().clone();
        if !update(&mut self.targets)? {
            return Ok(());
        }

        let after = self.targets.targets();
        let added = after.difference(&before).next().is_some();
        let removed: Vec<NodeId> = before.difference(after).cloned().collect();
        for node in removed {
            self.posteriors.remove(&node);
        }

        // the requisite tables depend on the targets
        if added {
            self.outdate(InferenceState::OutdatedPotentials);
        }
        Ok(())
    }
}


impl<'a> PosteriorProvider for JunctionTreeInference<'a> {

    fn posterior(&mut self, node: NodeId) -> Result<&Potential> {
        if !self.targets.is_target(node) {
            return Err(Error::UndefinedElement(format!("node {} is not a target", node)));
        }

        if self.state != InferenceState::Done {
            self.make_inference()?;
        }

        self.posteriors
            .get(&node)
            .ok_or_else(|| Error::UndefinedElement(format!("posterior of node {}", node)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::init::Initialization;
    use crate::inference::tests::student;
    use crate::model::BayesNetBuilder;
    use crate::util::approx_eq;

    /// A -> B -> C with P(A) = [0.4, 0.6], P(B | A) = P(C | B) = [[0.9, 0.1], [0.2, 0.8]]
    fn chain() -> BayesNet {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let c = Variable::binary("C");
        let cpt = [0.9, 0.1, 0.2, 0.8];

        BayesNetBuilder::new()
            .with_variable(&a, &[], Initialization::Binomial(0.4))
            .with_variable(&b, &[a.clone()], Initialization::Table(
                Potential::from_values(vec![a.clone(), b.clone()], cpt.to_vec()).unwrap()
            ))
            .with_variable(&c, &[b.clone()], Initialization::Table(
                Potential::from_values(vec![b.clone(), c.clone()], cpt.to_vec()).unwrap()
            ))
            .build()
            .unwrap()
    }

    fn assert_values(expected: &[f64], p: &Potential) {
        assert_eq!(expected.len(), p.values().len());
        for (e, v) in expected.iter().zip(p.values()) {
            assert!(approx_eq(*e, *v), "expected {:?}, found {:?}", expected, p.values());
        }
    }

    #[test]
    fn independent_nodes() {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let bn = BayesNetBuilder::new()
            .with_variable(&a, &[], Initialization::Binomial(0.3))
            .with_variable(&b, &[], Initialization::Uniform)
            .build()
            .unwrap();

        let mut engine = JunctionTreeInference::new(&bn);
        assert_eq!(*bn.cpt(0).unwrap(), *engine.posterior(0).unwrap());

        engine.add_evidence(1, 1).unwrap();
        assert_eq!(*bn.cpt(0).unwrap(), *engine.posterior(0).unwrap());
        engine.add_likelihood(1, &[0.1, 0.6]).unwrap();
        assert_eq!(*bn.cpt(0).unwrap(), *engine.posterior(0).unwrap());
    }

    #[test]
    fn chain_posteriors() {
        let bn = chain();
        let mut engine = JunctionTreeInference::new(&bn);

        // P(B = 0) = 0.4 * 0.9 + 0.6 * 0.2
        assert_values(&[0.48, 0.52], engine.posterior(1).unwrap());
        // P(C = 0) = 0.48 * 0.9 + 0.52 * 0.2
        assert_values(&[0.536, 0.464], engine.posterior(2).unwrap());

        // P(A | C = 1) is proportional to [0.4 * 0.17, 0.6 * 0.66]
        engine.add_evidence(2, 1).unwrap();
        let z = 0.4 * 0.17 + 0.6 * 0.66;
        assert_values(&[0.4 * 0.17 / z, 0.6 * 0.66 / z], engine.posterior(0).unwrap());
    }

    #[test]
    fn evidence_impact() {
        let bn = chain();
        let engine = JunctionTreeInference::new(&bn);

        // sum over b of P(C | b) P(b | A)
        let impact = engine.evidence_impact(2, &node_set(vec![0])).unwrap();
        assert_eq!(bn.variable(0).unwrap(), &impact.variables()[0]);
        assert_values(&[0.83, 0.17, 0.34, 0.66], &impact);

        // A is d-separated from C by B
        let impact = engine.evidence_impact(2, &node_set(vec![0, 1])).unwrap();
        assert_eq!(2, impact.nb_dims());
        assert_values(&[0.9, 0.1, 0.2, 0.8], &impact);

        assert!(engine.evidence_impact(2, &node_set(vec![2])).is_err());
    }

    #[test]
    fn evidence_invalidation() {
        let bn = chain();
        let mut engine = JunctionTreeInference::new(&bn);

        let prior = engine.posterior(2).unwrap().clone();
        assert_eq!(InferenceState::Done, engine.state());

        engine.add_evidence(0, 0).unwrap();
        assert_eq!(InferenceState::OutdatedStructure, engine.state());
        assert_values(&[0.83, 0.17], engine.posterior(2).unwrap());

        // a new value for the same node keeps the junction tree
        engine.add_evidence(0, 1).unwrap();
        assert_eq!(InferenceState::OutdatedPotentials, engine.state());
        assert_values(&[0.34, 0.66], engine.posterior(2).unwrap());

        engine.erase_evidence(0).unwrap();
        assert_eq!(prior, *engine.posterior(2).unwrap());
    }

    #[test]
    fn targets() {
        let bn = chain();
        let mut engine = JunctionTreeInference::new(&bn);

        engine.add_target(2).unwrap();
        assert_eq!(1, engine.nb_targets());
        engine.posterior(2).unwrap();
        match engine.posterior(0) {
            Err(Error::UndefinedElement(_)) => (),
            other => panic!("unexpected {:?}", other)
        }

        engine.add_target(0).unwrap();
        assert_eq!(InferenceState::OutdatedPotentials, engine.state());
        assert_values(&[0.4, 0.6], engine.posterior(0).unwrap());

        engine.erase_target(2).unwrap();
        assert!(engine.posterior(2).is_err());
        assert!(engine.add_target(7).is_err());
    }

    #[test]
    fn joint_targets() {
        let bn = chain();
        let mut engine = JunctionTreeInference::new(&bn);
        let ac = node_set(vec![0, 2]);

        engine.add_joint_target(&ac).unwrap();
        assert_eq!(1, engine.joint_targets().len());
        assert_values(&[0.4 * 0.83, 0.4 * 0.17, 0.6 * 0.34, 0.6 * 0.66], engine.joint_posterior(&ac).unwrap());

        // a subset of a joint target is answered from it
        assert_values(&[0.536, 0.464], engine.joint_posterior(&node_set(vec![2])).unwrap());
        assert!(engine.joint_posterior(&node_set(vec![0, 1])).is_err());

        // a hard finding inside the joint target
        engine.add_evidence(0, 1).unwrap();
        assert_values(&[0.0, 0.0, 0.34, 0.66], engine.joint_posterior(&ac).unwrap());

        engine.erase_joint_target(&ac);
        assert!(engine.joint_targets().is_empty());
        assert!(engine.add_joint_target(&NodeSet::new()).is_err());
    }

    #[test]
    fn impossible_evidence() {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let bn = BayesNetBuilder::new()
            .with_variable(&a, &[], Initialization::Binomial(1.0))
            .with_variable(&b, &[a.clone()], Initialization::Table(
                Potential::from_values(vec![a.clone(), b.clone()], vec![1.0, 0.0, 0.5, 0.5]).unwrap()
            ))
            .build()
            .unwrap();

        let mut engine = JunctionTreeInference::new(&bn);
        engine.add_evidence(1, 1).unwrap();
        match engine.posterior(0) {
            Err(Error::IncompatibleEvidence(_)) => (),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn all_observed() {
        let bn = student();
        let mut engine = JunctionTreeInference::new(&bn);
        for node in 0..5 {
            engine.add_evidence(node, 1).unwrap();
        }
        assert!(engine.junction_tree().unwrap().size() == 0);
        assert_eq!(&[0.0, 1.0], engine.posterior(2).unwrap().values());
    }
}
