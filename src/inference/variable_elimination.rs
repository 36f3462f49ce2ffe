//! Defines an inference engine that answers each query by variable elimination.
//!
//! Nothing is compiled ahead of the queries: each posterior is computed from the requisite CPTs
//! of its query, reduced by the hard evidence, and the relevant soft findings. The variables
//! outside the query are eliminated one at a time, in the order given by the triangulation of
//! the interaction graph of these tables.
//!
//! Implementation of Koller & Friedman Algorithm 9.1 - Sum-Product-VE

use crate::combination::{MultiDimCombination, MultiDimCombineAndProject};
use crate::graph::{node_set, NodeSet, UndiGraph};
use crate::inference::dsep::bayes_ball;
use crate::inference::{
    BayesNetInference, Evidence, EvidenceChange, InferenceConfig, MarginalTargetedInference, MarginalTargets,
    PosteriorProvider
};
use crate::model::BayesNet;
use crate::potential::{CombineOp, Potential, ProjectOp};
use crate::triangulation::Triangulation;
use crate::util::{Error, NodeId, Result};
use crate::variable::Variable;

use log::{debug, trace};

use std::collections::BTreeMap;


pub struct VariableElimination<'a> {
    bn: &'a BayesNet,

    config: InferenceConfig,

    targets: MarginalTargets,

    evidence: Evidence,

    /// The posteriors computed since the last change of the evidence
    posteriors: BTreeMap<NodeId, Potential>
}


impl<'a> VariableElimination<'a> {

    pub fn new(bn: &'a BayesNet) -> Self {
        VariableElimination::with_config(bn, InferenceConfig::default())
    }

    pub fn with_config(bn: &'a BayesNet, config: InferenceConfig) -> Self {
        VariableElimination {
            bn,
            config,
            targets: MarginalTargets::new(bn.node_set()),
            evidence: Evidence::new(),
            posteriors: BTreeMap::new()
        }
    }

    /// The probability of the evidence, ```1``` without evidence. Soft findings are weighted
    /// by their likelihood.
    pub fn evidence_probability(&self) -> Result<f64> {
        Ok(self.unnormalized_joint(&NodeSet::new())?.sum())
    }

    /// The posterior of the nodes `nodes`, over their variables in increasing node order.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if `nodes` is empty
    /// * `Error::InvalidNode` if a node is not in the network
    /// * `Error::IncompatibleEvidence` if the requisite evidence has a null probability
    pub fn joint_posterior(&self, nodes: &NodeSet) -> Result<Potential> {
        if nodes.is_empty() {
            return Err(Error::InvalidArgument(String::from("empty joint query")));
        }
        let order = self.variables_of(nodes)?;
        normalized(self.unnormalized_joint(nodes)?)?.reorganize(&order)
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
        self.variables_of(evs)?;

        let relevant = bayes_ball(self.bn.dag(), &node_set(vec![target]), evs, &NodeSet::new())?.hard_evidence;
        let engine = VariableElimination::with_config(self.bn, self.config);

        let mut joint_nodes = relevant.clone();
        joint_nodes.insert(target);
        let joint = engine.joint_posterior(&joint_nodes)?;

        let mut order = self.variables_of(&relevant)?;
        order.push(target_var.clone());
        joint.divide(&joint.marginalize_out(&[target_var]))?.reorganize(&order)
    }

    fn variables_of<'b, I: IntoIterator<Item = &'b NodeId>>(&self, nodes: I) -> Result<Vec<Variable>> {
        nodes.into_iter().map(|&n| self.bn.variable(n).map(|v| v.clone())).collect()
    }

    /// The tables needed to answer a query on `query`: the requisite CPTs reduced by the hard
    /// evidence outside the query, and the likelihoods of the relevant findings. The hard
    /// findings on query nodes are kept as likelihoods.
    fn requisite_tables(&self, query: &NodeSet) -> Result<Vec<Potential>> {
        let hard: NodeSet = self.evidence.hard_nodes().difference(query).cloned().collect();
        let soft: NodeSet = self.evidence.nodes().difference(&hard).cloned().collect();

        let (cpts, findings) = if query.is_empty() {
            // every finding matters to the probability of the evidence
            let observed = self.evidence.nodes();
            (self.bn.dag().ancestors(&observed), soft)
        } else {
            let requisites = bayes_ball(self.bn.dag(), query, &hard, &soft)?;
            (requisites.nodes, requisites.soft_evidence)
        };

        let mut hard_inst = self.evidence.hard_instantiation()?;
        for &node in query.iter().filter(|n| self.evidence.is_hard(**n)) {
            hard_inst.erase(self.bn.variable(node)?);
        }

        let mut tables = Vec::with_capacity(cpts.len() + findings.len());
        // fully observed CPTs become constants, kept for the probability of the evidence
        for &node in cpts.iter() {
            tables.push(self.bn.cpt(node)?.reduce(&hard_inst));
        }
        for &node in findings.iter() {
            if let Some(likelihood) = self.evidence.likelihood(node) {
                tables.push(likelihood.clone());
            }
        }

        trace!("query {:?}: {} requisite CPTs, {} findings", query, cpts.len(), findings.len());
        Ok(tables)
    }

    /// The order in which the variables of `tables` outside `query` are eliminated
    fn elimination_order(&self, tables: &[Potential], query: &NodeSet) -> Result<Vec<Variable>> {
        let mut graph = UndiGraph::new();
        let mut domain_sizes = BTreeMap::new();
        for table in tables.iter() {
            let mut nodes = Vec::with_capacity(table.nb_dims());
            for var in table.variables() {
                let node = self.bn.node_id(var)?;
                if !graph.exists_node(node) {
                    graph.add_node_with_id(node)?;
                    domain_sizes.insert(node, var.domain_size());
                }
                nodes.push(node);
            }
            for (k, &a) in nodes.iter().enumerate() {
                for &b in nodes[k + 1..].iter() {
                    graph.add_edge(a, b)?;
                }
            }
        }

        if graph.is_empty() {
            return Ok(Vec::new());
        }

        let mut triangulation = Triangulation::with_config(self.config.triangulation);
        triangulation.set_graph(&graph, &domain_sizes)?;
        let order: Vec<NodeId> = triangulation.elimination_order()?
                                              .iter()
                                              .filter(|n| !query.contains(*n))
                                              .cloned()
                                              .collect();
        self.variables_of(&order)
    }

    /// The product of the requisite tables of `query` with every other variable summed out
    fn unnormalized_joint(&self, query: &NodeSet) -> Result<Potential> {
        let mut phis = self.requisite_tables(query)?;
        let order = self.elimination_order(&phis, query)?;
        debug!("eliminating {} variables from {} tables", order.len(), phis.len());

        let eliminate = MultiDimCombineAndProject::new(CombineOp::Mul, ProjectOp::Sum);
        for var in order.iter() {
            let (phi_1prime, phi_2prime): (Vec<Potential>, Vec<Potential>) = phis.into_iter()
                                                                                 .partition(|f| f.contains(var));
            phis = phi_2prime;
            if phi_1prime.is_empty() {
                continue;
            }

            // product step then sum step
            let group: Vec<&Potential> = phi_1prime.iter().collect();
            let tau = eliminate.combine_and_project_to_table(&group, &[var.clone()])?;
            phis.push(tau);
        }

        // multiply together the remaining phis
        let mut phi_star = match phis.len() {
            0 => Potential::new(),
            1 => phis.remove(0),
            _ => MultiDimCombination::new(CombineOp::Mul).combine(&phis.iter().collect::<Vec<_>>())?
        };

        // query variables no table mentions are uniform
        for var in self.variables_of(query)?.iter() {
            if !phi_star.contains(var) {
                phi_star.add_variable(var)?;
            }
        }
        Ok(phi_star)
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


impl<'a> BayesNetInference for VariableElimination<'a> {

    fn bn(&self) -> &BayesNet {
        self.bn
    }

    fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    fn update_evidence(&mut self, update: &mut dyn FnMut(&mut Evidence) -> Result<EvidenceChange>) -> Result<()> {
        if update(&mut self.evidence)? != EvidenceChange::Unchanged {
            self.posteriors.clear();
        }
        Ok(())
    }

    /// Compute the posterior of every target which is not cached yet
    fn make_inference(&mut self) -> Result<()> {
        let missing: Vec<NodeId> = self.targets
                                       .targets()
                                       .iter()
                                       .filter(|n| !self.posteriors.contains_key(*n))
                                       .cloned()
                                       .collect();
        for node in missing {
            let posterior = self.joint_posterior(&node_set(vec![node]))?;
            self.posteriors.insert(node, posterior);
        }
        Ok(())
    }
}


impl<'a> MarginalTargetedInference for VariableElimination<'a> {

    fn marginal_targets(&self) -> &MarginalTargets {
        &self.targets
    }

    fn update_targets(&mut self, update: &mut dyn FnMut(&mut MarginalTargets) -> Result<bool>) -> Result<()> {
        if update(&mut self.targets)? {
            let targets = &self.targets;
            self.posteriors.retain(|n, _| targets.is_target(*n));
        }
        Ok(())
    }
}


impl<'a> PosteriorProvider for VariableElimination<'a> {

    fn posterior(&mut self, node: NodeId) -> Result<&Potential> {
        if !self.targets.is_target(node) {
            return Err(Error::UndefinedElement(format!("node {} is not a target", node)));
        }

        if !self.posteriors.contains_key(&node) {
            let posterior = self.joint_posterior(&node_set(vec![node]))?;
            self.posteriors.insert(node, posterior);
        }

        self.posteriors
            .get(&node)
            .ok_or_else(|| Error::UndefinedElement(format!("posterior of node {}", node)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::inference::tests::student;
    use crate::util::approx_eq;

    #[test]
    fn evidence_probability() {
        let bn = student();
        let mut engine = VariableElimination::new(&bn);
        assert!(approx_eq(1.0, engine.evidence_probability().unwrap()));

        // P(D = 0) = 0.6
        engine.add_evidence(0, 0).unwrap();
        assert!(approx_eq(0.6, engine.evidence_probability().unwrap()));

        // P(D = 0, S = 1) = 0.6 * (0.7 * 0.05 + 0.3 * 0.8)
        engine.add_evidence(3, 1).unwrap();
        assert!(approx_eq(0.6 * (0.7 * 0.05 + 0.3 * 0.8), engine.evidence_probability().unwrap()));

        // a soft finding weighs the probability
        engine.erase_all_evidence().unwrap();
        engine.add_likelihood(0, &[0.5, 1.0]).unwrap();
        assert!(approx_eq(0.6 * 0.5 + 0.4, engine.evidence_probability().unwrap()));
    }

    #[test]
    fn joint_matches_brute_force() {
        let bn = student();
        let mut engine = VariableElimination::new(&bn);
        engine.add_evidence(4, 0).unwrap();

        let nodes = node_set(vec![1, 3]);
        let joint = engine.joint_posterior(&nodes).unwrap();
        assert_eq!(bn.variable(1).unwrap(), &joint.variables()[0]);

        let l = bn.variable(4).unwrap().clone();
        let full = bn.joint_distribution();
        let mut inst = crate::instantiation::Instantiation::new();
        inst.add(&l).unwrap();
        inst.set(&l, 0).unwrap();
        let expected = full.reduce(&inst)
                           .marginalize_keeping(&joint.variables().to_vec())
                           .normalize()
                           .reorganize(joint.variables())
                           .unwrap();
        assert_eq!(expected, joint);
    }

    #[test]
    fn targets_and_cache() {
        let bn = student();
        let mut engine = VariableElimination::new(&bn);

        engine.erase_all_targets().unwrap();
        assert!(engine.posterior(1).is_err());

        engine.add_target(1).unwrap();
        let prior = engine.posterior(1).unwrap().clone();
        assert!(approx_eq(0.3, prior.values()[1]));

        // S = 1 makes intelligence more likely
        engine.add_evidence(3, 1).unwrap();
        assert!(engine.posterior(1).unwrap().values()[1] > 0.3);

        engine.erase_evidence(3).unwrap();
        assert_eq!(prior, *engine.posterior(1).unwrap());
    }

    #[test]
    fn evidence_impact() {
        let bn = student();
        let engine = VariableElimination::new(&bn);

        // L only depends on I through G
        let impact = engine.evidence_impact(4, &node_set(vec![1, 2])).unwrap();
        assert_eq!(2, impact.nb_dims());
        assert_eq!(*bn.cpt(4).unwrap(), impact);
    }
}
