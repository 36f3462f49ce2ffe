//! Defines the interface to inference engines
//!
//! An engine answers posterior queries ```P(X | e)``` over a `BayesNet`. It is stateful: it
//! tracks the evidence `e` and the targets whose posteriors it must compute, and caches the
//! posteriors until the evidence or the targets change. Each capability is a trait implemented by
//! the engines over a small required surface (an accessor and a hook called after each change),
//! the bookkeeping itself living in `Evidence` and `MarginalTargets`.

pub mod dsep;
pub mod evidence;
pub mod junction_tree;
pub mod targets;
pub mod variable_elimination;

pub use self::evidence::{Evidence, EvidenceChange};
pub use self::junction_tree::{InferenceState, JunctionTreeInference};
pub use self::targets::MarginalTargets;
pub use self::variable_elimination::VariableElimination;

use crate::graph::NodeSet;
use crate::model::BayesNet;
use crate::potential::Potential;
use crate::triangulation::TriangulationConfig;
use crate::util::{NodeId, Result};


/// The settings shared by the inference engines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InferenceConfig {
    /// The heuristic used to build junction trees and elimination orders
    pub triangulation: TriangulationConfig,

    /// The number of workers computing the target posteriors
    pub num_threads: usize
}


impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig { triangulation: TriangulationConfig::default(), num_threads: 1 }
    }
}


impl InferenceConfig {

    pub fn with_triangulation(mut self, triangulation: TriangulationConfig) -> Self {
        self.triangulation = triangulation;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }
}


/// An engine conditioning a `BayesNet` on evidence.
pub trait BayesNetInference {

    fn bn(&self) -> &BayesNet;

    fn evidence(&self) -> &Evidence;

    /// Apply `update` to the evidence and react to what it changed.
    fn update_evidence(&mut self, update: &mut dyn FnMut(&mut Evidence) -> Result<EvidenceChange>) -> Result<()>;

    /// Perform the inference for the current evidence and targets
    fn make_inference(&mut self) -> Result<()>;

    /// Clamp `node` to the value `val`.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if `node` is not in the network
    /// * `Error::OutOfBounds` if `val` is not a value of the variable of `node`
    fn add_evidence(&mut self, node: NodeId, val: usize) -> Result<()> {
        let var = self.bn().variable(node)?.clone();
        self.update_evidence(&mut |ev| ev.add_hard(node, &var, val))
    }

    /// Clamp `node` to the value labelled `label`
    fn add_evidence_by_label(&mut self, node: NodeId, label: &str) -> Result<()> {
        let val = self.bn().variable(node)?.index(label)?;
        self.add_evidence(node, val)
    }

    /// Set a likelihood on the values of `node`. A likelihood with a single non-zero entry is
    /// hard evidence.
    ///
    /// # Errors
    /// * `Error::InvalidNode` if `node` is not in the network
    /// * `Error::IncompatibleEvidence` if the likelihood is null
    fn add_likelihood(&mut self, node: NodeId, likelihood: &[f64]) -> Result<()> {
        let var = self.bn().variable(node)?.clone();
        self.update_evidence(&mut |ev| ev.add_likelihood(node, &var, likelihood))
    }

    /// Remove the evidence on `node`. Removing missing evidence does nothing.
    fn erase_evidence(&mut self, node: NodeId) -> Result<()> {
        self.update_evidence(&mut |ev| Ok(ev.erase(node)))
    }

    fn erase_all_evidence(&mut self) -> Result<()> {
        self.update_evidence(&mut |ev| Ok(ev.erase_all()))
    }

    fn has_evidence(&self, node: NodeId) -> bool {
        self.evidence().contains(node)
    }

    fn nb_evidence(&self) -> usize {
        self.evidence().len()
    }
}


/// An engine computing the posteriors of a set of target nodes.
///
/// Every node is a target by default. Querying the posterior of a node which is not a target is
/// an error.
pub trait MarginalTargetedInference {

    fn marginal_targets(&self) -> &MarginalTargets;

    /// Apply `update` to the targets and react to what it changed.
    fn update_targets(&mut self, update: &mut dyn FnMut(&mut MarginalTargets) -> Result<bool>) -> Result<()>;

    /// # Errors
    /// * `Error::InvalidNode` if `node` is not in the network
    fn add_target(&mut self, node: NodeId) -> Result<()> {
        self.update_targets(&mut |t| t.add_target(node))
    }

    /// Removing a node which is not a target does nothing
    fn erase_target(&mut self, node: NodeId) -> Result<()> {
        self.update_targets(&mut |t| Ok(t.erase_target(node)))
    }

    fn add_all_targets(&mut self) -> Result<()> {
        self.update_targets(&mut |t| Ok(t.add_all_targets()))
    }

    fn erase_all_targets(&mut self) -> Result<()> {
        self.update_targets(&mut |t| Ok(t.erase_all_targets()))
    }

    fn is_target(&self, node: NodeId) -> bool {
        self.marginal_targets().is_target(node)
    }

    fn nb_targets(&self) -> usize {
        self.marginal_targets().nb_targets()
    }

    fn targets(&self) -> NodeSet {
        self.marginal_targets().targets().clone()
    }
}


/// An engine answering ```P(X | e)``` for single nodes.
pub trait PosteriorProvider {

    /// The posterior of `node` given the evidence, computed if needed.
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if `node` is not a target
    /// * `Error::IncompatibleEvidence` if the requisite evidence has a null probability. Findings
    ///   d-separated from `node`, and observed roots that only condition their children, are not
    ///   checked.
    fn posterior(&mut self, node: NodeId) -> Result<&Potential>;

    /// The Shannon entropy (in bits) of the posterior of `node`
    fn entropy(&mut self, node: NodeId) -> Result<f64> {
        Ok(self.posterior(node)?.entropy())
    }
}
