//! Defines a simple forward sampler for `BayesNet`s
//!
//! Implementation of Koller & Friedman Algorithm 12.1 (pp 489)

use crate::instantiation::Instantiation;
use crate::model::BayesNet;
use crate::samplers::{IndependentSampler, Sampler};
use crate::util::{Error, NodeId, Result};

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// A simple, stateless `Sampler` for `BayesNet`s
pub struct ForwardSampler<'a> {

    /// The `BayesNet` to sample
    bn: &'a BayesNet,

    /// The nodes, parents first
    order: Vec<NodeId>
}


impl<'a> ForwardSampler<'a> {

    pub fn new(bn: &'a BayesNet) -> Self {
        ForwardSampler { bn, order: bn.topological_order() }
    }

    /// Draw a sample using the random generator `rng`
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Instantiation> {
        let mut a = Instantiation::new();

        for &node in self.order.iter() {
            let var = self.bn.variable(node)?;

            // we iterate in topological order, so every parent already has a value and the
            // reduced CPT only ranges over the variable itself
            let distribution = self.bn.cpt(node)?.reduce(&a);
            let weights = WeightedIndex::new(distribution.values())
                .map_err(|e| Error::InvalidArgument(format!("cannot sample {}: {}", var, e)))?;

            a.set(var, weights.sample(rng))?;
        }

        Ok(a)
    }
}


impl<'a> Sampler for ForwardSampler<'a> {

    fn sample(&mut self) -> Result<Instantiation> {
        self.sample_with(&mut rand::thread_rng())
    }

}


impl<'a> IndependentSampler for ForwardSampler<'a> {

    fn ind_sample(&self) -> Result<Instantiation> {
        self.sample_with(&mut rand::thread_rng())
    }

}
