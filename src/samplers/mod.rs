//! Defines the `Sampler` trait - an object that can randomly sample from a `BayesNet`.

use crate::instantiation::Instantiation;
use crate::util::Result;

pub mod forward;

pub use self::forward::ForwardSampler;

pub trait Sampler {

    /// Sample a complete instantiation of the associated network.
    fn sample(&mut self) -> Result<Instantiation>;

    /// Draw a database of `n` samples
    fn sample_n(&mut self, n: usize) -> Result<Vec<Instantiation>> {
        (0..n).map(|_| self.sample()).collect()
    }

}


pub trait IndependentSampler {

    /// Sample a complete instantiation of the associated network, without updating any state.
    fn ind_sample(&self) -> Result<Instantiation>;

}
