//! Defines an `Estimator`, which is used to estimate the parameters of a `BayesNet` from a
//! database of complete instantiations.

use crate::instantiation::Instantiation;
use crate::util::{Error, Result};

mod mle;
pub use self::mle::{LocalMLEstimator, ParameterEstimator};


/// A trait that represents the ability to estimate the parameters of some model (be it a whole
/// `BayesNet` or just a local CPT).
pub trait Estimator<'a, T> {

    /// Estimate the value of the parameters from the given dataset
    fn estimate(&mut self, dataset: impl Iterator<Item = &'a Instantiation>) -> Result<T>;

}


/// Prior knowledge added to the counts before they are normalized
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Apriori {
    /// Plain counts. A parent configuration never observed has no estimate.
    None,

    /// Add the given weight to every count (Laplace smoothing for a weight of 1)
    Smoothing(f64)
}


impl Default for Apriori {
    fn default() -> Self {
        Apriori::None
    }
}


impl Apriori {

    /// # Errors
    /// * `Error::NonPositiveApriori` for a smoothing weight which is not strictly positive
    pub fn check(self) -> Result<Self> {
        match self {
            Apriori::Smoothing(w) if !(w > 0.0) => Err(Error::NonPositiveApriori(w)),
            _ => Ok(self)
        }
    }

    /// The pseudo-count added to every configuration
    pub fn weight(self) -> f64 {
        match self {
            Apriori::None => 0.0,
            Apriori::Smoothing(w) => w
        }
    }
}
