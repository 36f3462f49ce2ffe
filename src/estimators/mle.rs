/// Defines `Estimator`s that use Maximum Likelihood Estimation to estimate the value of parameters
/// given a dataset.

use crate::estimators::{Apriori, Estimator};
use crate::instantiation::Instantiation;
use crate::model::BayesNet;
use crate::potential::Potential;
use crate::util::{Error, NodeId, Result};
use crate::variable::Variable;

use log::debug;

/// Defines the `LocalMLEstimator`, a Maximum Likelihood `Estimator` for the Conditional Probability
/// Table of a single variable in a Bayesian framework.
///
/// Implementation of the MLE Parameter Estimation scheme for conditional probability distributions
/// described in Koller & Friedman Section 17.2
#[derive(Clone, Debug)]
pub struct LocalMLEstimator {

    /// The estimated variable, last of the scope of the counts
    var: Variable,

    /// The counts of each configuration of ```parents..., var```
    counts: Potential,

    apriori: Apriori

}


impl LocalMLEstimator {

    /// Construct an ML estimator for the given CPT, whose child variable is `var`
    ///
    /// # Errors
    /// * `Error::NotACpt` if `cpt` is not a CPT of `var`
    /// * `Error::NonPositiveApriori` for a smoothing weight which is not strictly positive
    pub fn new(var: &Variable, cpt: &Potential, apriori: Apriori) -> Result<Self> {
        if !cpt.is_cpt(var) {
            return Err(Error::NotACpt(var.name().to_string()));
        }

        let mut scope: Vec<Variable> = cpt.variables().iter().filter(|v| *v != var).cloned().collect();
        scope.push(var.clone());

        Ok(LocalMLEstimator { var: var.clone(), counts: Potential::zeros(scope)?, apriori: apriori.check()? })
    }

    pub fn variable(&self) -> &Variable {
        &self.var
    }
}


impl<'a> Estimator<'a, Potential> for LocalMLEstimator {

    fn estimate(&mut self, dataset: impl Iterator<Item = &'a Instantiation>) -> Result<Potential> {
        // each call to estimate must be independent, so first let's reset the counts
        self.counts.fill(self.apriori.weight());

        // count the number of instances of each configuration
        for sample in dataset {
            let ct = self.counts.get(sample)?;
            self.counts.set(sample, ct + 1.0)?;
        }

        // now, we estimate each parameter by using the sufficient statistics (see K&F Eq. 17.5):
        //                  M[u, x]     <-- each value in the table
        //      theta x|u = -------
        //                   M[u]       <-- the counts with the child summed out
        let m_u = self.counts.marginalize_out(&[self.var.clone()]);
        if m_u.values().iter().any(|&ct| ct == 0.0) {
            return Err(Error::ZeroCounts(self.var.name().to_string()));
        }

        self.counts.divide(&m_u)?.reorganize(self.counts.variables())
    }
}


/// A Maximum Likelihood estimator for a `BayesNet`
///
/// Based on the decomposability of the likelihood function, each CPT can be estimated separately
/// and therefore the `ParameterEstimator` is really just a 'bag-o-`LocalMLEstimator`s'. The
/// estimated network has the structure and the node names of the original one.
pub struct ParameterEstimator<'a> {

    /// The network for which to estimate the parameters
    bn: &'a BayesNet,

    /// The `Estimator` for each node
    estimators: Vec<(NodeId, LocalMLEstimator)>

}


impl<'a> ParameterEstimator<'a> {

    /// # Errors
    /// * `Error::NonPositiveApriori` for a smoothing weight which is not strictly positive
    pub fn new(bn: &'a BayesNet, apriori: Apriori) -> Result<Self> {
        let mut estimators = Vec::with_capacity(bn.size());
        for node in bn.topological_order() {
            let estimator = LocalMLEstimator::new(bn.variable(node)?, bn.cpt(node)?, apriori)?;
            estimators.push((node, estimator));
        }

        Ok(ParameterEstimator { bn, estimators })
    }
}


impl<'a, 'b> Estimator<'b, BayesNet> for ParameterEstimator<'a> {

    fn estimate(&mut self, dataset: impl Iterator<Item = &'b Instantiation>) -> Result<BayesNet> {
        let data: Vec<&Instantiation> = dataset.collect();

        let mut bn = self.bn.clone();
        for (node, estimator) in self.estimators.iter_mut() {
            let cpt = estimator.estimate(data.iter().cloned())?;
            bn.set_cpt(*node, cpt)?;
        }

        debug!("estimated {} CPTs from {} samples", self.estimators.len(), data.len());
        Ok(bn)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::init::Initialization;
    use crate::instantiation::all_instantiations;
    use crate::model::BayesNetBuilder;
    use crate::util::approx_eq;

    use std::iter::repeat;

    fn sample(vars: &[(&Variable, usize)]) -> Instantiation {
        let mut a = Instantiation::new();
        for (var, val) in vars {
            a.set(var, *val).unwrap();
        }
        a
    }

    fn assert_values(expected: &[f64], actual: &[f64]) {
        assert!(expected.iter().zip(actual).all(|(e, a)| approx_eq(*e, *a)), "{:?} != {:?}", expected, actual);
    }

    #[test]
    /// Test MLE of a single, binary variable (a weighted coin)
    fn coin_toss() {
        let c = Variable::binary("C");
        let f = Potential::from_values(vec![c.clone()], vec![0.5, 0.5]).unwrap();

        let zeros = repeat(sample(&[(&c, 0)])).take(30);
        let ones = repeat(sample(&[(&c, 1)])).take(70);
        let dataset: Vec<Instantiation> = zeros.chain(ones).collect();

        let mut estimator = LocalMLEstimator::new(&c, &f, Apriori::None).unwrap();
        let cpt = estimator.estimate(dataset.iter()).unwrap();
        assert_values(&[0.3, 0.7], cpt.values());

        // each call is independent of the previous ones
        let cpt = estimator.estimate(dataset.iter()).unwrap();
        assert_values(&[0.3, 0.7], cpt.values());
    }

    #[test]
    /// Test X (multinomial) -> Y (binomial) factor
    ///
    /// CPT:
    ///    | y0 | y1
    /// ---+----+----
    /// x0 | .8 | .2
    /// ---+---------
    /// x1 | .5 | .5
    /// ---+----+----
    /// x2 | .3 | .7
    fn one_parent() {
        let x = Variable::discrete("X", 3);
        let y = Variable::binary("Y");
        let f = Potential::from_values(vec![x.clone(), y.clone()], vec![0.1, 0.9, 0.1, 0.9, 0.1, 0.9]).unwrap();

        let dataset: Vec<Instantiation> = repeat(sample(&[(&x, 0), (&y, 0)])).take(80)
            .chain(repeat(sample(&[(&x, 0), (&y, 1)])).take(20))
            .chain(repeat(sample(&[(&x, 1), (&y, 0)])).take(500))
            .chain(repeat(sample(&[(&x, 1), (&y, 1)])).take(500))
            .chain(repeat(sample(&[(&y, 0), (&x, 2)])).take(3))
            .chain(repeat(sample(&[(&y, 1), (&x, 2)])).take(7))
            .collect();

        let mut estimator = LocalMLEstimator::new(&y, &f, Apriori::None).unwrap();
        let cpt = estimator.estimate(dataset.iter()).unwrap();
        assert!(cpt.is_cpt(&y));

        let actual: Vec<f64> = all_instantiations(&[x, y]).map(|a| cpt.get(&a).unwrap()).collect();
        assert_values(&[0.8, 0.2, 0.5, 0.5, 0.3, 0.7], &actual);
    }

    #[test]
    fn unobserved_parent_configuration() {
        let x = Variable::binary("X");
        let y = Variable::binary("Y");
        let f = Potential::filled(vec![x.clone(), y.clone()], 0.5).unwrap();
        let dataset = vec![sample(&[(&x, 0), (&y, 1)]), sample(&[(&x, 0), (&y, 0)])];

        let mut estimator = LocalMLEstimator::new(&y, &f, Apriori::None).unwrap();
        assert_eq!(Err(Error::ZeroCounts(String::from("Y"))), estimator.estimate(dataset.iter()));

        // with a pseudo-count of 1: x0 -> (1 + 1) / 4 each, x1 -> uniform
        let mut estimator = LocalMLEstimator::new(&y, &f, Apriori::Smoothing(1.0)).unwrap();
        assert_values(&[0.5, 0.5, 0.5, 0.5], estimator.estimate(dataset.iter()).unwrap().values());

        assert_eq!(Err(Error::NonPositiveApriori(0.0)), LocalMLEstimator::new(&y, &f, Apriori::Smoothing(0.0)).map(|_| ()));
        assert!(LocalMLEstimator::new(&x, &Potential::filled(vec![x.clone()], 0.3).unwrap(), Apriori::None).is_err());
    }

    #[test]
    fn incomplete_sample() {
        let x = Variable::binary("X");
        let y = Variable::binary("Y");
        let f = Potential::filled(vec![x.clone(), y.clone()], 0.5).unwrap();
        let dataset = vec![sample(&[(&y, 1)])];

        let mut estimator = LocalMLEstimator::new(&y, &f, Apriori::None).unwrap();
        assert_eq!(Err(Error::IncompleteInstantiation(vec![String::from("X")])), estimator.estimate(dataset.iter()));
    }

    #[test]
    /// Test X (binomial) -> Y (binomial) model
    ///
    /// Assuming 1000 samples of P(X) = [.3, .7], P(Y | x0) = [.8, .2], P(Y | x1) = [.5, .5]:
    ///     x0: 300
    ///         y0: 300 * .8 = 240
    ///         y1: 300 * .2 = 60
    ///     x1: 700
    ///         y0: 700 * .5 = 350
    ///         y1: 700 * .5 = 350
    fn one_parent_model() {
        let x = Variable::binary("X");
        let y = Variable::binary("Y");

        let bn = BayesNetBuilder::new()
            .with_named_variable(&x, "X", &[], Initialization::Binomial(0.5))
            .with_named_variable(&y, "Y", &[x.clone()], Initialization::Uniform)
            .build()
            .unwrap();

        let dataset: Vec<Instantiation> = repeat(sample(&[(&x, 0), (&y, 0)])).take(240)
            .chain(repeat(sample(&[(&x, 0), (&y, 1)])).take(60))
            .chain(repeat(sample(&[(&x, 1), (&y, 0)])).take(350))
            .chain(repeat(sample(&[(&x, 1), (&y, 1)])).take(350))
            .collect();

        let mut estimator = ParameterEstimator::new(&bn, Apriori::None).unwrap();
        let learned = estimator.estimate(dataset.iter()).unwrap();

        assert_eq!(vec![0, 1], learned.topological_order());
        assert_eq!("X", learned.name(0).unwrap());
        assert_eq!("Y", learned.name(1).unwrap());

        let actual: Vec<f64> = all_instantiations(&[x, y]).map(|a| learned.probability(&a).unwrap()).collect();
        assert_values(&[0.3 * 0.8, 0.3 * 0.2, 0.7 * 0.5, 0.7 * 0.5], &actual);
    }
}
