//! Module containing initialization routines for the parameters of a model.

use crate::potential::{Potential, Table};
use crate::util::{Error, Result};
use crate::variable::Variable;

use ndarray::IxDyn;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// Defines possible ways to initialize a `Variable`s CPT.
#[derive(Clone, Debug)]
pub enum Initialization<'a> {
    /// A uniform distribution over the values of the `Variable`, for every parent configuration
    Uniform,

    /// Randomly initialize the weights of the CPT.
    Random,

    /// Initialize the CPT as a Binomial distribution with parameter ```p```.
    /// Note that this `Initialization` is valid only to a binary `Variable` with no parents.
    Binomial(f64),

    /// Initialize the CPT as a Multinomial distribution with parameters ```p_0, p_1...```.
    /// Note that this `Initialization` is valid only to a `Variable` with no parents.
    Multinomial(&'a [f64]),

    /// User defined CPT
    Table(Potential)
}


impl<'a> Initialization<'a> {

    /// Construct a CPT, initialized based on ```self```
    ///
    /// # Args
    /// * `var`: the `Variable` the CPT is defined for
    /// * `parents`: the conditioning `Variable`s
    ///
    /// # Returns
    /// a `Potential` over ```parents..., var``` (the child variable comes last)
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if the initialization does not apply to this variable
    /// * `Error::NotACpt` if a user table is not normalized over `var`
    pub fn build_cpt(self, var: &Variable, parents: &[Variable]) -> Result<Potential> {
        let mut vars = parents.to_vec();
        vars.push(var.clone());

        ///////////////////////////////////////////////////////////////////////////////
        // Trivial cases

        // if this is a user defined table, it just needs to be verified and reordered
        if let Initialization::Table(p) = self {
            if !p.is_cpt(var) {
                return Err(Error::NotACpt(var.name().to_string()));
            }
            if !(p.nb_dims() == vars.len() && vars.iter().all(|v| p.contains(v))) {
                return Err(Error::InvalidArgument(format!(
                    "the table given for {} does not range over the variable and its parents", var
                )));
            }
            return p.reorganize(&vars);
        }

        ///////////////////////////////////////////////////////////////////////////////
        // Check for errors
        match self {
            Initialization::Binomial(_) | Initialization::Multinomial(_) if !parents.is_empty() => {
                return Err(Error::InvalidArgument(format!(
                    "a binomial/multinomial initialization needs a root variable, {} has parents", var
                )));
            },

            // A binomial distribution on a non-binary variable
            Initialization::Binomial(_) if var.domain_size() != 2 => {
                return Err(Error::InvalidArgument(format!("{} is not binary", var)));
            },

            // A multinomial distribution with an incorrect number of parameters
            Initialization::Multinomial(ps) if ps.len() != var.domain_size() => {
                return Err(Error::InvalidArgument(format!(
                    "{} parameters for variable {} of domain size {}", ps.len(), var, var.domain_size()
                )));
            },

            _ => ()
        }

        ///////////////////////////////////////////////////////////////////////////////
        // now, build the CPT
        let shape: Vec<usize> = vars.iter().map(|v| v.domain_size()).collect();

        let cpt = match self {
            Initialization::Uniform => {
                // normalizing constant is just the domain size of the child
                Potential::filled(vars, 1. / (var.domain_size() as f64))?
            },
            Initialization::Random => {
                let tbl = Table::random(IxDyn(&shape), Uniform::new(1.0, 100.0));
                Potential::from_table(vars, tbl)?.normalize_as_cpt(var)?
            },
            Initialization::Binomial(p) => {
                Potential::from_values(vars, vec![p, 1.0 - p])?
            },
            Initialization::Multinomial(ps) => {
                Potential::from_values(vars, ps.to_vec())?
            },
            Initialization::Table(_) => unreachable!()
        };

        if !cpt.is_cpt(var) {
            return Err(Error::NotACpt(var.name().to_string()));
        }

        Ok(cpt)
    }
}
