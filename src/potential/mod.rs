//! Definition of the potential module
//!
//! A `Potential` is a dense multidimensional table indexed by an ordered sequence of discrete
//! `Variable`s: CPTs, evidence likelihoods, messages and posteriors are all `Potential`s. The
//! order of the variables only drives the memory layout (the last variable varies fastest); two
//! potentials over the same set of variables compare equal whatever their internal orders.
//!
//! The algebra (combination and projection) lives in the `ops` submodule. Every operation returns
//! a freshly allocated `Potential` and leaves its operands untouched.

pub mod ops;

pub use self::ops::{CombineOp, ProjectOp};

use crate::instantiation::Instantiation;
use crate::util::{approx_eq, xlog2x, Error, Result};
use crate::variable::Variable;

use itertools::Itertools;
use ndarray::prelude as nd;
use ndarray::{Axis, IxDyn, Zip};

use std::fmt;

/// Alias f64 ndarray::Array as Table
pub type Table = nd::ArrayD<f64>;


#[derive(Clone, Debug)]
pub struct Potential {
    /// The variables indexing the table, in layout order
    vars: Vec<Variable>,

    /// The values, always kept in standard (row-major) layout
    table: Table
}


/// Bring a table back to row-major layout if an ndarray operation produced another one.
pub(crate) fn standardize(table: Table) -> Table {
    if table.is_standard_layout() {
        table
    } else {
        table.as_standard_layout().into_owned()
    }
}


fn check_distinct(vars: &[Variable]) -> Result<()> {
    for (i, v) in vars.iter().enumerate() {
        if vars[..i].contains(v) {
            return Err(Error::DuplicateElement(format!("variable {} in potential", v)));
        }
    }
    Ok(())
}


fn shape_of(vars: &[Variable]) -> Vec<usize> {
    vars.iter().map(|v| v.domain_size()).collect()
}


impl Potential {

    /// The 0-dimensional potential holding the single value `1.0`: the neutral element of the
    /// product.
    pub fn new() -> Self {
        Potential::scalar(1.0)
    }

    /// A 0-dimensional potential holding `value`
    pub fn scalar(value: f64) -> Self {
        Potential { vars: Vec::new(), table: Table::from_elem(IxDyn(&[]), value) }
    }

    /// Create a new `Potential` from an existing table.
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if a variable appears twice
    /// * `Error::SizeError` if the shape of the table does not match the domain sizes
    pub fn from_table(vars: Vec<Variable>, table: Table) -> Result<Self> {
        check_distinct(&vars)?;

        if vars.len() != table.ndim() {
            return Err(Error::SizeError(format!(
                "{} variables for a table with {} dimensions", vars.len(), table.ndim()
            )));
        }

        if shape_of(&vars).as_slice() != table.shape() {
            return Err(Error::SizeError(format!(
                "domain sizes {:?} do not match the table shape {:?}", shape_of(&vars), table.shape()
            )));
        }

        Ok(Potential { vars, table: standardize(table) })
    }

    /// Create a new `Potential` from values listed in lexicographic order of `vars` (the last
    /// variable varies fastest).
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if a variable appears twice
    /// * `Error::SizeError` if `values.len()` differs from the product of the domain sizes
    pub fn from_values(vars: Vec<Variable>, values: Vec<f64>) -> Result<Self> {
        check_distinct(&vars)?;
        let shape = shape_of(&vars);
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(Error::SizeError(format!("expected {} values, got {}", expected, values.len())));
        }

        let table = Table::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| Error::SizeError(e.to_string()))?;
        Ok(Potential { vars, table })
    }

    /// A `Potential` over `vars` with every value set to `value`
    pub fn filled(vars: Vec<Variable>, value: f64) -> Result<Self> {
        check_distinct(&vars)?;
        let table = Table::from_elem(IxDyn(&shape_of(&vars)), value);
        Ok(Potential { vars, table })
    }

    pub fn zeros(vars: Vec<Variable>) -> Result<Self> {
        Potential::filled(vars, 0.0)
    }

    /// The variables of the `Potential`, in layout order
    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    pub fn nb_dims(&self) -> usize {
        self.vars.len()
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.vars.contains(var)
    }

    pub fn pos(&self, var: &Variable) -> Option<usize> {
        self.vars.iter().position(|v| v == var)
    }

    /// The number of values of the table (the product of the domain sizes)
    pub fn domain_size(&self) -> usize {
        self.table.len()
    }

    /// The distance, in the value array, between two consecutive values of `var`
    pub fn stride(&self, var: &Variable) -> Option<usize> {
        self.pos(var).map(|i| self.vars[i + 1..].iter().map(|v| v.domain_size()).product())
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// The values in lexicographic order of the variables
    pub fn values(&self) -> &[f64] {
        self.table.as_slice().expect("potential tables are kept in standard layout")
    }

    /// The value at the linear offset `offset` of the table.
    ///
    /// # Errors
    /// * `Error::OutOfBounds` if `offset` is not below the domain size
    pub fn value_at_offset(&self, offset: usize) -> Result<f64> {
        self.values().get(offset).cloned().ok_or_else(|| Error::OutOfBounds {
            variable: format!("offset in table over ({})", self.vars.iter().join(", ")),
            value: offset,
            size: self.domain_size()
        })
    }

    /// The index of the value designated by `inst` in the table.
    fn index_of(&self, inst: &Instantiation) -> Result<Vec<usize>> {
        let idx: Vec<Option<usize>> = self.vars.iter().map(|v| inst.get(v)).collect();
        if idx.iter().any(|i| i.is_none()) {
            let missing = self.vars.iter()
                                   .filter(|v| !inst.contains(v))
                                   .map(|v| v.name().to_string())
                                   .collect();
            return Err(Error::IncompleteInstantiation(missing));
        }
        Ok(idx.into_iter().flatten().collect())
    }

    /// Retrieve the value for an instantiation of (at least) the variables of this `Potential`.
    ///
    /// # Errors
    /// * `Error::IncompleteInstantiation` if a variable of the `Potential` has no value
    pub fn get(&self, inst: &Instantiation) -> Result<f64> {
        let idx = self.index_of(inst)?;
        Ok(self.table[IxDyn(&idx)])
    }

    /// Set the value designated by `inst`.
    ///
    /// # Errors
    /// * `Error::IncompleteInstantiation` if a variable of the `Potential` has no value
    pub fn set(&mut self, inst: &Instantiation, value: f64) -> Result<()> {
        let idx = self.index_of(inst)?;
        self.table[IxDyn(&idx)] = value;
        Ok(())
    }

    /// Set every value to `value`
    pub fn fill(&mut self, value: f64) {
        self.table.fill(value);
    }

    /// Overwrite the values, listed in lexicographic order.
    ///
    /// # Errors
    /// * `Error::SizeError` if `values` does not have exactly `self.domain_size()` elements
    pub fn fill_with(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.domain_size() {
            return Err(Error::SizeError(format!(
                "expected {} values, got {}", self.domain_size(), values.len()
            )));
        }
        for (dst, src) in self.table.iter_mut().zip(values.iter()) {
            *dst = *src;
        }
        Ok(())
    }

    /// Add a dimension to the table. The existing values are replicated along the new
    /// dimension.
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if the variable already indexes the `Potential`
    pub fn add_variable(&mut self, var: &Variable) -> Result<()> {
        if self.contains(var) {
            return Err(Error::DuplicateElement(format!("variable {} in potential", var)));
        }

        let mut shape = shape_of(&self.vars);
        shape.push(var.domain_size());

        let table = {
            let view = self.table.view().insert_axis(Axis(self.vars.len()));
            view.broadcast(IxDyn(&shape))
                .map(|b| b.to_owned())
                .ok_or_else(|| Error::SizeError(format!("cannot extend table to {:?}", shape)))?
        };

        self.vars.push(var.clone());
        self.table = standardize(table);
        Ok(())
    }

    /// Remove a dimension from the table, keeping the slice where `var` takes its first value.
    ///
    /// # Errors
    /// * `Error::NotFound` if the variable does not index the `Potential`
    pub fn erase_variable(&mut self, var: &Variable) -> Result<()> {
        let i = self.pos(var).ok_or_else(|| Error::NotFound(format!("variable {} in potential", var)))?;
        let table = self.table.index_axis(Axis(i), 0).to_owned();
        self.vars.remove(i);
        self.table = standardize(table);
        Ok(())
    }

    /// A copy of this `Potential` whose layout follows `order`.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if `order` is not a permutation of the variables
    pub fn reorganize(&self, order: &[Variable]) -> Result<Potential> {
        if order.len() != self.vars.len() {
            return Err(Error::InvalidArgument(String::from("reorganize needs a permutation of the variables")));
        }

        let mut perm = Vec::with_capacity(order.len());
        for v in order.iter() {
            match self.pos(v) {
                Some(i) if !perm.contains(&i) => perm.push(i),
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "{} does not belong to the permutation of the variables", v
                    )))
                }
            }
        }

        let table = self.table.view().permuted_axes(perm).as_standard_layout().into_owned();
        Ok(Potential { vars: order.to_vec(), table })
    }

    /// Reduce the `Potential` to the given partial instantiation: every variable with a value in
    /// `inst` is fixed to that value and dropped from the result.
    ///
    /// Defined in Koller & Friedman 4.2.3
    pub fn reduce(&self, inst: &Instantiation) -> Potential {
        let mut fixed: Vec<(usize, usize)> = self.vars.iter()
                                                       .enumerate()
                                                       .filter_map(|(i, v)| inst.get(v).map(|x| (i, x)))
                                                       .collect();
        if fixed.is_empty() {
            return self.clone();
        }

        // remove the highest axes first so the remaining indices stay valid
        fixed.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut view = self.table.view();
        for &(axis, val) in fixed.iter() {
            view = view.index_axis_move(Axis(axis), val);
        }

        let vars = self.vars.iter().filter(|v| !inst.contains(v)).cloned().collect();
        Potential { vars, table: standardize(view.to_owned()) }
    }

    pub fn sum(&self) -> f64 {
        self.table.sum()
    }

    pub fn max(&self) -> f64 {
        self.table.iter().cloned().fold(std::f64::NEG_INFINITY, f64::max)
    }

    pub fn min(&self) -> f64 {
        self.table.iter().cloned().fold(std::f64::INFINITY, f64::min)
    }

    /// A copy of this `Potential` whose values sum to one. A table summing to zero is returned
    /// unchanged.
    pub fn normalize(&self) -> Potential {
        let mut res = self.clone();
        res.normalize_in_place();
        res
    }

    pub fn normalize_in_place(&mut self) {
        let z = self.sum();
        if z != 0.0 && z.is_finite() {
            self.table.mapv_inplace(|x| x / z);
        }
    }

    /// A copy of this `Potential` normalized as a CPT of `var`: for every instantiation of the
    /// other variables, the values over `var` sum to one. Configurations summing to zero are left
    /// unchanged.
    ///
    /// # Errors
    /// * `Error::NotFound` if `var` does not index the `Potential`
    pub fn normalize_as_cpt(&self, var: &Variable) -> Result<Potential> {
        let i = self.pos(var).ok_or_else(|| Error::NotFound(format!("variable {} in potential", var)))?;
        let mut res = self.clone();
        for mut lane in res.table.lanes_mut(Axis(i)) {
            let z: f64 = lane.sum();
            if z != 0.0 && z.is_finite() {
                lane.mapv_inplace(|x| x / z);
            }
        }
        Ok(res)
    }

    /// Check whether the `Potential` is a conditional probability table of `var`: values are
    /// non-negative and sum to one over `var` for every configuration of the other variables.
    pub fn is_cpt(&self, var: &Variable) -> bool {
        match self.pos(var) {
            None => false,
            Some(i) => {
                self.table.iter().all(|&x| x >= 0.0)
                    && self.table.lanes(Axis(i)).into_iter().all(|lane| approx_eq(lane.sum(), 1.0))
            }
        }
    }

    /// Shannon entropy in bits, `H = -sum p log2 p`, of the normalized table (with `0 log 0 = 0`).
    pub fn entropy(&self) -> f64 {
        let p = self.normalize();
        -p.table.iter().map(|&x| xlog2x(x)).sum::<f64>()
    }

    /// The instantiations reaching the maximal value, and that value
    pub fn argmax(&self) -> (Vec<Instantiation>, f64) {
        let m = self.max();
        (self.instantiations_where(|x| x == m), m)
    }

    /// The instantiations reaching the minimal value, and that value
    pub fn argmin(&self) -> (Vec<Instantiation>, f64) {
        let m = self.min();
        (self.instantiations_where(|x| x == m), m)
    }

    fn instantiations_where<F: Fn(f64) -> bool>(&self, pred: F) -> Vec<Instantiation> {
        self.table.indexed_iter()
                  .filter(|(_, &x)| pred(x))
                  .map(|(idx, _)| {
                      let vals = (0..self.vars.len()).map(|k| idx[k]).collect();
                      Instantiation::from_parts(self.vars.clone(), vals)
                  })
                  .collect()
    }

    /// Check that both potentials range over the same set of variables
    pub fn same_variables(&self, other: &Potential) -> bool {
        self.vars.len() == other.vars.len() && self.vars.iter().all(|v| other.contains(v))
    }
}


impl Default for Potential {
    fn default() -> Self {
        Potential::new()
    }
}


/// Two potentials are equal when they range over the same set of variables and their values
/// differ by at most `EQUALITY_TOLERANCE` for every instantiation.
impl PartialEq for Potential {
    fn eq(&self, other: &Potential) -> bool {
        if !self.same_variables(other) {
            return false;
        }

        match other.reorganize(&self.vars) {
            Ok(aligned) => Zip::from(&self.table).and(&aligned.table).all(|&x, &y| approx_eq(x, y)),
            Err(_) => false
        }
    }
}


impl fmt::Display for Potential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let header = self.vars.iter().map(|v| v.name()).join(" ");
        writeln!(f, "[{}]", header)?;
        for inst in crate::instantiation::all_instantiations(&self.vars) {
            let idx: Vec<usize> = (0..inst.len()).map(|k| inst.val_at(k)).collect();
            writeln!(f, "{} :: {:.6}", inst, self.table[IxDyn(&idx)])?;
        }
        Ok(())
    }
}
