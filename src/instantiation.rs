//! Definition of the instantiation module
//!
//! An `Instantiation` maps an ordered set of `Variable`s to value indices. It doubles as a cursor
//! over the joint value space of its variables: incrementing it walks the space in lexicographic
//! order of the declared variable order (the last variable moves fastest), which is the order in
//! which a `Potential` lays out its values.

use crate::potential::Potential;
use crate::util::{Error, Result};
use crate::variable::Variable;

use itertools::Itertools;

use std::fmt;


#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instantiation {
    /// The variables, in their declared order
    vars: Vec<Variable>,

    /// The current value of each variable
    vals: Vec<usize>,

    /// `true` once an increment wrapped around the whole value space
    overflow: bool
}


impl Instantiation {

    /// Construct an empty `Instantiation`
    pub fn new() -> Self {
        Instantiation::default()
    }

    /// Construct an `Instantiation` over the given variables, each set to its first value.
    /// Duplicated variables are only kept once.
    pub fn from_vars(vars: &[Variable]) -> Self {
        let vars: Vec<Variable> = vars.iter().cloned().unique().collect();
        let vals = vec![0; vars.len()];
        Instantiation { vars, vals, overflow: false }
    }

    /// Build an `Instantiation` from matching variables and values, without validation.
    pub(crate) fn from_parts(vars: Vec<Variable>, vals: Vec<usize>) -> Self {
        Instantiation { vars, vals, overflow: false }
    }

    /// Add a variable, set to its first value.
    ///
    /// # Errors
    /// * `Error::DuplicateElement` if the variable is already present
    pub fn add(&mut self, var: &Variable) -> Result<()> {
        if self.contains(var) {
            return Err(Error::DuplicateElement(format!("variable {} in instantiation", var)));
        }
        self.vars.push(var.clone());
        self.vals.push(0);
        Ok(())
    }

    /// Remove a variable. Returns `false` if it was not present.
    pub fn erase(&mut self, var: &Variable) -> bool {
        match self.pos(var) {
            Some(i) => {
                self.vars.remove(i);
                self.vals.remove(i);
                true
            },
            None => false
        }
    }

    /// Set the value of `var`, adding the variable if it is not yet present.
    ///
    /// # Errors
    /// * `Error::OutOfBounds` if `val` is not in the domain of `var`
    pub fn set(&mut self, var: &Variable, val: usize) -> Result<()> {
        var.check_value(val)?;
        match self.pos(var) {
            Some(i) => self.vals[i] = val,
            None => {
                self.vars.push(var.clone());
                self.vals.push(val);
            }
        }
        Ok(())
    }

    /// The value of `var`, if present
    pub fn get(&self, var: &Variable) -> Option<usize> {
        self.pos(var).map(|i| self.vals[i])
    }

    /// The value of `var`.
    ///
    /// # Errors
    /// * `Error::NotFound` if the variable is not part of the `Instantiation`
    pub fn val(&self, var: &Variable) -> Result<usize> {
        self.get(var).ok_or_else(|| Error::NotFound(format!("variable {} in instantiation", var)))
    }

    /// The value at position `i` of the declared order
    pub fn val_at(&self, i: usize) -> usize {
        self.vals[i]
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.pos(var).is_some()
    }

    /// The position of `var` in the declared order
    pub fn pos(&self, var: &Variable) -> Option<usize> {
        self.vars.iter().position(|v| v == var)
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The number of joint values of the variables
    pub fn domain_size(&self) -> usize {
        self.vars.iter().map(|v| v.domain_size()).product()
    }

    /// `true` once the cursor has run past the last joint value
    pub fn end(&self) -> bool {
        self.overflow
    }

    /// Move to the first joint value
    pub fn set_first(&mut self) {
        self.overflow = false;
        for v in self.vals.iter_mut() {
            *v = 0;
        }
    }

    /// Move to the last joint value
    pub fn set_last(&mut self) {
        self.overflow = false;
        for (v, var) in self.vals.iter_mut().zip(self.vars.iter()) {
            *v = var.domain_size() - 1;
        }
    }

    /// Move to the next joint value in lexicographic order
    pub fn inc(&mut self) {
        self.inc_masked(|_| true);
    }

    /// Move to the previous joint value in lexicographic order
    pub fn dec(&mut self) {
        self.dec_masked(|_| true);
    }

    /// Increment only the variables that also belong to `reference`
    pub fn inc_in(&mut self, reference: &Instantiation) {
        let mask: Vec<bool> = self.vars.iter().map(|v| reference.contains(v)).collect();
        self.inc_masked(|i| mask[i]);
    }

    /// Increment only the variables that do not belong to `reference`
    pub fn inc_out(&mut self, reference: &Instantiation) {
        let mask: Vec<bool> = self.vars.iter().map(|v| !reference.contains(v)).collect();
        self.inc_masked(|i| mask[i]);
    }

    /// Reset to their first value the variables that also belong to `reference`
    pub fn set_first_in(&mut self, reference: &Instantiation) {
        self.overflow = false;
        for i in 0..self.vars.len() {
            if reference.contains(&self.vars[i]) {
                self.vals[i] = 0;
            }
        }
    }

    /// Reset to their first value the variables that do not belong to `reference`
    pub fn set_first_out(&mut self, reference: &Instantiation) {
        self.overflow = false;
        for i in 0..self.vars.len() {
            if !reference.contains(&self.vars[i]) {
                self.vals[i] = 0;
            }
        }
    }

    /// Increment a single variable, wrapping around its domain. Wrapping sets the overflow flag.
    ///
    /// # Errors
    /// * `Error::NotFound` if the variable is not part of the `Instantiation`
    pub fn inc_var(&mut self, var: &Variable) -> Result<()> {
        let i = self.pos(var).ok_or_else(|| Error::NotFound(format!("variable {} in instantiation", var)))?;
        self.inc_masked(|j| j == i);
        Ok(())
    }

    /// Copy the values of the variables shared with `other`. Returns the number of values
    /// copied.
    pub fn set_vals(&mut self, other: &Instantiation) -> usize {
        let mut copied = 0;
        for i in 0..self.vars.len() {
            if let Some(v) = other.get(&self.vars[i]) {
                self.vals[i] = v;
                copied += 1;
            }
        }
        copied
    }

    /// Reorder the variables: those listed in `order` come first, in that order, followed by the
    /// remaining ones in their current relative order. Values are preserved.
    pub fn reorder(&mut self, order: &[Variable]) {
        let mut vars = Vec::with_capacity(self.vars.len());
        let mut vals = Vec::with_capacity(self.vars.len());

        for v in order.iter() {
            if let Some(i) = self.pos(v) {
                if !vars.contains(v) {
                    vars.push(v.clone());
                    vals.push(self.vals[i]);
                }
            }
        }

        for (v, &x) in self.vars.iter().zip(self.vals.iter()) {
            if !vars.contains(v) {
                vars.push(v.clone());
                vals.push(x);
            }
        }

        self.vars = vars;
        self.vals = vals;
    }

    /// The restriction of this `Instantiation` to the given variables (those absent are skipped)
    pub fn restricted(&self, vars: &[Variable]) -> Instantiation {
        let mut res = Instantiation::new();
        for v in vars.iter() {
            if let Some(x) = self.get(v) {
                res.vars.push(v.clone());
                res.vals.push(x);
            }
        }
        res
    }

    /// Bind the `Instantiation` to a table so that each increment updates the table offset
    /// incrementally instead of recomputing it.
    ///
    /// The binding borrows the `Instantiation` mutably, so it cannot be bound to a second table
    /// until the first binding is dropped.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if the variables of the `Instantiation` and of the table are not
    ///   the same set
    pub fn bind<'a>(&'a mut self, table: &'a Potential) -> Result<BoundInstantiation<'a>> {
        if self.vars.len() != table.nb_dims() || self.vars.iter().any(|v| !table.contains(v)) {
            return Err(Error::InvalidArgument(String::from(
                "an instantiation can only be bound to a table over the same variables"
            )));
        }

        let strides: Vec<usize> = self.vars.iter()
                                           .map(|v| table.stride(v).unwrap_or(0))
                                           .collect();
        let offset = strides.iter().zip(self.vals.iter()).map(|(s, x)| s * x).sum();

        Ok(BoundInstantiation { inst: self, table, strides, offset })
    }

    fn inc_masked<F: Fn(usize) -> bool>(&mut self, mask: F) {
        for i in (0..self.vars.len()).rev() {
            if !mask(i) {
                continue;
            }
            if self.vals[i] + 1 < self.vars[i].domain_size() {
                self.vals[i] += 1;
                return;
            }
            self.vals[i] = 0;
        }
        self.overflow = true;
    }

    fn dec_masked<F: Fn(usize) -> bool>(&mut self, mask: F) {
        for i in (0..self.vars.len()).rev() {
            if !mask(i) {
                continue;
            }
            if self.vals[i] > 0 {
                self.vals[i] -= 1;
                return;
            }
            self.vals[i] = self.vars[i].domain_size() - 1;
        }
        self.overflow = true;
    }
}


impl fmt::Display for Instantiation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let body = self.vars.iter()
                            .zip(self.vals.iter())
                            .map(|(v, &x)| format!("{}:{}", v, v.label(x).unwrap_or("?")))
                            .join("|");
        write!(f, "<{}>", body)
    }
}


/// An `Instantiation` bound to a table. Increments keep the linear offset of the table up to
/// date in O(1) amortized time.
pub struct BoundInstantiation<'a> {
    inst: &'a mut Instantiation,
    table: &'a Potential,

    /// the stride, in the table, of each variable of the instantiation
    strides: Vec<usize>,
    offset: usize
}


impl<'a> BoundInstantiation<'a> {

    pub fn instantiation(&self) -> &Instantiation {
        self.inst
    }

    /// The linear offset of the current joint value in the table
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The table value at the current joint value.
    ///
    /// # Errors
    /// * `Error::OutOfBounds` if the offset falls outside the table
    pub fn value(&self) -> Result<f64> {
        self.table.value_at_offset(self.offset)
    }

    pub fn end(&self) -> bool {
        self.inst.overflow
    }

    pub fn set_first(&mut self) {
        self.inst.set_first();
        self.offset = 0;
    }

    /// Set the value of a variable of the instantiation.
    ///
    /// # Errors
    /// * `Error::NotFound` if the variable is not bound
    /// * `Error::OutOfBounds` if the value is not in its domain
    pub fn set(&mut self, var: &Variable, val: usize) -> Result<()> {
        let i = self.inst.pos(var).ok_or_else(|| Error::NotFound(format!("variable {} in instantiation", var)))?;
        var.check_value(val)?;
        self.offset = self.offset + val * self.strides[i] - self.inst.vals[i] * self.strides[i];
        self.inst.vals[i] = val;
        Ok(())
    }

    pub fn inc(&mut self) {
        for i in (0..self.inst.vars.len()).rev() {
            let d = self.inst.vars[i].domain_size();
            if self.inst.vals[i] + 1 < d {
                self.inst.vals[i] += 1;
                self.offset += self.strides[i];
                return;
            }
            self.inst.vals[i] = 0;
            self.offset -= (d - 1) * self.strides[i];
        }
        self.inst.overflow = true;
    }
}


/// Iterate over every joint value of the given variables, in lexicographic order.
pub fn all_instantiations(vars: &[Variable]) -> AllInstantiations {
    AllInstantiations { current: Instantiation::from_vars(vars), done: false }
}

pub struct AllInstantiations {
    current: Instantiation,
    done: bool
}

impl Iterator for AllInstantiations {
    type Item = Instantiation;

    fn next(&mut self) -> Option<Instantiation> {
        if self.done {
            return None;
        }

        let res = self.current.clone();
        self.current.inc();
        if self.current.end() {
            self.done = true;
        }

        Some(res)
    }
}
