//! Combination and projection of potentials
//!
//! Combining two potentials produces a table over the union of their variables, where each entry
//! applies a binary operator to the matching entries of the operands. Projecting a potential
//! removes a set of variables by folding them with a reduction operator.

use crate::potential::{Potential, Table};
use crate::util::{Error, Result};
use crate::variable::Variable;

use ndarray::prelude as nd;
use ndarray::{Axis, IxDyn, Zip};

use std::ops::{Add, Div, Mul, Sub};


/// The binary operators a combination can apply entry-wise
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombineOp {
    Add,
    Sub,
    Mul,
    Div
}


/// The reductions a projection can apply over the removed variables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectOp {
    Sum,
    Product,
    Max,
    Min
}


impl CombineOp {

    /// Apply the operator. Division follows the usual convention for probability tables:
    /// `0 / 0 = 0`.
    pub fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            CombineOp::Add => x + y,
            CombineOp::Sub => x - y,
            CombineOp::Mul => x * y,
            CombineOp::Div => {
                if x == 0.0 && y == 0.0 {
                    0.0
                } else {
                    x / y
                }
            }
        }
    }
}


impl ProjectOp {

    /// The value of the reduction over an empty set
    pub fn neutral(self) -> f64 {
        match self {
            ProjectOp::Sum => 0.0,
            ProjectOp::Product => 1.0,
            ProjectOp::Max => std::f64::NEG_INFINITY,
            ProjectOp::Min => std::f64::INFINITY
        }
    }

    pub fn apply(self, acc: f64, x: f64) -> f64 {
        match self {
            ProjectOp::Sum => acc + x,
            ProjectOp::Product => acc * x,
            ProjectOp::Max => acc.max(x),
            ProjectOp::Min => acc.min(x)
        }
    }
}


impl Potential {

    /// The variables of `self` followed by the variables of `other` not already in `self`
    pub fn union_vars(&self, other: &Potential) -> Vec<Variable> {
        let mut vars = self.vars.clone();
        vars.extend(other.vars.iter().filter(|v| !self.contains(v)).cloned());
        vars
    }

    /// A view of the table whose axes follow `vars`: the axes of the table are permuted and
    /// length-1 axes are inserted for the variables of `vars` the `Potential` does not contain.
    /// `vars` must be a superset of the variables of the `Potential`.
    fn aligned_view(&self, vars: &[Variable]) -> nd::ArrayViewD<'_, f64> {
        let mut order: Vec<usize> = (0..self.vars.len()).collect();
        order.sort_by_key(|&i| vars.iter().position(|v| *v == self.vars[i]));

        let mut view = self.table.view().permuted_axes(order);
        for (k, v) in vars.iter().enumerate() {
            if !self.contains(v) {
                view = view.insert_axis(Axis(k));
            }
        }
        view
    }

    /// Apply `f` entry-wise over the union of the variables of both potentials.
    fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Potential, f: F) -> Potential {
        let vars = self.union_vars(other);
        let shape: Vec<usize> = vars.iter().map(|v| v.domain_size()).collect();

        let lhs = self.aligned_view(&vars);
        let rhs = other.aligned_view(&vars);
        let lhs = lhs.broadcast(IxDyn(&shape)).expect("aligned table broadcasts to the union shape");
        let rhs = rhs.broadcast(IxDyn(&shape)).expect("aligned table broadcasts to the union shape");

        let mut table = Table::zeros(IxDyn(&shape));
        Zip::from(&mut table)
            .and(&lhs)
            .and(&rhs)
            .for_each(|out, &x, &y| *out = f(x, y));

        Potential { vars, table }
    }

    /// Combine two potentials entry-wise with `op`.
    ///
    /// # Errors
    /// * `Error::DivideByZero` for a division with a non-zero numerator over a zero denominator
    pub fn combine(&self, other: &Potential, op: CombineOp) -> Result<Potential> {
        match op {
            CombineOp::Div => self.divide(other),
            _ => Ok(self.zip_with(other, |x, y| op.apply(x, y)))
        }
    }

    /// Calculate the product of two potentials
    ///
    /// Defined in Koller & Friedman 4.2.1
    pub fn product(&self, other: &Potential) -> Potential {
        self.zip_with(other, |x, y| x * y)
    }

    pub fn sum_with(&self, other: &Potential) -> Potential {
        self.zip_with(other, |x, y| x + y)
    }

    pub fn difference(&self, other: &Potential) -> Potential {
        self.zip_with(other, |x, y| x - y)
    }

    /// Divide two potentials, with the convention `0 / 0 = 0`.
    ///
    /// Defined in Koller & Friedman 10.3.1
    ///
    /// # Errors
    /// * `Error::DivideByZero` for a non-zero numerator over a zero denominator
    pub fn divide(&self, other: &Potential) -> Result<Potential> {
        let res = self.zip_with(other, |x, y| CombineOp::Div.apply(x, y));
        if res.table.iter().any(|x| x.is_infinite()) {
            return Err(Error::DivideByZero);
        }
        Ok(res)
    }

    /// Remove `del_vars` from the potential by folding each of them with `op`. Variables that do
    /// not index the potential are ignored, so projecting nothing returns a copy.
    pub fn project(&self, del_vars: &[Variable], op: ProjectOp) -> Potential {
        let mut axes: Vec<usize> = del_vars.iter().filter_map(|v| self.pos(v)).collect();
        if axes.is_empty() {
            return self.clone();
        }

        axes.sort_unstable_by(|a, b| b.cmp(a));
        axes.dedup();

        let mut table = self.table.clone();
        for axis in axes {
            table = table.fold_axis(Axis(axis), op.neutral(), |acc, x| op.apply(*acc, *x));
        }

        let vars = self.vars.iter().filter(|v| !del_vars.contains(v)).cloned().collect();
        Potential { vars, table: super::standardize(table) }
    }

    /// Sum out the given variables
    ///
    /// Defined in Koller & Friedman 9.3.1
    pub fn marginalize_out(&self, del_vars: &[Variable]) -> Potential {
        self.project(del_vars, ProjectOp::Sum)
    }

    /// Sum out every variable but `keep`
    pub fn marginalize_keeping(&self, keep: &[Variable]) -> Potential {
        let del: Vec<Variable> = self.vars.iter().filter(|v| !keep.contains(v)).cloned().collect();
        self.project(&del, ProjectOp::Sum)
    }

    /// Maximize out the given variables
    pub fn max_out(&self, del_vars: &[Variable]) -> Potential {
        self.project(del_vars, ProjectOp::Max)
    }

    pub fn min_out(&self, del_vars: &[Variable]) -> Potential {
        self.project(del_vars, ProjectOp::Min)
    }

    /// Multiply every entry by a constant
    pub fn scale(&self, k: f64) -> Potential {
        let mut res = self.clone();
        res.table.mapv_inplace(|x| x * k);
        res
    }
}


impl<'a> Mul<&'a Potential> for &'a Potential {
    type Output = Potential;

    fn mul(self, rhs: &'a Potential) -> Potential {
        self.product(rhs)
    }
}


impl<'a> Add<&'a Potential> for &'a Potential {
    type Output = Potential;

    fn add(self, rhs: &'a Potential) -> Potential {
        self.sum_with(rhs)
    }
}


impl<'a> Sub<&'a Potential> for &'a Potential {
    type Output = Potential;

    fn sub(self, rhs: &'a Potential) -> Potential {
        self.difference(rhs)
    }
}


impl<'a> Div<&'a Potential> for &'a Potential {
    type Output = Result<Potential>;

    fn div(self, rhs: &'a Potential) -> Result<Potential> {
        self.divide(rhs)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::instantiation::Instantiation;

    #[test]
    /// Example taken from Koller & Friedman Figure 4.3
    fn product_simple() {
        let a = Variable::discrete("A", 3);
        let b = Variable::binary("B");
        let c = Variable::binary("C");

        let phi1 = Potential::from_values(vec![a.clone(), b.clone()], vec![0.5, 0.8, 0.1, 0., 0.3, 0.9]).unwrap();
        let phi2 = Potential::from_values(vec![b.clone(), c.clone()], vec![0.5, 0.7, 0.1, 0.2]).unwrap();

        let expected = Potential::from_values(
            vec![a.clone(), b.clone(), c.clone()],
            vec![0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0., 0., 0.15, 0.21, 0.09, 0.18]
        ).unwrap();

        let psi = phi1.product(&phi2);
        assert_eq!(&[a.clone(), b.clone(), c.clone()], psi.variables());
        assert_eq!(expected, psi);
        assert_eq!(expected, &phi2 * &phi1);
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 10.7
    fn divide_simple() {
        let a = Variable::discrete("A", 3);
        let b = Variable::binary("B");

        let phi1 = Potential::from_values(vec![a.clone(), b.clone()], vec![0.5, 0.2, 0., 0., 0.3, 0.45]).unwrap();
        let phi2 = Potential::from_values(vec![a.clone()], vec![0.8, 0., 0.6]).unwrap();

        let expected = Potential::from_values(vec![a.clone(), b.clone()], vec![0.625, 0.25, 0., 0., 0.5, 0.75]).unwrap();
        assert_eq!(expected, phi1.divide(&phi2).unwrap());
    }

    #[test]
    fn divide_by_zero() {
        let a = Variable::binary("A");
        let num = Potential::from_values(vec![a.clone()], vec![1., 0.]).unwrap();
        let den = Potential::from_values(vec![a.clone()], vec![0., 0.]).unwrap();

        assert_eq!(Err(Error::DivideByZero), num.divide(&den));
        assert_eq!(Err(Error::DivideByZero), num.combine(&den, CombineOp::Div));
    }

    #[test]
    fn add_and_sub() {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let pa = Potential::from_values(vec![a.clone()], vec![1., 2.]).unwrap();
        let pb = Potential::from_values(vec![b.clone()], vec![10., 20.]).unwrap();

        let s = &pa + &pb;
        assert_eq!(&[11., 21., 12., 22.], s.values());

        let d = pa.combine(&pb, CombineOp::Sub).unwrap();
        assert_eq!(&[-9., -19., -8., -18.], d.values());
    }

    #[test]
    fn product_with_scalar() {
        let a = Variable::binary("A");
        let pa = Potential::from_values(vec![a.clone()], vec![0.3, 0.7]).unwrap();

        assert_eq!(pa, pa.product(&Potential::new()));
        assert_eq!(pa.scale(2.0), Potential::scalar(2.0).product(&pa));
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 9.7
    fn marginalize_simple() {
        let a = Variable::discrete("A", 3);
        let b = Variable::binary("B");
        let c = Variable::binary("C");

        let phi = Potential::from_values(
            vec![a.clone(), b.clone(), c.clone()],
            vec![0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0., 0., 0.15, 0.21, 0.09, 0.18]
        ).unwrap();

        let psi = phi.marginalize_out(&[b.clone()]);
        let expected = Potential::from_values(vec![a.clone(), c.clone()], vec![0.33, 0.51, 0.05, 0.07, 0.24, 0.39]).unwrap();
        assert_eq!(expected, psi);

        let psi = phi.marginalize_keeping(&[c.clone()]);
        let expected = Potential::from_values(vec![c.clone()], vec![0.62, 0.97]).unwrap();
        assert_eq!(expected, psi);

        let total = phi.marginalize_out(&[a.clone(), b.clone(), c.clone()]);
        assert_eq!(0, total.nb_dims());
        assert!((total.sum() - 1.59).abs() < 1e-9);
    }

    #[test]
    fn other_projections() {
        let a = Variable::binary("A");
        let b = Variable::discrete("B", 3);
        let phi = Potential::from_values(vec![a.clone(), b.clone()], vec![1., 5., 2., 4., 3., 6.]).unwrap();

        assert_eq!(&[5., 6.], phi.max_out(&[b.clone()]).values());
        assert_eq!(&[1., 3.], phi.min_out(&[b.clone()]).values());
        assert_eq!(&[10., 72.], phi.project(&[b.clone()], ProjectOp::Product).values());
    }

    #[test]
    fn project_nothing() {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let phi = Potential::from_values(vec![a.clone()], vec![0.4, 0.6]).unwrap();

        assert_eq!(phi, phi.project(&[], ProjectOp::Sum));
        assert_eq!(phi, phi.project(&[b.clone()], ProjectOp::Max));
    }

    #[test]
    fn combined_values_follow_instantiations() {
        let a = Variable::binary("A");
        let b = Variable::discrete("B", 3);
        let pa = Potential::from_values(vec![a.clone()], vec![2., 3.]).unwrap();
        let pba = Potential::from_values(vec![b.clone(), a.clone()], vec![1., 2., 3., 4., 5., 6.]).unwrap();

        let prod = pa.product(&pba);
        let mut inst = Instantiation::new();
        inst.set(&a, 1).unwrap();
        inst.set(&b, 2).unwrap();
        assert_eq!(18., prod.get(&inst).unwrap());
    }
}
