//! Projection of a table over a set of variables

use crate::potential::{Potential, ProjectOp};
use crate::schedule::multidim::estimated_size;
use crate::schedule::{MultiDimId, Schedule};
use crate::util::Result;
use crate::variable::Variable;


/// Removes variables from tables by folding them with a reduction operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultiDimProjection {
    op: ProjectOp
}


impl MultiDimProjection {

    pub fn new(op: ProjectOp) -> Self {
        MultiDimProjection { op }
    }

    pub fn op(&self) -> ProjectOp {
        self.op
    }

    pub fn set_op(&mut self, op: ProjectOp) {
        self.op = op;
    }

    /// Project `table` over `del_vars`. Variables of `del_vars` that `table` does not contain are
    /// ignored, so projecting over no variable returns a copy of the table.
    pub fn project(&self, table: &Potential, del_vars: &[Variable]) -> Potential {
        table.project(del_vars, self.op)
    }

    /// Plan the projection of the slot `arg` in `schedule`. The argument is left untouched.
    ///
    /// # Returns
    /// the slot that will hold the result
    pub fn schedule_project(&self, schedule: &mut Schedule, arg: MultiDimId, del_vars: &[Variable]) -> Result<MultiDimId> {
        schedule.project(arg, del_vars, self.op, false)
    }

    /// An estimate of the number of elementary operations needed to project a table over `vars`
    pub fn nb_operations(&self, vars: &[Variable]) -> f64 {
        estimated_size(vars)
    }

    /// An estimate of the memory needed to project a table over `vars`: the size of the result
    pub fn memory_usage(&self, vars: &[Variable], del_vars: &[Variable]) -> f64 {
        vars.iter()
            .filter(|v| !del_vars.contains(v))
            .map(|v| v.domain_size() as f64)
            .product()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_and_max() {
        let a = Variable::binary("A");
        let b = Variable::discrete("B", 3);
        let p = Potential::from_values(vec![a.clone(), b.clone()], vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();

        let sum = MultiDimProjection::new(ProjectOp::Sum).project(&p, &[a.clone()]);
        assert_eq!(Potential::from_values(vec![b.clone()], vec![0.5, 0.7, 0.9]).unwrap(), sum);

        let max = MultiDimProjection::new(ProjectOp::Max).project(&p, &[b.clone()]);
        assert_eq!(Potential::from_values(vec![a.clone()], vec![0.3, 0.6]).unwrap(), max);

        let same = MultiDimProjection::new(ProjectOp::Sum).project(&p, &[]);
        assert_eq!(p, same);
    }

    #[test]
    fn scheduled_projection() {
        let a = Variable::binary("A");
        let b = Variable::discrete("B", 3);
        let p = Potential::from_values(vec![a.clone(), b.clone()], vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let proj = MultiDimProjection::new(ProjectOp::Sum);

        let mut schedule = Schedule::new();
        let arg = schedule.insert_table(p.clone(), false);
        let res = proj.schedule_project(&mut schedule, arg, &[b.clone()]).unwrap();
        assert_eq!(&[a.clone()], schedule.arena().variables(res).unwrap());

        schedule.execute_all().unwrap();
        assert_eq!(&proj.project(&p, &[b.clone()]), schedule.potential(res).unwrap());
        assert!(schedule.potential(arg).is_ok());

        assert_eq!(6.0, proj.nb_operations(p.variables()));
        assert_eq!(2.0, proj.memory_usage(p.variables(), &[b]));
    }
}
