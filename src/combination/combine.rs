//! Combination of a set of tables with a commutative and associative operator

use crate::combination::{plan_pairs, union};
use crate::potential::{CombineOp, Potential};
use crate::schedule::multidim::estimated_size;
use crate::schedule::{MultiDimId, Schedule};
use crate::util::{Error, Result};
use crate::variable::Variable;

use log::trace;

use std::borrow::Cow;


fn check_operands(found: usize) -> Result<()> {
    if found < 2 {
        return Err(Error::InvalidArgumentsNumber { expected: 2, found });
    }
    Ok(())
}


/// Combines many tables by merging the two operands with the smallest combination first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultiDimCombination {
    op: CombineOp
}


impl MultiDimCombination {

    pub fn new(op: CombineOp) -> Self {
        MultiDimCombination { op }
    }

    pub fn op(&self) -> CombineOp {
        self.op
    }

    pub fn set_op(&mut self, op: CombineOp) {
        self.op = op;
    }

    /// Combine `tables`.
    ///
    /// # Args
    /// * `tables`: the operands, at least two
    ///
    /// # Returns
    /// a table over the union of the variables of the operands
    ///
    /// # Errors
    /// * `Error::InvalidArgumentsNumber` if there are fewer than two tables
    /// * the errors of the operator (`Error::DivideByZero`)
    pub fn combine(&self, tables: &[&Potential]) -> Result<Potential> {
        check_operands(tables.len())?;
        Ok(self.combine_cow(tables.iter().map(|&t| Cow::Borrowed(t)).collect())?.into_owned())
    }

    /// Combine operands that are either borrowed or owned. A single operand is returned as is.
    pub(crate) fn combine_cow<'a>(&self, operands: Vec<Cow<'a, Potential>>) -> Result<Cow<'a, Potential>> {
        let var_sets: Vec<Vec<Variable>> = operands.iter().map(|t| t.variables().to_vec()).collect();
        let mut operands: Vec<Option<Cow<'a, Potential>>> = operands.into_iter().map(Some).collect();

        for (i, j) in plan_pairs(&var_sets) {
            let a = operands[i].take().ok_or_else(|| Error::UndefinedElement(format!("operand {}", i)))?;
            let b = operands[j].take().ok_or_else(|| Error::UndefinedElement(format!("operand {}", j)))?;
            operands.push(Some(Cow::Owned(a.combine(&b, self.op)?)));
        }

        operands.pop()
                .and_then(|last| last)
                .ok_or_else(|| Error::InvalidArgumentsNumber { expected: 1, found: 0 })
    }

    /// Plan the combination of the slots `args` in `schedule`. The intermediate tables are deleted
    /// once consumed; the arguments themselves are left untouched.
    ///
    /// # Returns
    /// the slot that will hold the result
    ///
    /// # Errors
    /// * `Error::InvalidArgumentsNumber` if there are fewer than two arguments
    /// * the errors of `Schedule::combine`
    pub fn schedule_combine(&self, schedule: &mut Schedule, args: &[MultiDimId]) -> Result<MultiDimId> {
        check_operands(args.len())?;
        self.schedule_operands(schedule, args)
    }

    /// Same as `schedule_combine`, returning the argument itself when there is only one
    pub(crate) fn schedule_operands(&self, schedule: &mut Schedule, args: &[MultiDimId]) -> Result<MultiDimId> {
        let mut var_sets = Vec::with_capacity(args.len());
        for &id in args {
            var_sets.push(schedule.arena().variables(id)?.to_vec());
        }

        let n = args.len();
        let mut ids = args.to_vec();
        for (i, j) in plan_pairs(&var_sets) {
            let res = schedule.combine(ids[i], ids[j], self.op, false)?;
            trace!("planned combination of tables {} and {} into {}", ids[i], ids[j], res);
            for &k in [i, j].iter() {
                if k >= n {
                    schedule.delete(ids[k])?;
                }
            }
            ids.push(res);
        }

        ids.last().cloned().ok_or_else(|| Error::InvalidArgumentsNumber { expected: 1, found: 0 })
    }

    /// An estimate of the number of elementary operations needed to combine tables over `var_sets`
    pub fn nb_operations(&self, var_sets: &[Vec<Variable>]) -> Result<f64> {
        check_operands(var_sets.len())?;
        Ok(Self::simulate(var_sets).0)
    }

    /// An estimate of the memory needed to combine tables over `var_sets`
    ///
    /// # Returns
    /// the peak number of entries allocated, and the number of entries of the result
    pub fn memory_usage(&self, var_sets: &[Vec<Variable>]) -> Result<(f64, f64)> {
        check_operands(var_sets.len())?;
        let (_, peak, end) = Self::simulate(var_sets);
        Ok((peak, end))
    }

    /// Replay the plan on variable sets only: (operations, peak memory, result size)
    pub(crate) fn simulate(var_sets: &[Vec<Variable>]) -> (f64, f64, f64) {
        let n = var_sets.len();
        let mut sets = var_sets.to_vec();

        let mut ops = 0.0;
        let mut current: f64 = 0.0;
        let mut peak: f64 = 0.0;
        for (i, j) in plan_pairs(var_sets) {
            let merged = union(&sets[i], &sets[j]);
            let size = estimated_size(&merged);
            ops += size;
            current += size;
            peak = peak.max(current);

            for &k in [i, j].iter() {
                if k >= n {
                    current -= estimated_size(&sets[k]);
                }
            }
            sets.push(merged);
        }

        let end = sets.last().map(|s| estimated_size(s)).unwrap_or(0.0);
        (ops, peak, end)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::schedule::SlotState;

    fn tables() -> (Variable, Variable, Variable, Vec<Potential>) {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let c = Variable::discrete("C", 3);

        let pab = Potential::from_values(vec![a.clone(), b.clone()], vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let pbc = Potential::from_values(vec![b.clone(), c.clone()], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let pc = Potential::from_values(vec![c.clone()], vec![0.5, 0.25, 0.25]).unwrap();
        (a, b, c, vec![pab, pbc, pc])
    }

    #[test]
    fn combine_products() {
        let (_, _, _, ts) = tables();
        let comb = MultiDimCombination::new(CombineOp::Mul);

        let res = comb.combine(&[&ts[0], &ts[1], &ts[2]]).unwrap();
        let expected = ts[0].product(&ts[1]).product(&ts[2]);
        assert_eq!(expected, res);
        assert_eq!(12, res.domain_size());
    }

    #[test]
    fn too_few_tables() {
        let (_, _, _, ts) = tables();
        let comb = MultiDimCombination::new(CombineOp::Add);

        assert_eq!(Err(Error::InvalidArgumentsNumber { expected: 2, found: 1 }), comb.combine(&[&ts[0]]));
        assert!(comb.combine(&[]).is_err());
    }

    #[test]
    fn scheduled_matches_eager() {
        let (_, _, _, ts) = tables();
        let comb = MultiDimCombination::new(CombineOp::Mul);

        let mut schedule = Schedule::new();
        let ids: Vec<MultiDimId> = ts.iter().map(|t| schedule.insert_table(t.clone(), false)).collect();
        let res = comb.schedule_combine(&mut schedule, &ids).unwrap();
        assert!(schedule.arena().get(res).unwrap().is_abstract());

        schedule.execute_all().unwrap();
        let expected = comb.combine(&[&ts[0], &ts[1], &ts[2]]).unwrap();
        assert_eq!(&expected, schedule.potential(res).unwrap());

        // the arguments survive, the intermediate table does not
        for &id in ids.iter() {
            assert!(schedule.potential(id).is_ok());
        }
        assert_eq!(3, schedule.len());
        assert_eq!(SlotState::Deleted, schedule.arena().get(3).unwrap().state());
    }

    #[test]
    fn estimates() {
        let (a, b, c, _) = tables();
        let comb = MultiDimCombination::new(CombineOp::Mul);
        let sets = vec![vec![a.clone(), b.clone()], vec![b.clone(), c.clone()], vec![c.clone()]];

        // {B,C} x {C} = 6, then {A,B} x {B,C} = 12
        assert_eq!(18.0, comb.nb_operations(&sets).unwrap());
        let (peak, end) = comb.memory_usage(&sets).unwrap();
        assert_eq!(18.0, peak);
        assert_eq!(12.0, end);
    }
}
