//! Combination of a set of tables followed by the projection of some of their variables
//!
//! Rather than combining everything and projecting at the end, the variables to remove are taken
//! one at a time: the tables mentioning the cheapest variable are combined, and the variable is
//! projected out as soon as no other table mentions it. The tables that never meet a removed
//! variable are returned untouched, so the result is a set of tables whose combination equals the
//! projection of the combination of the inputs.

use crate::combination::{union, MultiDimCombination};
use crate::potential::{CombineOp, Potential, ProjectOp};
use crate::schedule::multidim::estimated_size;
use crate::schedule::{MultiDimId, Schedule};
use crate::util::{Error, Result};
use crate::variable::Variable;

use log::trace;

use std::borrow::Cow;


/// One step of the plan: combine the operands of `group` then project `del_vars` out of the
/// combination. The result of step `k` is operand `n + k`, `n` being the number of inputs.
#[derive(Clone, Debug, PartialEq)]
struct Step {
    group: Vec<usize>,
    del_vars: Vec<Variable>
}


/// The steps eliminating `del_vars` from operands ranging over `var_sets`, and the operands left
/// once every step has run
fn plan(var_sets: &[Vec<Variable>], del_vars: &[Variable]) -> (Vec<Step>, Vec<usize>) {
    let mut sets = var_sets.to_vec();
    let mut alive = vec![true; sets.len()];

    let mut remaining: Vec<Variable> = Vec::new();
    for v in del_vars {
        if !remaining.contains(v) && sets.iter().any(|s| s.contains(v)) {
            remaining.push(v.clone());
        }
    }

    let mut steps = Vec::new();
    while !remaining.is_empty() {
        ///////////////////////////////////////////////////////////////////////
        // 1) the variable whose tables have the smallest combination
        let mut best: Option<(f64, Vec<usize>)> = None;
        for v in remaining.iter() {
            let group: Vec<usize> = (0..sets.len()).filter(|&i| alive[i] && sets[i].contains(v)).collect();
            let vars = group.iter().fold(Vec::new(), |acc, &i| union(&acc, &sets[i]));
            let size = estimated_size(&vars);
            if best.as_ref().map_or(true, |(s, _)| size < *s) {
                best = Some((size, group));
            }
        }

        let group = match best {
            Some((_, group)) if !group.is_empty() => group,
            _ => break
        };

        ///////////////////////////////////////////////////////////////////////
        // 2) every remaining variable the other tables do not mention goes away with it
        for &i in group.iter() {
            alive[i] = false;
        }
        let vars = group.iter().fold(Vec::new(), |acc, &i| union(&acc, &sets[i]));
        let step_del: Vec<Variable> = remaining
            .iter()
            .filter(|v| vars.contains(v))
            .filter(|v| !(0..sets.len()).any(|i| alive[i] && sets[i].contains(v)))
            .cloned()
            .collect();
        remaining.retain(|v| !step_del.contains(v));

        sets.push(vars.into_iter().filter(|v| !step_del.contains(v)).collect());
        alive.push(true);
        steps.push(Step { group, del_vars: step_del });
    }

    let outputs = (0..sets.len()).filter(|&i| alive[i]).collect();
    (steps, outputs)
}


/// Combines tables and projects variables out of the combination, interleaving both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultiDimCombineAndProject {
    combination: MultiDimCombination,
    project: ProjectOp
}


impl MultiDimCombineAndProject {

    pub fn new(combine: CombineOp, project: ProjectOp) -> Self {
        MultiDimCombineAndProject { combination: MultiDimCombination::new(combine), project }
    }

    pub fn combine_op(&self) -> CombineOp {
        self.combination.op()
    }

    pub fn project_op(&self) -> ProjectOp {
        self.project
    }

    /// Combine `tables` and project `del_vars` out of the combination.
    ///
    /// # Args
    /// * `tables`: the operands, at least one
    /// * `del_vars`: the variables to remove; those no table contains are ignored
    ///
    /// # Returns
    /// a set of tables whose combination is the projection. None of them contains a variable of
    /// `del_vars`.
    ///
    /// # Errors
    /// * `Error::InvalidArgumentsNumber` if `tables` is empty
    pub fn combine_and_project(&self, tables: &[&Potential], del_vars: &[Variable]) -> Result<Vec<Potential>> {
        let operands = tables.iter().map(|&t| Cow::Borrowed(t)).collect();
        Ok(self.combine_and_project_cow(operands, del_vars)?.into_iter().map(Cow::into_owned).collect())
    }

    /// Same as `combine_and_project`, combining the resulting set into a single table.
    pub fn combine_and_project_to_table(&self, tables: &[&Potential], del_vars: &[Variable]) -> Result<Potential> {
        let operands = tables.iter().map(|&t| Cow::Borrowed(t)).collect();
        let set = self.combine_and_project_cow(operands, del_vars)?;
        Ok(self.combination.combine_cow(set)?.into_owned())
    }

    pub(crate) fn combine_and_project_cow<'a>(
        &self,
        tables: Vec<Cow<'a, Potential>>,
        del_vars: &[Variable]
    ) -> Result<Vec<Cow<'a, Potential>>> {
        if tables.is_empty() {
            return Err(Error::InvalidArgumentsNumber { expected: 1, found: 0 });
        }

        let var_sets: Vec<Vec<Variable>> = tables.iter().map(|t| t.variables().to_vec()).collect();
        let (steps, outputs) = plan(&var_sets, del_vars);
        let mut operands: Vec<Option<Cow<'a, Potential>>> = tables.into_iter().map(Some).collect();

        for step in steps {
            let mut group = Vec::with_capacity(step.group.len());
            for &i in step.group.iter() {
                group.push(take(&mut operands, i)?);
            }

            let combined = self.combination.combine_cow(group)?;
            operands.push(Some(Cow::Owned(combined.project(&step.del_vars, self.project))));
        }

        let mut res = Vec::with_capacity(outputs.len());
        for i in outputs {
            res.push(take(&mut operands, i)?);
        }
        Ok(res)
    }

    /// Plan the combination and projection of the slots `args` in `schedule`. The arguments are
    /// left untouched and the intermediate tables are deleted once consumed.
    ///
    /// # Returns
    /// the slots whose combination is the projection: some may be arguments, the others are
    /// created by the schedule and owned by the caller
    ///
    /// # Errors
    /// * `Error::InvalidArgumentsNumber` if `args` is empty
    /// * the errors raised by the schedule
    pub fn schedule_combine_and_project(
        &self,
        schedule: &mut Schedule,
        args: &[MultiDimId],
        del_vars: &[Variable]
    ) -> Result<Vec<MultiDimId>> {
        if args.is_empty() {
            return Err(Error::InvalidArgumentsNumber { expected: 1, found: 0 });
        }

        let mut var_sets = Vec::with_capacity(args.len());
        for &id in args {
            var_sets.push(schedule.arena().variables(id)?.to_vec());
        }

        let n = args.len();
        let (steps, outputs) = plan(&var_sets, del_vars);
        let mut ids = args.to_vec();

        for step in steps {
            let group: Vec<MultiDimId> = step.group.iter().map(|&i| ids[i]).collect();
            let combined = self.combination.schedule_operands(schedule, &group)?;
            let projected = schedule.project(combined, &step.del_vars, self.project, false)?;
            trace!("planned elimination of {:?} from tables {:?} into {}", step.del_vars, group, projected);

            for &i in step.group.iter() {
                if i >= n {
                    schedule.delete(ids[i])?;
                }
            }
            if group.len() > 1 {
                schedule.delete(combined)?;
            }
            ids.push(projected);
        }

        Ok(outputs.into_iter().map(|i| ids[i]).collect())
    }

    /// An estimate of the number of elementary operations needed to combine tables over
    /// `var_sets` and project `del_vars` out
    pub fn nb_operations(&self, var_sets: &[Vec<Variable>], del_vars: &[Variable]) -> f64 {
        self.simulate(var_sets, del_vars).0
    }

    /// An estimate of the memory needed to combine tables over `var_sets` and project `del_vars`
    /// out
    ///
    /// # Returns
    /// the peak number of entries allocated, and the number of entries held by the created
    /// tables at the end
    pub fn memory_usage(&self, var_sets: &[Vec<Variable>], del_vars: &[Variable]) -> (f64, f64) {
        let (_, peak, end) = self.simulate(var_sets, del_vars);
        (peak, end)
    }

    fn simulate(&self, var_sets: &[Vec<Variable>], del_vars: &[Variable]) -> (f64, f64, f64) {
        let n = var_sets.len();
        let (steps, _) = plan(var_sets, del_vars);
        let mut sets = var_sets.to_vec();

        let mut ops = 0.0;
        let mut current: f64 = 0.0;
        let mut peak: f64 = 0.0;
        for step in steps {
            let group: Vec<Vec<Variable>> = step.group.iter().map(|&i| sets[i].clone()).collect();
            let combined = group.iter().fold(Vec::new(), |acc, s| union(&acc, s));

            if group.len() > 1 {
                let (comb_ops, comb_peak, comb_end) = MultiDimCombination::simulate(&group);
                ops += comb_ops;
                peak = peak.max(current + comb_peak);
                current += comb_end;
            }

            let projected: Vec<Variable> = combined.iter().filter(|v| !step.del_vars.contains(v)).cloned().collect();
            ops += estimated_size(&combined);
            current += estimated_size(&projected);
            peak = peak.max(current);

            if group.len() > 1 {
                current -= estimated_size(&combined);
            }
            for &i in step.group.iter() {
                if i >= n {
                    current -= estimated_size(&sets[i]);
                }
            }
            sets.push(projected);
        }

        (ops, peak, current)
    }
}


fn take<'a>(operands: &mut [Option<Cow<'a, Potential>>], i: usize) -> Result<Cow<'a, Potential>> {
    operands
        .get_mut(i)
        .and_then(Option::take)
        .ok_or_else(|| Error::UndefinedElement(format!("operand {}", i)))
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::potential::CombineOp::Mul;
    use crate::potential::ProjectOp::Sum;

    struct Chain {
        a: Variable,
        b: Variable,
        c: Variable,
        d: Variable,
        tables: Vec<Potential>
    }

    /// P(A) P(B|A) P(C|B) and an unrelated P(D)
    fn chain() -> Chain {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let c = Variable::binary("C");
        let d = Variable::discrete("D", 3);

        let pa = Potential::from_values(vec![a.clone()], vec![0.6, 0.4]).unwrap();
        let pb = Potential::from_values(vec![a.clone(), b.clone()], vec![0.9, 0.1, 0.2, 0.8]).unwrap();
        let pc = Potential::from_values(vec![b.clone(), c.clone()], vec![0.7, 0.3, 0.4, 0.6]).unwrap();
        let pd = Potential::from_values(vec![d.clone()], vec![0.2, 0.3, 0.5]).unwrap();
        Chain { a, b, c, d, tables: vec![pa, pb, pc, pd] }
    }

    #[test]
    fn interleaving_keeps_the_result() {
        let ch = chain();
        let refs: Vec<&Potential> = ch.tables.iter().collect();
        let cp = MultiDimCombineAndProject::new(Mul, Sum);

        let set = cp.combine_and_project(&refs, &[ch.a.clone(), ch.b.clone()]).unwrap();

        // P(D) never meets A or B
        assert_eq!(2, set.len());
        assert!(set.contains(&ch.tables[3]));

        let res = cp.combine_and_project_to_table(&refs, &[ch.a.clone(), ch.b.clone()]).unwrap();
        let full = MultiDimCombination::new(Mul).combine(&refs).unwrap();
        assert_eq!(full.marginalize_out(&[ch.a.clone(), ch.b.clone()]), res);

        let pc = res.marginalize_out(&[ch.d.clone()]);
        let expected = Potential::from_values(vec![ch.c.clone()], vec![0.586, 0.414]).unwrap();
        assert_eq!(expected, pc);
    }

    #[test]
    fn plan_eliminates_cheapest_first() {
        let ch = chain();
        let sets: Vec<Vec<Variable>> = ch.tables.iter().map(|t| t.variables().to_vec()).collect();

        let (steps, outputs) = plan(&sets, &[ch.b.clone(), ch.a.clone()]);
        // A only meets {A} and {A,B}: 4 entries, B meets {A,B} and {B,C}: 8 entries
        assert_eq!(vec![0, 1], steps[0].group);
        assert_eq!(vec![ch.a.clone()], steps[0].del_vars);
        assert_eq!(vec![2, 4], steps[1].group);
        assert_eq!(vec![ch.b.clone()], steps[1].del_vars);
        assert_eq!(vec![3, 5], outputs);
    }

    #[test]
    fn nothing_to_project() {
        let ch = chain();
        let cp = MultiDimCombineAndProject::new(Mul, Sum);

        let set = cp.combine_and_project(&[&ch.tables[0], &ch.tables[3]], &[ch.c.clone()]).unwrap();
        assert_eq!(vec![ch.tables[0].clone(), ch.tables[3].clone()], set);

        assert_eq!(
            Err(Error::InvalidArgumentsNumber { expected: 1, found: 0 }),
            cp.combine_and_project(&[], &[ch.a.clone()])
        );
    }

    #[test]
    fn scheduled_matches_eager() {
        let ch = chain();
        let refs: Vec<&Potential> = ch.tables.iter().collect();
        let cp = MultiDimCombineAndProject::new(Mul, Sum);
        let del = [ch.a.clone(), ch.b.clone()];

        let mut schedule = Schedule::new();
        let ids: Vec<MultiDimId> = ch.tables.iter().map(|t| schedule.insert_table(t.clone(), false)).collect();
        let outputs = cp.schedule_combine_and_project(&mut schedule, &ids, &del).unwrap();
        assert_eq!(2, outputs.len());
        assert_eq!(ids[3], outputs[0]);

        schedule.execute_all().unwrap();
        let eager = cp.combine_and_project(&refs, &del).unwrap();
        assert_eq!(&eager[1], schedule.potential(outputs[1]).unwrap());

        // only the arguments and the final table are left
        let held: Vec<MultiDimId> = (0..schedule.arena().len()).filter(|&id| schedule.potential(id).is_ok()).collect();
        assert_eq!(vec![0, 1, 2, 3, outputs[1]], held);
    }

    #[test]
    fn estimates() {
        let ch = chain();
        let sets: Vec<Vec<Variable>> = ch.tables.iter().map(|t| t.variables().to_vec()).collect();
        let cp = MultiDimCombineAndProject::new(Mul, Sum);

        // {A} x {A,B} = 4, project to {B} = 4, {B,C} x {B} = 4, project to {C} = 4
        assert_eq!(16.0, cp.nb_operations(&sets, &[ch.a.clone(), ch.b.clone()]));
        let (peak, end) = cp.memory_usage(&sets, &[ch.a.clone(), ch.b.clone()]);
        assert_eq!(8.0, peak);
        assert_eq!(2.0, end);
    }
}
