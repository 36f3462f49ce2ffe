//! Deferred table computations.
//!
//! A `Schedule` is a dependency graph of operations over the slots of a `MultiDimArena`. It is
//! planned first (operations are inserted and their results exist as abstract slots carrying
//! variables and estimated sizes), then executed, in whole or operation by operation.
//!
//! The schedule enforces the ownership rules of the slots: a slot is deleted by at most one
//! operation, no operation may read a slot after the operation deleting it, and the deleting
//! operation runs after every operation reading the slot.

pub mod multidim;
pub mod operation;

pub use self::multidim::{MultiDimArena, MultiDimId, ScheduleMultiDim, SlotState};
pub use self::operation::{
    OperationType, ScheduleCombination, ScheduleDeletion, ScheduleOperator, ScheduleProjection, ScheduleStorage,
    TableContainer
};

use crate::potential::{CombineOp, Potential, ProjectOp};
use crate::util::{Error, Result};
use crate::variable::Variable;

use log::debug;

use std::collections::{BTreeMap, BTreeSet};

/// Index of an operation in a `Schedule`
pub type OperationId = usize;


#[derive(Debug, Default)]
pub struct Schedule {
    arena: MultiDimArena,

    operations: Vec<Box<dyn ScheduleOperator>>,

    /// The operations each operation waits for
    dependencies: Vec<BTreeSet<OperationId>>,

    /// The operation producing each computed slot
    producer: BTreeMap<MultiDimId, OperationId>,

    /// The operations reading each slot
    readers: BTreeMap<MultiDimId, Vec<OperationId>>,

    /// The operation deleting each slot
    deleter: BTreeMap<MultiDimId, OperationId>,

    /// The executed operations, in execution order
    executed: Vec<OperationId>
}


impl Schedule {

    pub fn new() -> Self {
        Schedule::default()
    }

    pub fn arena(&self) -> &MultiDimArena {
        &self.arena
    }

    /// Add a source table to the schedule.
    ///
    /// # Args
    /// * `potential`: the table
    /// * `persistent`: whether the table must survive the operations reading it
    pub fn insert_table(&mut self, potential: Potential, persistent: bool) -> MultiDimId {
        self.arena.insert_concrete(potential, persistent)
    }

    /// Mark a slot persistent (or not). A persistent slot is never deleted by the schedule.
    ///
    /// # Errors
    /// * `Error::OperationNotAllowed` if an operation already plans to delete the slot
    pub fn set_persistent(&mut self, id: MultiDimId, persistent: bool) -> Result<()> {
        if persistent && self.deleter.contains_key(&id) {
            return Err(Error::OperationNotAllowed(format!("schedule table {} is already planned for deletion", id)));
        }
        self.arena.set_persistent(id, persistent)
    }

    /// Insert an operation, after checking its arguments against the ownership rules.
    ///
    /// # Errors
    /// * `Error::NotFound` if an argument is not a slot of the arena
    /// * `Error::OperationNotAllowed` if an argument is already planned for deletion, or if the
    ///   operation would delete a slot a second time
    pub fn insert_operation(&mut self, op: Box<dyn ScheduleOperator>) -> Result<OperationId> {
        let id = self.operations.len();

        ///////////////////////////////////////////////////////////////////////
        // 1) validate the arguments before touching the bookkeeping
        let mut deleted = Vec::new();
        for &arg in op.args() {
            self.arena.get(arg)?;
            if let Some(&d) = self.deleter.get(&arg) {
                return Err(Error::OperationNotAllowed(format!(
                    "schedule table {} is read after its deletion by operation {}", arg, d
                )));
            }

            let persistent = self.arena.is_persistent(arg)?;
            if op.op_type() == OperationType::Delete && persistent {
                return Err(Error::OperationNotAllowed(format!("schedule table {} is persistent", arg)));
            }
            if op.imply_deletion() && !persistent && !deleted.contains(&arg) {
                deleted.push(arg);
            }
        }

        ///////////////////////////////////////////////////////////////////////
        // 2) dependencies: the producers of the arguments, and the readers of the deleted ones
        let mut deps = BTreeSet::new();
        for &arg in op.args() {
            if let Some(&p) = self.producer.get(&arg) {
                deps.insert(p);
            }
        }
        for arg in deleted.iter() {
            if let Some(readers) = self.readers.get(arg) {
                deps.extend(readers.iter().cloned());
            }
        }

        ///////////////////////////////////////////////////////////////////////
        // 3) register the operation
        for &arg in op.args() {
            self.readers.entry(arg).or_default().push(id);
        }
        for &res in op.results() {
            self.producer.insert(res, id);
        }
        for arg in deleted {
            self.deleter.insert(arg, id);
        }

        self.dependencies.push(deps);
        self.operations.push(op);
        Ok(id)
    }

    /// Plan the combination of two slots. Returns the result slot.
    pub fn combine(&mut self, a: MultiDimId, b: MultiDimId, op: CombineOp, imply_deletion: bool) -> Result<MultiDimId> {
        let comb = ScheduleCombination::new(&mut self.arena, a, b, op, imply_deletion)?;
        let res = comb.results()[0];
        self.insert_operation(Box::new(comb))?;
        Ok(res)
    }

    /// Plan the projection of a slot. Returns the result slot.
    pub fn project(&mut self, arg: MultiDimId, del_vars: &[Variable], op: ProjectOp, imply_deletion: bool) -> Result<MultiDimId> {
        let proj = ScheduleProjection::new(&mut self.arena, arg, del_vars, op, imply_deletion)?;
        let res = proj.results()[0];
        self.insert_operation(Box::new(proj))?;
        Ok(res)
    }

    /// Plan the deletion of a slot.
    pub fn delete(&mut self, arg: MultiDimId) -> Result<OperationId> {
        let del = ScheduleDeletion::new(&self.arena, arg)?;
        self.insert_operation(Box::new(del))
    }

    /// Plan the copy of a slot into `container`.
    pub fn store(&mut self, arg: MultiDimId, container: TableContainer) -> Result<OperationId> {
        self.insert_operation(Box::new(ScheduleStorage::new(arg, container)))
    }

    /// The number of operations inserted
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// # Errors
    /// * `Error::NotFound` if there is no such operation
    pub fn operation(&self, id: OperationId) -> Result<&dyn ScheduleOperator> {
        self.operations
            .get(id)
            .map(|op| op.as_ref())
            .ok_or_else(|| Error::NotFound(format!("schedule operation {}", id)))
    }

    /// The operations `id` waits for
    pub fn dependencies(&self, id: OperationId) -> Result<&BTreeSet<OperationId>> {
        self.dependencies.get(id).ok_or_else(|| Error::NotFound(format!("schedule operation {}", id)))
    }

    /// The operations not executed yet whose dependencies have all been executed
    pub fn available_operations(&self) -> Vec<OperationId> {
        (0..self.operations.len())
            .filter(|&i| !self.operations[i].is_executed())
            .filter(|&i| self.dependencies[i].iter().all(|&d| self.operations[d].is_executed()))
            .collect()
    }

    /// Execute one operation. Executing an executed operation does nothing.
    ///
    /// # Errors
    /// * `Error::NotFound` if there is no such operation
    /// * `Error::OperationNotAllowed` if a dependency has not been executed
    pub fn execute(&mut self, id: OperationId) -> Result<()> {
        if id >= self.operations.len() {
            return Err(Error::NotFound(format!("schedule operation {}", id)));
        }
        if self.operations[id].is_executed() {
            return Ok(());
        }
        if let Some(&d) = self.dependencies[id].iter().find(|&&d| !self.operations[d].is_executed()) {
            return Err(Error::OperationNotAllowed(format!("operation {} waits for operation {}", id, d)));
        }

        self.operations[id].execute(&mut self.arena)?;
        self.executed.push(id);
        Ok(())
    }

    /// Execute every pending operation
    pub fn execute_all(&mut self) -> Result<()> {
        let before = self.executed.len();
        loop {
            let available = self.available_operations();
            if available.is_empty() {
                break;
            }
            for id in available {
                self.execute(id)?;
            }
        }

        debug!(
            "schedule executed {} operations, {} entries held",
            self.executed.len() - before, self.arena.memory_usage()
        );
        Ok(())
    }

    /// Undo the last executed operation.
    ///
    /// # Errors
    /// * `Error::OperationNotAllowed` if no operation has been executed
    pub fn undo_last(&mut self) -> Result<OperationId> {
        let id = self.executed
                     .pop()
                     .ok_or_else(|| Error::OperationNotAllowed(String::from("no executed operation to undo")))?;
        self.operations[id].undo(&mut self.arena)?;
        Ok(id)
    }

    /// An estimate of the number of elementary operations of the pending operations
    pub fn nb_operations(&self) -> Result<f64> {
        let mut total = 0.0;
        for op in self.operations.iter().filter(|op| !op.is_executed()) {
            total += op.nb_operations(&self.arena)?;
        }
        Ok(total)
    }

    /// Simulate the pending operations in insertion order (a topological order of the
    /// dependencies) and estimate the memory they need.
    ///
    /// # Returns
    /// the peak number of entries held, and the number held at the end
    pub fn memory_usage(&self) -> Result<(f64, f64)> {
        let mut current = self.arena.memory_usage();
        let mut peak = current;
        for op in self.operations.iter().filter(|op| !op.is_executed()) {
            let (op_peak, op_end) = op.memory_usage(&self.arena)?;
            peak = peak.max(current + op_peak);
            current += op_end;
        }
        Ok((peak, current))
    }

    /// The table of a concrete slot
    pub fn potential(&self, id: MultiDimId) -> Result<&Potential> {
        self.arena.potential(id)
    }

    /// Move the table out of a persistent slot.
    pub fn take_potential(&mut self, id: MultiDimId) -> Result<Potential> {
        self.arena.take_potential(id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    struct Chain {
        schedule: Schedule,
        a: Variable,
        b: Variable,
        c: Variable,
        pa: MultiDimId,
        pba: MultiDimId,
        pcb: MultiDimId
    }

    /// A -> B -> C with binary variables
    fn chain() -> Chain {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let c = Variable::binary("C");
        let mut schedule = Schedule::new();
        let pa = schedule.insert_table(Potential::from_values(vec![a.clone()], vec![0.3, 0.7]).unwrap(), false);
        let pba = schedule.insert_table(
            Potential::from_values(vec![a.clone(), b.clone()], vec![0.9, 0.1, 0.2, 0.8]).unwrap(),
            false
        );
        let pcb = schedule.insert_table(
            Potential::from_values(vec![b.clone(), c.clone()], vec![0.9, 0.1, 0.2, 0.8]).unwrap(),
            false
        );
        Chain { schedule, a, b, c, pa, pba, pcb }
    }

    #[test]
    fn plan_then_execute() {
        let Chain { mut schedule, a, b, c, pa, pba, pcb } = chain();

        let ab = schedule.combine(pa, pba, CombineOp::Mul, false).unwrap();
        let pb = schedule.project(ab, &[a.clone()], ProjectOp::Sum, true).unwrap();
        let bc = schedule.combine(pb, pcb, CombineOp::Mul, true).unwrap();
        let pc = schedule.project(bc, &[b.clone()], ProjectOp::Sum, true).unwrap();
        schedule.set_persistent(pc, true).unwrap();

        assert_eq!(4, schedule.len());
        assert_eq!(vec![0], schedule.available_operations());
        assert!(schedule.potential(pc).is_err());
        assert!(schedule.nb_operations().unwrap() > 0.0);

        // operation 2 waits for operation 1
        assert!(schedule.execute(2).is_err());

        schedule.execute_all().unwrap();
        assert!(schedule.available_operations().is_empty());

        // P(B) = [0.3 * 0.9 + 0.7 * 0.2, 0.3 * 0.1 + 0.7 * 0.8] = [0.41, 0.59]
        let expected_c = vec![0.41 * 0.9 + 0.59 * 0.2, 0.41 * 0.1 + 0.59 * 0.8];
        let result = schedule.take_potential(pc).unwrap();
        assert_eq!(&[c.clone()], result.variables());
        assert!((result.values()[0] - expected_c[0]).abs() < 1e-12);
        assert!((result.values()[1] - expected_c[1]).abs() < 1e-12);

        // the intermediate tables were freed, the sources not read with deletion are kept
        assert!(schedule.potential(ab).is_err());
        assert!(schedule.potential(bc).is_err());
        assert!(schedule.potential(pa).is_ok());
    }

    #[test]
    fn use_after_delete() {
        let Chain { mut schedule, pa, pba, pcb, .. } = chain();

        schedule.combine(pa, pba, CombineOp::Mul, true).unwrap();
        match schedule.combine(pa, pcb, CombineOp::Mul, false) {
            Err(Error::OperationNotAllowed(_)) => (),
            other => panic!("expected OperationNotAllowed, got {:?}", other)
        }
        assert!(schedule.delete(pba).is_err());
        assert_eq!(1, schedule.len());
    }

    #[test]
    fn deleter_waits_for_readers() {
        let Chain { mut schedule, pa, pba, pcb, .. } = chain();

        let r1 = schedule.combine(pa, pba, CombineOp::Mul, false).unwrap();
        schedule.combine(pa, pcb, CombineOp::Mul, false).unwrap();
        let del = schedule.delete(pa).unwrap();

        assert_eq!(&[0, 1].iter().cloned().collect::<BTreeSet<_>>(), schedule.dependencies(del).unwrap());
        assert_eq!(vec![0, 1], schedule.available_operations());

        schedule.execute_all().unwrap();
        assert!(schedule.potential(pa).is_err());
        assert!(schedule.potential(r1).is_ok());
    }

    #[test]
    fn persistent_sources() {
        let Chain { mut schedule, pa, pba, .. } = chain();
        schedule.set_persistent(pa, true).unwrap();

        assert!(schedule.delete(pa).is_err());
        schedule.combine(pa, pba, CombineOp::Mul, true).unwrap();
        schedule.execute_all().unwrap();
        assert!(schedule.potential(pa).is_ok());
        assert!(schedule.potential(pba).is_err());

        assert!(schedule.set_persistent(pba, true).is_err());
    }

    #[test]
    fn memory_and_undo() {
        let Chain { mut schedule, a, pa, pba, .. } = chain();

        let ab = schedule.combine(pa, pba, CombineOp::Mul, true).unwrap();
        schedule.project(ab, &[a.clone()], ProjectOp::Sum, true).unwrap();

        // sources hold 10 entries; the product adds 4 and frees 6; the projection adds 2 and frees 4
        assert_eq!((14.0, 6.0), schedule.memory_usage().unwrap());

        schedule.execute_all().unwrap();
        assert_eq!(1, schedule.undo_last().unwrap());
        assert!(schedule.potential(ab).is_ok());
        assert_eq!(0, schedule.undo_last().unwrap());
        assert!(schedule.potential(pa).is_ok());
        assert!(schedule.undo_last().is_err());
        assert_eq!(vec![0], schedule.available_operations());
    }

    #[test]
    fn store_results() {
        let Chain { mut schedule, pa, .. } = chain();
        let container: TableContainer = Arc::new(Mutex::new(Vec::new()));
        schedule.store(pa, container.clone()).unwrap();
        schedule.execute_all().unwrap();
        assert_eq!(1, container.lock().unwrap().len());
    }

    #[test]
    fn self_combination() {
        let Chain { mut schedule, a, pa, .. } = chain();

        let sq = schedule.combine(pa, pa, CombineOp::Mul, true).unwrap();
        schedule.set_persistent(sq, true).unwrap();
        schedule.execute_all().unwrap();

        let result = schedule.potential(sq).unwrap();
        assert_eq!(&[a.clone()], result.variables());
        assert!((result.values()[0] - 0.09).abs() < 1e-12);
        assert!((result.values()[1] - 0.49).abs() < 1e-12);
        assert!(schedule.potential(pa).is_err());

        // the argument is restored once
        assert_eq!(0, schedule.undo_last().unwrap());
        assert!(schedule.potential(pa).is_ok());
        assert!(schedule.potential(sq).is_err());
    }
}
