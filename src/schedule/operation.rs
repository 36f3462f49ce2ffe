//! The operations a `Schedule` is made of.
//!
//! An operation reads input slots of a `MultiDimArena` and writes output slots. Its result slots
//! exist, abstract, from the moment the operation is created, so planners can reason about
//! variables and memory before anything runs. `execute` on an executed operation does nothing.

use crate::potential::{CombineOp, Potential, ProjectOp};
use crate::schedule::multidim::{estimated_size, MultiDimArena, MultiDimId};
use crate::util::{Error, Result};
use crate::variable::Variable;

use itertools::Itertools;
use log::trace;

use std::fmt;
use std::sync::{Arc, Mutex};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationType {
    Combine,
    Project,
    Delete,
    Store
}


/// The interface shared by all schedule operations.
pub trait ScheduleOperator: fmt::Debug + Send {

    fn op_type(&self) -> OperationType;

    /// The slots read by the operation
    fn args(&self) -> &[MultiDimId];

    /// The slots written by the operation
    fn results(&self) -> &[MultiDimId];

    /// Whether executing the operation frees (some of) its arguments
    fn imply_deletion(&self) -> bool;

    fn is_executed(&self) -> bool;

    /// Perform the operation. Does nothing if it has already been executed.
    ///
    /// # Errors
    /// * `Error::UndefinedElement` if an argument is not concrete
    fn execute(&mut self, arena: &mut MultiDimArena) -> Result<()>;

    /// Revert an execution: the results become abstract again and freed arguments are restored.
    ///
    /// # Errors
    /// * `Error::OperationNotAllowed` if the operation has not been executed
    fn undo(&mut self, arena: &mut MultiDimArena) -> Result<()>;

    /// Replace the arguments of a pending operation. The new arguments are validated before any
    /// change is made.
    ///
    /// # Errors
    /// * `Error::OperationNotAllowed` if the operation has already been executed
    /// * `Error::InvalidArgumentsNumber` if the arity differs
    /// * `Error::InvalidArgument` if the new arguments range over incompatible variables
    fn update_args(&mut self, arena: &MultiDimArena, args: &[MultiDimId]) -> Result<()>;

    /// An estimate of the number of elementary operations performed
    fn nb_operations(&self, arena: &MultiDimArena) -> Result<f64>;

    /// An estimate of the memory needed: the peak number of entries allocated during the
    /// execution, and the variation of the number of entries held once it is over.
    fn memory_usage(&self, arena: &MultiDimArena) -> Result<(f64, f64)>;
}


fn check_arity(args: &[MultiDimId], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::InvalidArgumentsNumber { expected, found: args.len() });
    }
    Ok(())
}


fn not_after_execution(executed: bool) -> Result<()> {
    if executed {
        return Err(Error::OperationNotAllowed(String::from("the operation has already been executed")));
    }
    Ok(())
}


fn same_set(a: &[Variable], b: &[Variable]) -> bool {
    a.len() == b.len() && a.iter().all(|v| b.contains(v))
}


fn union(a: &[Variable], b: &[Variable]) -> Vec<Variable> {
    let mut vars = a.to_vec();
    vars.extend(b.iter().filter(|v| !a.contains(v)).cloned());
    vars
}


/// Free the non-persistent arguments of an operation, keeping their tables for `undo`.
/// An argument given twice is freed once.
fn delete_args(arena: &mut MultiDimArena, args: &[MultiDimId]) -> Result<Vec<(MultiDimId, Option<Potential>)>> {
    let mut stash = Vec::new();
    for &id in args.iter().unique() {
        if !arena.is_persistent(id)? {
            let content = arena.delete(id)?;
            stash.push((id, content));
        }
    }
    Ok(stash)
}


fn deleted_size(arena: &MultiDimArena, args: &[MultiDimId]) -> Result<f64> {
    let mut size = 0.0;
    for &id in args.iter().unique() {
        let slot = arena.get(id)?;
        if !slot.is_persistent() {
            size += slot.domain_size();
        }
    }
    Ok(size)
}


/// The combination of two tables with a binary operator
#[derive(Debug)]
pub struct ScheduleCombination {
    args: [MultiDimId; 2],
    result: [MultiDimId; 1],
    op: CombineOp,
    imply_deletion: bool,
    executed: bool,
    stash: Vec<(MultiDimId, Option<Potential>)>
}


impl ScheduleCombination {

    /// Plan the combination of `a` and `b`, creating its abstract result slot.
    pub fn new(arena: &mut MultiDimArena, a: MultiDimId, b: MultiDimId, op: CombineOp, imply_deletion: bool) -> Result<Self> {
        let vars = union(arena.variables(a)?, arena.variables(b)?);
        let result = arena.insert_abstract(vars);
        Ok(ScheduleCombination { args: [a, b], result: [result], op, imply_deletion, executed: false, stash: Vec::new() })
    }

    pub fn op(&self) -> CombineOp {
        self.op
    }
}


impl ScheduleOperator for ScheduleCombination {

    fn op_type(&self) -> OperationType {
        OperationType::Combine
    }

    fn args(&self) -> &[MultiDimId] {
        &self.args
    }

    fn results(&self) -> &[MultiDimId] {
        &self.result
    }

    fn imply_deletion(&self) -> bool {
        self.imply_deletion
    }

    fn is_executed(&self) -> bool {
        self.executed
    }

    fn execute(&mut self, arena: &mut MultiDimArena) -> Result<()> {
        if self.executed {
            return Ok(());
        }

        let res = arena.potential(self.args[0])?.combine(arena.potential(self.args[1])?, self.op)?;
        arena.set_potential(self.result[0], res)?;
        if self.imply_deletion {
            self.stash = delete_args(arena, &self.args)?;
        }

        trace!("combined tables {} and {} into {} ({:?})", self.args[0], self.args[1], self.result[0], self.op);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, arena: &mut MultiDimArena) -> Result<()> {
        if !self.executed {
            return Err(Error::OperationNotAllowed(String::from("undo of a combination that was not executed")));
        }

        for (id, content) in self.stash.drain(..) {
            arena.restore(id, content)?;
        }
        arena.clear_potential(self.result[0])?;
        self.executed = false;
        Ok(())
    }

    fn update_args(&mut self, arena: &MultiDimArena, args: &[MultiDimId]) -> Result<()> {
        not_after_execution(self.executed)?;
        check_arity(args, 2)?;

        let vars = union(arena.variables(args[0])?, arena.variables(args[1])?);
        if !same_set(&vars, arena.variables(self.result[0])?) {
            return Err(Error::InvalidArgument(String::from("the new arguments do not range over the variables of the result")));
        }

        self.args = [args[0], args[1]];
        Ok(())
    }

    fn nb_operations(&self, arena: &MultiDimArena) -> Result<f64> {
        Ok(arena.get(self.result[0])?.domain_size())
    }

    fn memory_usage(&self, arena: &MultiDimArena) -> Result<(f64, f64)> {
        let size = arena.get(self.result[0])?.domain_size();
        let freed = if self.imply_deletion { deleted_size(arena, &self.args)? } else { 0.0 };
        Ok((size, size - freed))
    }
}


/// The projection of a table: some variables are removed with a reduction operator
#[derive(Debug)]
pub struct ScheduleProjection {
    args: [MultiDimId; 1],
    result: [MultiDimId; 1],
    del_vars: Vec<Variable>,
    op: ProjectOp,
    imply_deletion: bool,
    executed: bool,
    stash: Vec<(MultiDimId, Option<Potential>)>
}


impl ScheduleProjection {

    /// Plan the projection of `arg`, creating its abstract result slot.
    pub fn new(arena: &mut MultiDimArena, arg: MultiDimId, del_vars: &[Variable], op: ProjectOp, imply_deletion: bool) -> Result<Self> {
        let vars: Vec<Variable> = arena.variables(arg)?.iter().filter(|v| !del_vars.contains(v)).cloned().collect();
        let result = arena.insert_abstract(vars);
        Ok(ScheduleProjection {
            args: [arg],
            result: [result],
            del_vars: del_vars.to_vec(),
            op,
            imply_deletion,
            executed: false,
            stash: Vec::new()
        })
    }

    pub fn del_vars(&self) -> &[Variable] {
        &self.del_vars
    }

    pub fn op(&self) -> ProjectOp {
        self.op
    }
}


impl ScheduleOperator for ScheduleProjection {

    fn op_type(&self) -> OperationType {
        OperationType::Project
    }

    fn args(&self) -> &[MultiDimId] {
        &self.args
    }

    fn results(&self) -> &[MultiDimId] {
        &self.result
    }

    fn imply_deletion(&self) -> bool {
        self.imply_deletion
    }

    fn is_executed(&self) -> bool {
        self.executed
    }

    fn execute(&mut self, arena: &mut MultiDimArena) -> Result<()> {
        if self.executed {
            return Ok(());
        }

        let res = arena.potential(self.args[0])?.project(&self.del_vars, self.op);
        arena.set_potential(self.result[0], res)?;
        if self.imply_deletion {
            self.stash = delete_args(arena, &self.args)?;
        }

        trace!("projected table {} into {} ({:?})", self.args[0], self.result[0], self.op);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, arena: &mut MultiDimArena) -> Result<()> {
        if !self.executed {
            return Err(Error::OperationNotAllowed(String::from("undo of a projection that was not executed")));
        }

        for (id, content) in self.stash.drain(..) {
            arena.restore(id, content)?;
        }
        arena.clear_potential(self.result[0])?;
        self.executed = false;
        Ok(())
    }

    fn update_args(&mut self, arena: &MultiDimArena, args: &[MultiDimId]) -> Result<()> {
        not_after_execution(self.executed)?;
        check_arity(args, 1)?;

        if !same_set(arena.variables(args[0])?, arena.variables(self.args[0])?) {
            return Err(Error::InvalidArgument(String::from("the new argument does not range over the projected variables")));
        }

        self.args = [args[0]];
        Ok(())
    }

    fn nb_operations(&self, arena: &MultiDimArena) -> Result<f64> {
        Ok(arena.get(self.args[0])?.domain_size())
    }

    fn memory_usage(&self, arena: &MultiDimArena) -> Result<(f64, f64)> {
        let size = arena.get(self.result[0])?.domain_size();
        let freed = if self.imply_deletion { deleted_size(arena, &self.args)? } else { 0.0 };
        Ok((size, size - freed))
    }
}


/// The explicit deletion of a table
#[derive(Debug)]
pub struct ScheduleDeletion {
    args: [MultiDimId; 1],
    executed: bool,
    stash: Option<Potential>
}


impl ScheduleDeletion {

    /// # Errors
    /// * `Error::OperationNotAllowed` if the slot is persistent
    pub fn new(arena: &MultiDimArena, arg: MultiDimId) -> Result<Self> {
        if arena.is_persistent(arg)? {
            return Err(Error::OperationNotAllowed(format!("schedule table {} is persistent", arg)));
        }
        Ok(ScheduleDeletion { args: [arg], executed: false, stash: None })
    }
}


impl ScheduleOperator for ScheduleDeletion {

    fn op_type(&self) -> OperationType {
        OperationType::Delete
    }

    fn args(&self) -> &[MultiDimId] {
        &self.args
    }

    fn results(&self) -> &[MultiDimId] {
        &[]
    }

    fn imply_deletion(&self) -> bool {
        true
    }

    fn is_executed(&self) -> bool {
        self.executed
    }

    fn execute(&mut self, arena: &mut MultiDimArena) -> Result<()> {
        if self.executed {
            return Ok(());
        }

        self.stash = arena.delete(self.args[0])?;
        trace!("deleted table {}", self.args[0]);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, arena: &mut MultiDimArena) -> Result<()> {
        if !self.executed {
            return Err(Error::OperationNotAllowed(String::from("undo of a deletion that was not executed")));
        }

        arena.restore(self.args[0], self.stash.take())?;
        self.executed = false;
        Ok(())
    }

    fn update_args(&mut self, arena: &MultiDimArena, args: &[MultiDimId]) -> Result<()> {
        not_after_execution(self.executed)?;
        check_arity(args, 1)?;
        if arena.is_persistent(args[0])? {
            return Err(Error::InvalidArgument(format!("schedule table {} is persistent", args[0])));
        }

        self.args = [args[0]];
        Ok(())
    }

    fn nb_operations(&self, _arena: &MultiDimArena) -> Result<f64> {
        Ok(1.0)
    }

    fn memory_usage(&self, arena: &MultiDimArena) -> Result<(f64, f64)> {
        Ok((0.0, -arena.get(self.args[0])?.domain_size()))
    }
}


/// A container receiving the tables stored by `ScheduleStorage` operations
pub type TableContainer = Arc<Mutex<Vec<Potential>>>;


/// Copy a table into a container that outlives the schedule
#[derive(Debug)]
pub struct ScheduleStorage {
    args: [MultiDimId; 1],
    container: TableContainer,
    executed: bool,

    /// Position of the stored copy in the container
    position: Option<usize>
}


impl ScheduleStorage {

    pub fn new(arg: MultiDimId, container: TableContainer) -> Self {
        ScheduleStorage { args: [arg], container, executed: false, position: None }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Potential>>> {
        self.container.lock().map_err(|e| Error::OperationNotAllowed(format!("storage container poisoned: {}", e)))
    }
}


impl ScheduleOperator for ScheduleStorage {

    fn op_type(&self) -> OperationType {
        OperationType::Store
    }

    fn args(&self) -> &[MultiDimId] {
        &self.args
    }

    fn results(&self) -> &[MultiDimId] {
        &[]
    }

    fn imply_deletion(&self) -> bool {
        false
    }

    fn is_executed(&self) -> bool {
        self.executed
    }

    fn execute(&mut self, arena: &mut MultiDimArena) -> Result<()> {
        if self.executed {
            return Ok(());
        }

        let table = arena.potential(self.args[0])?.clone();
        let position = {
            let mut container = self.lock()?;
            container.push(table);
            container.len() - 1
        };

        trace!("stored table {}", self.args[0]);
        self.position = Some(position);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, _arena: &mut MultiDimArena) -> Result<()> {
        if !self.executed {
            return Err(Error::OperationNotAllowed(String::from("undo of a storage that was not executed")));
        }

        if let Some(position) = self.position.take() {
            let mut container = self.lock()?;
            if position < container.len() {
                container.remove(position);
            }
        }
        self.executed = false;
        Ok(())
    }

    fn update_args(&mut self, _arena: &MultiDimArena, args: &[MultiDimId]) -> Result<()> {
        not_after_execution(self.executed)?;
        check_arity(args, 1)?;
        self.args = [args[0]];
        Ok(())
    }

    fn nb_operations(&self, _arena: &MultiDimArena) -> Result<f64> {
        Ok(1.0)
    }

    fn memory_usage(&self, _arena: &MultiDimArena) -> Result<(f64, f64)> {
        Ok((0.0, 0.0))
    }
}
