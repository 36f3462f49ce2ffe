//! Handles on the tables manipulated by a schedule.
//!
//! A `ScheduleMultiDim` is a slot of a `MultiDimArena`. It is *abstract* while the table it stands
//! for has not been computed (only its variables and an estimated size are known), *concrete*
//! once a `Potential` is stored in it, and *deleted* once its table has been freed. A slot is
//! deleted at most once.

use crate::potential::Potential;
use crate::util::{Error, Result};
use crate::variable::Variable;

/// Index of a slot in a `MultiDimArena`
pub type MultiDimId = usize;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Abstract,
    Concrete,
    Deleted
}


#[derive(Clone, Debug)]
pub struct ScheduleMultiDim {
    id: MultiDimId,

    variables: Vec<Variable>,

    /// The product of the domain sizes, kept as a float since it may overflow for planning
    domain_size: f64,

    content: Option<Potential>,

    persistent: bool,

    deleted: bool
}


impl ScheduleMultiDim {

    pub fn id(&self) -> MultiDimId {
        self.id
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The estimated number of entries of the table
    pub fn domain_size(&self) -> f64 {
        self.domain_size
    }

    pub fn state(&self) -> SlotState {
        if self.deleted {
            SlotState::Deleted
        } else if self.content.is_some() {
            SlotState::Concrete
        } else {
            SlotState::Abstract
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.state() == SlotState::Abstract
    }

    /// A persistent table outlives the schedule operations that read it: implied deletions skip
    /// it and it can be extracted from the arena once the schedule has run.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn potential(&self) -> Option<&Potential> {
        self.content.as_ref()
    }
}


/// The product of the domain sizes of `vars`, as a float
pub fn estimated_size(vars: &[Variable]) -> f64 {
    vars.iter().map(|v| v.domain_size() as f64).product()
}


/// Storage for the slots of a schedule, addressed by `MultiDimId`.
#[derive(Clone, Debug, Default)]
pub struct MultiDimArena {
    slots: Vec<ScheduleMultiDim>
}


impl MultiDimArena {

    pub fn new() -> Self {
        MultiDimArena { slots: Vec::new() }
    }

    /// Create an abstract slot for a table over `variables`
    pub fn insert_abstract(&mut self, variables: Vec<Variable>) -> MultiDimId {
        let id = self.slots.len();
        let domain_size = estimated_size(&variables);
        self.slots.push(ScheduleMultiDim { id, variables, domain_size, content: None, persistent: false, deleted: false });
        id
    }

    /// Create a concrete slot holding `potential`
    pub fn insert_concrete(&mut self, potential: Potential, persistent: bool) -> MultiDimId {
        let id = self.insert_abstract(potential.variables().to_vec());
        self.slots[id].content = Some(potential);
        self.slots[id].persistent = persistent;
        id
    }

    /// The number of slots ever created
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// # Errors
    /// * `Error::NotFound` if there is no such slot
    pub fn get(&self, id: MultiDimId) -> Result<&ScheduleMultiDim> {
        self.slots.get(id).ok_or_else(|| Error::NotFound(format!("schedule table {}", id)))
    }

    fn get_mut(&mut self, id: MultiDimId) -> Result<&mut ScheduleMultiDim> {
        self.slots.get_mut(id).ok_or_else(|| Error::NotFound(format!("schedule table {}", id)))
    }

    pub fn variables(&self, id: MultiDimId) -> Result<&[Variable]> {
        Ok(self.get(id)?.variables())
    }

    /// The table of a concrete slot.
    ///
    /// # Errors
    /// * `Error::NotFound` if there is no such slot
    /// * `Error::UndefinedElement` if the slot is abstract or deleted
    pub fn potential(&self, id: MultiDimId) -> Result<&Potential> {
        let slot = self.get(id)?;
        slot.content.as_ref().ok_or_else(|| {
            Error::UndefinedElement(format!("schedule table {} is {:?}", id, slot.state()))
        })
    }

    /// Store the computed table of a slot, making it concrete.
    ///
    /// # Errors
    /// * `Error::OperationNotAllowed` if the slot has been deleted
    /// * `Error::InvalidArgument` if the table does not range over the variables of the slot
    pub fn set_potential(&mut self, id: MultiDimId, potential: Potential) -> Result<()> {
        let slot = self.get_mut(id)?;
        if slot.deleted {
            return Err(Error::OperationNotAllowed(format!("schedule table {} was deleted", id)));
        }
        if !(potential.nb_dims() == slot.variables.len() && slot.variables.iter().all(|v| potential.contains(v))) {
            return Err(Error::InvalidArgument(format!("table stored in schedule table {} has the wrong variables", id)));
        }
        slot.content = Some(potential);
        Ok(())
    }

    /// Turn a concrete slot back into an abstract one, returning its table
    pub fn clear_potential(&mut self, id: MultiDimId) -> Result<Option<Potential>> {
        Ok(self.get_mut(id)?.content.take())
    }

    pub fn set_persistent(&mut self, id: MultiDimId, persistent: bool) -> Result<()> {
        self.get_mut(id)?.persistent = persistent;
        Ok(())
    }

    pub fn is_persistent(&self, id: MultiDimId) -> Result<bool> {
        Ok(self.get(id)?.persistent)
    }

    /// Free the table of a slot. A slot can only be deleted once.
    ///
    /// # Returns
    /// the table that was freed, if the slot was concrete
    ///
    /// # Errors
    /// * `Error::OperationNotAllowed` if the slot is persistent or already deleted
    pub fn delete(&mut self, id: MultiDimId) -> Result<Option<Potential>> {
        let slot = self.get_mut(id)?;
        if slot.persistent {
            return Err(Error::OperationNotAllowed(format!("schedule table {} is persistent", id)));
        }
        if slot.deleted {
            return Err(Error::OperationNotAllowed(format!("schedule table {} is already deleted", id)));
        }
        slot.deleted = true;
        Ok(slot.content.take())
    }

    /// Revert a deletion, putting back the freed table
    pub fn restore(&mut self, id: MultiDimId, content: Option<Potential>) -> Result<()> {
        let slot = self.get_mut(id)?;
        slot.deleted = false;
        slot.content = content;
        Ok(())
    }

    /// Move the table out of a persistent slot, leaving it abstract.
    ///
    /// # Errors
    /// * `Error::OperationNotAllowed` if the slot is not persistent
    /// * `Error::UndefinedElement` if the slot holds no table
    pub fn take_potential(&mut self, id: MultiDimId) -> Result<Potential> {
        let slot = self.get_mut(id)?;
        if !slot.persistent {
            return Err(Error::OperationNotAllowed(format!("schedule table {} is not persistent", id)));
        }
        slot.content.take().ok_or_else(|| Error::UndefinedElement(format!("schedule table {} holds no table", id)))
    }

    /// The number of entries held by the concrete slots
    pub fn memory_usage(&self) -> f64 {
        self.slots.iter().filter(|s| s.content.is_some()).map(|s| s.domain_size).sum()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let a = Variable::binary("A");
        let b = Variable::discrete("B", 3);
        let mut arena = MultiDimArena::new();

        let id = arena.insert_abstract(vec![a.clone(), b.clone()]);
        assert_eq!(SlotState::Abstract, arena.get(id).unwrap().state());
        assert_eq!(6.0, arena.get(id).unwrap().domain_size());
        assert!(arena.potential(id).is_err());

        let wrong = Potential::filled(vec![a.clone()], 1.0).unwrap();
        assert!(arena.set_potential(id, wrong).is_err());

        let p = Potential::filled(vec![b.clone(), a.clone()], 1.0).unwrap();
        arena.set_potential(id, p).unwrap();
        assert_eq!(SlotState::Concrete, arena.get(id).unwrap().state());
        assert_eq!(6.0, arena.memory_usage());

        assert!(arena.delete(id).unwrap().is_some());
        assert_eq!(SlotState::Deleted, arena.get(id).unwrap().state());
        assert!(arena.delete(id).is_err());
        assert_eq!(0.0, arena.memory_usage());
    }

    #[test]
    fn persistent_slots() {
        let a = Variable::binary("A");
        let mut arena = MultiDimArena::new();
        let id = arena.insert_concrete(Potential::filled(vec![a.clone()], 0.5).unwrap(), true);

        assert!(arena.delete(id).is_err());
        let p = arena.take_potential(id).unwrap();
        assert_eq!(1.0, p.sum());
        assert!(arena.take_potential(id).is_err());

        let other = arena.insert_concrete(Potential::new(), false);
        assert!(arena.take_potential(other).is_err());
        assert!(arena.get(42).is_err());
    }
}
