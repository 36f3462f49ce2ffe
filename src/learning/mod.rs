//! The graph-edit boundary used by structure learning.
//!
//! A search procedure explores DAGs by elementary changes: adding, deleting or reversing an arc.
//! This module decides which changes are legal, with pure predicates evaluated before anything
//! is mutated, and enumerates the legal candidates of a graph. Scoring the candidates is left to
//! the caller.

pub mod constraints;
pub mod generator;

pub use self::constraints::StructuralConstraintDag;
pub use self::generator::{GeneratorConfig, GraphChangesGenerator};

use crate::util::NodeId;

use std::fmt;


/// An elementary edit of a DAG
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphChange {
    /// Add the arc `tail -> head`
    ArcAddition(NodeId, NodeId),

    /// Remove the arc `tail -> head`
    ArcDeletion(NodeId, NodeId),

    /// Replace the arc `tail -> head` by `head -> tail`
    ArcReversal(NodeId, NodeId)
}


impl GraphChange {

    /// The tail of the arc the change is about
    pub fn tail(&self) -> NodeId {
        match *self {
            GraphChange::ArcAddition(t, _) | GraphChange::ArcDeletion(t, _) | GraphChange::ArcReversal(t, _) => t
        }
    }

    pub fn head(&self) -> NodeId {
        match *self {
            GraphChange::ArcAddition(_, h) | GraphChange::ArcDeletion(_, h) | GraphChange::ArcReversal(_, h) => h
        }
    }
}


impl fmt::Display for GraphChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GraphChange::ArcAddition(t, h) => write!(f, "+ {} -> {}", t, h),
            GraphChange::ArcDeletion(t, h) => write!(f, "- {} -> {}", t, h),
            GraphChange::ArcReversal(t, h) => write!(f, "~ {} -> {}", t, h)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremities() {
        let change = GraphChange::ArcReversal(3, 1);
        assert_eq!(3, change.tail());
        assert_eq!(1, change.head());
        assert_eq!("~ 3 -> 1", change.to_string());
        assert!(GraphChange::ArcAddition(5, 0) < GraphChange::ArcDeletion(0, 1));
    }
}
