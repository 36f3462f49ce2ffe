//! bnet: probabilistic graphical models over discrete variables.
//!
//! The crate is organized bottom-up: discrete `Variable`s and their `Instantiation`s, the
//! `Potential` table algebra, the graph structures and their triangulation into junction trees,
//! the `Schedule` that plans table operations before running them, and the `BayesNet` model with
//! its exact inference engines. Parameter estimation, forward sampling and the graph-edit
//! constraints of structure learning sit on top.

pub mod util;
pub mod variable;
pub mod instantiation;
pub mod potential;
pub mod init;
pub mod graph;
pub mod triangulation;
pub mod schedule;
pub mod combination;
pub mod parallel;
pub mod model;
pub mod inference;
pub mod learning;
pub mod estimators;
pub mod samplers;

pub use crate::util::{Error, NodeId, Result};
pub use crate::variable::Variable;
pub use crate::instantiation::Instantiation;
pub use crate::potential::{CombineOp, Potential, ProjectOp};
pub use crate::model::{BayesNet, BayesNetBuilder};
