//! Defines the `Error` type for the bnet library, along with a few numeric helpers shared by the
//! table algebra and the inference engines.

use thiserror::Error;

use std::result;

pub type Result<T> = result::Result<T, Error>;

/// Identifier of a node in a graph (and of the corresponding variable in a `BayesNet`).
pub type NodeId = usize;

/// Two table entries closer than this are considered equal.
pub const EQUALITY_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {

    /// A query referenced an element that has not been defined (e.g. a non-target node, a
    /// junction tree requested before any graph was attached)
    #[error("undefined element: {0}")]
    UndefinedElement(String),

    /// A lookup did not find what it was asked for
    #[error("not found: {0}")]
    NotFound(String),

    /// Represents an argument that did not satisfy the constraints of an operation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation received the wrong number of operands
    #[error("invalid arguments number: expected {expected}, found {found}")]
    InvalidArgumentsNumber { expected: usize, found: usize },

    /// Sizes of two structures do not match
    #[error("size error: {0}")]
    SizeError(String),

    /// Represents an element that was present multiple times where it should only have been
    /// present once
    #[error("duplicate element: {0}")]
    DuplicateElement(String),

    /// A node id outside of the graph
    #[error("invalid node {0}")]
    InvalidNode(usize),

    /// An arc that does not belong to the graph
    #[error("invalid arc {0} -> {1}")]
    InvalidArc(usize, usize),

    /// Adding the arc would create a directed cycle
    #[error("arc {0} -> {1} would create a directed cycle")]
    DirectedCycle(usize, usize),

    /// The operation is not allowed in the current state
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),

    /// Exactly what it sounds like
    #[error("encountered division by zero")]
    DivideByZero,

    /// Represents an incomplete instantiation where a complete one was required. Holds the names
    /// of the missing variables.
    #[error("missing values for variables {0:?}")]
    IncompleteInstantiation(Vec<String>),

    /// A value index outside of the domain of a variable
    #[error("value {value} is out of bounds for variable {variable} (domain size {size})")]
    OutOfBounds { variable: String, value: usize, size: usize },

    /// Evidence that contradicts itself or the model (e.g. an all-zero likelihood)
    #[error("incompatible evidence: {0}")]
    IncompatibleEvidence(String),

    /// A parent configuration never occurs in the database and no apriori fills the gap
    #[error("no observation for the parents configuration of {0}")]
    ZeroCounts(String),

    /// The apriori weight must be strictly positive
    #[error("the apriori weight must be positive, got {0}")]
    NonPositiveApriori(f64),

    /// Represents an error where there was a parent variable expected, but not found
    #[error("missing parent {0}")]
    MissingParent(String),

    /// Represents the situation when a CPT was expected but the table is not normalized
    #[error("{0} does not hold a conditional probability table")]
    NotACpt(String),

    /// The worker pool could not be built
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// A worker panicked; the payload message is kept
    #[error("worker panicked: {0}")]
    WorkerPanic(String),

}


/// Check whether two floats are equal within `EQUALITY_TOLERANCE`.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EQUALITY_TOLERANCE
}


/// `x * log2(x)`, with the usual convention `0 * log2(0) = 0`.
pub fn xlog2x(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x * x.log2()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xlog2x_convention() {
        assert_eq!(0.0, xlog2x(0.0));
        assert!(approx_eq(-0.5, xlog2x(0.5)));
        assert_eq!(0.0, xlog2x(1.0));
    }

    #[test]
    fn messages_carry_context() {
        let e = Error::DirectedCycle(3, 1);
        assert_eq!("arc 3 -> 1 would create a directed cycle", e.to_string());

        let e = Error::InvalidArgumentsNumber { expected: 2, found: 1 };
        assert!(e.to_string().contains("expected 2"));
    }
}
