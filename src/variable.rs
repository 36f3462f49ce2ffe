//! Definition of the variable module
//!
//! A `Variable` represents a discrete random variable of a Probabilistic Graphical Model. The
//! metadata (name, description, labels) lives in an immutable `DiscreteVariable` shared by every
//! `Potential` and `Instantiation` that mentions the variable, so tables can be copied and
//! combined freely without dangling references.

use crate::util::{Error, Result};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Source of unique variable identifiers
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);


/// The metadata of a discrete random variable: its identity and its finite, ordered domain.
#[derive(Debug)]
pub struct DiscreteVariable {
    /// Unique identifier, assigned at construction
    id: usize,

    /// The name of the `Variable`
    name: String,

    /// An optional free-form description
    description: String,

    /// The labels of the domain, in order. The domain size is the number of labels.
    labels: Vec<String>
}


/// A cheap, clonable handle to a `DiscreteVariable`. Two handles are equal iff they were cloned
/// from the same construction.
#[derive(Clone, Debug)]
pub struct Variable(Arc<DiscreteVariable>);


impl Variable {

    /// Construct a new `Variable` over the given labels.
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if `labels` is empty
    /// * `Error::DuplicateElement` if a label appears twice
    pub fn new(name: &str, description: &str, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::InvalidArgument(format!("variable {} has an empty domain", name)));
        }

        for (i, l) in labels.iter().enumerate() {
            if labels[..i].contains(l) {
                return Err(Error::DuplicateElement(format!("label {} of variable {}", l, name)));
            }
        }

        Ok(Variable(Arc::new(DiscreteVariable {
            id: NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: String::from(name),
            description: String::from(description),
            labels
        })))
    }

    /// Construct a new binary `Variable` with labels `0` and `1`
    pub fn binary(name: &str) -> Self {
        Variable::discrete(name, 2)
    }

    /// Construct a new `Variable` with `count` integer labels `0..count`.
    ///
    /// # Panics
    /// if `count` is zero
    pub fn discrete(name: &str, count: usize) -> Self {
        assert!(count > 0, "a discrete variable needs at least one value");
        let labels = (0..count).map(|i| i.to_string()).collect();
        Variable::new(name, "", labels).expect("integer labels are distinct")
    }

    /// Construct a new `Variable` over the integer range `min..=max`
    ///
    /// # Errors
    /// * `Error::InvalidArgument` if `min > max`
    pub fn range(name: &str, min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidArgument(format!("empty range {}..={} for {}", min, max, name)));
        }
        Variable::new(name, "", (min..=max).map(|i| i.to_string()).collect())
    }

    /// Construct a new `Variable` with named values
    pub fn labelized(name: &str, labels: &[&str]) -> Result<Self> {
        Variable::new(name, "", labels.iter().map(|s| String::from(*s)).collect())
    }

    /// The unique identifier of the `Variable`
    pub fn id(&self) -> usize {
        self.0.id
    }

    /// Get the name of the `Variable`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }

    /// The number of values the `Variable` can take
    pub fn domain_size(&self) -> usize {
        self.0.labels.len()
    }

    /// The label of the `i`-th value.
    ///
    /// # Errors
    /// * `Error::OutOfBounds` if `i >= self.domain_size()`
    pub fn label(&self, i: usize) -> Result<&str> {
        self.0.labels.get(i).map(|s| s.as_str()).ok_or_else(|| self.out_of_bounds(i))
    }

    /// The index of the given label
    ///
    /// # Errors
    /// * `Error::NotFound` if the label is not part of the domain
    pub fn index(&self, label: &str) -> Result<usize> {
        self.0.labels.iter().position(|l| l == label).ok_or_else(|| {
            Error::NotFound(format!("label {} in variable {}", label, self.name()))
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.0.labels
    }

    /// Check that `val` is a valid value index.
    pub fn check_value(&self, val: usize) -> Result<()> {
        if val < self.domain_size() {
            Ok(())
        } else {
            Err(self.out_of_bounds(val))
        }
    }

    fn out_of_bounds(&self, val: usize) -> Error {
        Error::OutOfBounds {
            variable: self.name().to_string(),
            value: val,
            size: self.domain_size()
        }
    }
}


impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}


// Unit Tests for the Variable struct.
#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn binary() {
        let var = Variable::binary("Foo");
        assert_eq!(var.name(), "Foo");
        assert_eq!(2, var.domain_size());
        assert_eq!("1", var.label(1).unwrap());
        assert!(var.label(2).is_err());
    }

    #[test]
    fn identity() {
        let a = Variable::binary("A");
        let b = Variable::binary("A");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn enumerated() {
        let var = Variable::labelized("Foo", &["Probabilistic", "Graphical", "Models"]).unwrap();
        assert_eq!(3, var.domain_size());
        assert_eq!(1, var.index("Graphical").unwrap());
        assert!(var.index("FooBar").is_err());
    }

    #[test]
    fn invalid_domains() {
        assert!(Variable::labelized("Foo", &[]).is_err());
        assert!(Variable::labelized("Foo", &["a", "a"]).is_err());
        assert!(Variable::range("Foo", 3, 1).is_err());

        let r = Variable::range("R", -1, 1).unwrap();
        assert_eq!(vec!["-1", "0", "1"], r.labels());
    }

    #[test]
    #[should_panic]
    fn empty_discrete() {
        Variable::discrete("Foo", 0);
    }
}
