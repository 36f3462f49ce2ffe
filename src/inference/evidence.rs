//! The evidence an inference engine conditions on.
//!
//! Evidence on a node is a likelihood vector over the values of its variable. Hard evidence
//! clamps the node to a single value (a one-hot likelihood); soft evidence is any other
//! non-negative likelihood. A likelihood with a single non-zero entry is treated as hard evidence.

use crate::graph::NodeSet;
use crate::instantiation::Instantiation;
use crate::potential::Potential;
use crate::util::{Error, NodeId, Result};
use crate::variable::Variable;

use std::collections::BTreeMap;


/// What an update of the evidence changed, from the point of view of an inference engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvidenceChange {
    /// Nothing changed
    Unchanged,

    /// Some likelihoods changed, the set of hard evidence nodes did not
    Values,

    /// The set of hard evidence nodes changed
    Structure
}


/// A set of hard and soft findings, indexed by node.
#[derive(Clone, Debug, Default)]
pub struct Evidence {

    /// The likelihood of every node with evidence, as a table over its variable
    likelihoods: BTreeMap<NodeId, Potential>,

    /// The observed value of the nodes with hard evidence
    hard: BTreeMap<NodeId, usize>

}


impl Evidence {

    pub fn new() -> Self {
        Evidence::default()
    }

    /// Clamp `node`, whose variable is `var`, to the value `val`, replacing any previous
    /// evidence on the node.
    ///
    /// # Errors
    /// * `Error::OutOfBounds` if `val` is not a value of `var`
    pub fn add_hard(&mut self, node: NodeId, var: &Variable, val: usize) -> Result<EvidenceChange> {
        var.check_value(val)?;

        let mut likelihood = vec![0.0; var.domain_size()];
        likelihood[val] = 1.0;
        let table = Potential::from_values(vec![var.clone()], likelihood)?;

        let change = match self.hard.get(&node) {
            Some(&old) if old == val => EvidenceChange::Unchanged,
            Some(_) => EvidenceChange::Values,
            None => EvidenceChange::Structure
        };

        self.hard.insert(node, val);
        self.likelihoods.insert(node, table);
        Ok(change)
    }

    /// Set the likelihood of `node`, whose variable is `var`, replacing any previous evidence on
    /// the node. A likelihood with a single non-zero entry is stored as hard evidence.
    ///
    /// # Errors
    /// * `Error::SizeError` if the likelihood does not have one entry per value of `var`
    /// * `Error::InvalidArgument` if an entry is negative
    /// * `Error::IncompatibleEvidence` if every entry is zero
    pub fn add_likelihood(&mut self, node: NodeId, var: &Variable, likelihood: &[f64]) -> Result<EvidenceChange> {
        if likelihood.len() != var.domain_size() {
            return Err(Error::SizeError(format!(
                "likelihood of size {} for variable {} of domain size {}", likelihood.len(), var, var.domain_size()
            )));
        }
        if likelihood.iter().any(|&x| x < 0.0) {
            return Err(Error::InvalidArgument(format!("negative likelihood for variable {}", var)));
        }

        let non_zero: Vec<usize> = (0..likelihood.len()).filter(|&i| likelihood[i] != 0.0).collect();
        match non_zero.len() {
            0 => return Err(Error::IncompatibleEvidence(format!("null likelihood for variable {}", var))),
            1 => return self.add_hard(node, var, non_zero[0]),
            _ => ()
        }

        let table = Potential::from_values(vec![var.clone()], likelihood.to_vec())?;
        let change = if self.hard.remove(&node).is_some() {
            EvidenceChange::Structure
        } else if self.likelihoods.get(&node).map_or(false, |old| old.values() == table.values()) {
            EvidenceChange::Unchanged
        } else {
            EvidenceChange::Values
        };

        self.likelihoods.insert(node, table);
        Ok(change)
    }

    /// Remove the evidence on `node`. Removing missing evidence does nothing.
    pub fn erase(&mut self, node: NodeId) -> EvidenceChange {
        if self.likelihoods.remove(&node).is_none() {
            return EvidenceChange::Unchanged;
        }

        if self.hard.remove(&node).is_some() {
            EvidenceChange::Structure
        } else {
            EvidenceChange::Values
        }
    }

    pub fn erase_all(&mut self) -> EvidenceChange {
        let change = if !self.hard.is_empty() {
            EvidenceChange::Structure
        } else if !self.likelihoods.is_empty() {
            EvidenceChange::Values
        } else {
            EvidenceChange::Unchanged
        };

        self.likelihoods.clear();
        self.hard.clear();
        change
    }

    /// The number of nodes with evidence
    pub fn len(&self) -> usize {
        self.likelihoods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.likelihoods.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.likelihoods.contains_key(&node)
    }

    pub fn is_hard(&self, node: NodeId) -> bool {
        self.hard.contains_key(&node)
    }

    pub fn is_soft(&self, node: NodeId) -> bool {
        self.contains(node) && !self.is_hard(node)
    }

    /// The observed value of a node with hard evidence
    pub fn hard_value(&self, node: NodeId) -> Option<usize> {
        self.hard.get(&node).cloned()
    }

    /// The likelihood of a node with evidence
    pub fn likelihood(&self, node: NodeId) -> Option<&Potential> {
        self.likelihoods.get(&node)
    }

    /// Every node with evidence
    pub fn nodes(&self) -> NodeSet {
        self.likelihoods.keys().cloned().collect()
    }

    pub fn hard_nodes(&self) -> NodeSet {
        self.hard.keys().cloned().collect()
    }

    pub fn soft_nodes(&self) -> NodeSet {
        self.likelihoods.keys().filter(|n| !self.hard.contains_key(*n)).cloned().collect()
    }

    /// The values of the nodes with hard evidence
    pub fn hard_instantiation(&self) -> Result<Instantiation> {
        let mut inst = Instantiation::new();
        for (node, &val) in self.hard.iter() {
            if let Some(var) = self.likelihoods.get(node).and_then(|l| l.variables().first()) {
                inst.add(var)?;
                inst.set(var, val)?;
            }
        }
        Ok(inst)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_and_soft() {
        let a = Variable::discrete("A", 3);
        let b = Variable::binary("B");
        let mut ev = Evidence::new();

        assert_eq!(EvidenceChange::Structure, ev.add_hard(0, &a, 2).unwrap());
        assert_eq!(EvidenceChange::Unchanged, ev.add_hard(0, &a, 2).unwrap());
        assert_eq!(EvidenceChange::Values, ev.add_hard(0, &a, 1).unwrap());
        assert!(ev.add_hard(0, &a, 3).is_err());

        assert_eq!(EvidenceChange::Values, ev.add_likelihood(1, &b, &[0.3, 0.9]).unwrap());
        assert!(ev.is_soft(1));
        assert_eq!(&[0.3, 0.9], ev.likelihood(1).unwrap().values());

        // a soft finding replacing a hard one changes the hard set
        assert_eq!(EvidenceChange::Structure, ev.add_likelihood(0, &a, &[0.1, 0.2, 0.7]).unwrap());
        assert!(ev.hard_nodes().is_empty());
        assert_eq!(2, ev.soft_nodes().len());
    }

    #[test]
    fn single_non_zero_is_hard() {
        let a = Variable::discrete("A", 3);
        let mut ev = Evidence::new();

        assert_eq!(EvidenceChange::Structure, ev.add_likelihood(4, &a, &[0.0, 0.5, 0.0]).unwrap());
        assert!(ev.is_hard(4));
        assert_eq!(Some(1), ev.hard_value(4));
        assert_eq!(&[0.0, 1.0, 0.0], ev.likelihood(4).unwrap().values());

        let inst = ev.hard_instantiation().unwrap();
        assert_eq!(1, inst.val(&a).unwrap());
    }

    #[test]
    fn invalid_likelihoods() {
        let a = Variable::binary("A");
        let mut ev = Evidence::new();

        match ev.add_likelihood(0, &a, &[0.0, 0.0]) {
            Err(Error::IncompatibleEvidence(_)) => (),
            other => panic!("unexpected {:?}", other)
        }
        assert!(ev.add_likelihood(0, &a, &[0.5]).is_err());
        assert!(ev.add_likelihood(0, &a, &[-0.5, 1.0]).is_err());
        assert!(ev.is_empty());
    }

    #[test]
    fn erasing() {
        let a = Variable::binary("A");
        let b = Variable::binary("B");
        let mut ev = Evidence::new();
        ev.add_hard(0, &a, 1).unwrap();
        ev.add_likelihood(1, &b, &[0.2, 0.4]).unwrap();

        assert_eq!(EvidenceChange::Unchanged, ev.erase(7));
        assert_eq!(EvidenceChange::Values, ev.erase(1));
        assert_eq!(EvidenceChange::Structure, ev.erase_all());
        assert_eq!(EvidenceChange::Unchanged, ev.erase_all());
    }
}
