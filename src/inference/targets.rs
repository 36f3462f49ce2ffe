//! Tracking of the nodes whose posterior an inference engine must compute.

use crate::graph::NodeSet;
use crate::util::{Error, NodeId, Result};


/// The marginal targets of an inference engine.
///
/// Every node of the network is a target until the targets are edited: the first `add_target`
/// narrows the set to the added node, `erase_all_targets` empties it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarginalTargets {

    /// The nodes of the network
    nodes: NodeSet,

    targets: NodeSet,

    /// Whether every node is implicitly a target
    all_by_default: bool

}


impl MarginalTargets {

    /// Targets over the nodes `nodes`, all of them targeted by default
    pub fn new(nodes: NodeSet) -> Self {
        MarginalTargets { nodes, targets: NodeSet::new(), all_by_default: true }
    }

    pub fn is_target(&self, node: NodeId) -> bool {
        if self.all_by_default {
            self.nodes.contains(&node)
        } else {
            self.targets.contains(&node)
        }
    }

    /// Whether the targets are still the default ones
    pub fn is_default(&self) -> bool {
        self.all_by_default
    }

    pub fn targets(&self) -> &NodeSet {
        if self.all_by_default {
            &self.nodes
        } else {
            &self.targets
        }
    }

    pub fn nb_targets(&self) -> usize {
        self.targets().len()
    }

    /// Add `node` to the targets.
    ///
    /// # Returns
    /// whether the set of targets changed
    ///
    /// # Errors
    /// * `Error::InvalidNode` if `node` is not in the network
    pub fn add_target(&mut self, node: NodeId) -> Result<bool> {
        if !self.nodes.contains(&node) {
            return Err(Error::InvalidNode(node));
        }

        if self.all_by_default {
            self.all_by_default = false;
            self.targets.clear();
            self.targets.insert(node);
            return Ok(true);
        }

        Ok(self.targets.insert(node))
    }

    /// Remove `node` from the targets. Removing a node which is not a target does nothing.
    ///
    /// # Returns
    /// whether the set of targets changed
    pub fn erase_target(&mut self, node: NodeId) -> bool {
        if self.all_by_default {
            self.all_by_default = false;
            self.targets = self.nodes.clone();
        }
        self.targets.remove(&node)
    }

    /// Target every node of the network
    pub fn add_all_targets(&mut self) -> bool {
        let changed = !self.all_by_default && self.targets != self.nodes;
        self.all_by_default = false;
        self.targets = self.nodes.clone();
        changed
    }

    pub fn erase_all_targets(&mut self) -> bool {
        let changed = self.nb_targets() > 0;
        self.all_by_default = false;
        self.targets.clear();
        changed
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::graph::node_set;

    #[test]
    fn default_targets() {
        let mut t = MarginalTargets::new(node_set(vec![0, 1, 2]));
        assert!(t.is_default());
        assert_eq!(3, t.nb_targets());
        assert!(t.is_target(1));
        assert!(!t.is_target(3));

        // the first addition narrows the targets
        assert!(t.add_target(1).unwrap());
        assert_eq!(&node_set(vec![1]), t.targets());
        assert!(!t.add_target(1).unwrap());
        assert_eq!(Err(Error::InvalidNode(5)), t.add_target(5));
    }

    #[test]
    fn erasing() {
        let mut t = MarginalTargets::new(node_set(vec![0, 1, 2]));
        assert!(t.erase_target(0));
        assert_eq!(&node_set(vec![1, 2]), t.targets());
        assert!(!t.erase_target(0));

        assert!(t.erase_all_targets());
        assert_eq!(0, t.nb_targets());
        assert!(!t.is_target(1));
        assert!(!t.erase_all_targets());

        assert!(t.add_all_targets());
        assert_eq!(3, t.nb_targets());
        assert!(!t.add_all_targets());
    }
}
