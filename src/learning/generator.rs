//! Enumeration of the legal elementary changes of a DAG.

use crate::learning::{GraphChange, StructuralConstraintDag};
use crate::parallel::{thread_range, ThreadExecutor};
use crate::util::{NodeId, Result};

use log::debug;

use std::collections::BTreeSet;


/// Settings of a `GraphChangesGenerator`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// The number of workers checking the candidates
    pub num_threads: usize
}


impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig { num_threads: 1 }
    }
}


impl GeneratorConfig {

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }
}


/// Generates every arc addition, deletion and reversal that the constraints accept on their
/// current graph.
///
/// The tails are spread over the workers; each worker checks the candidates of its tails into
/// its own bucket, and the buckets are merged once all the workers are done.
#[derive(Clone, Debug, Default)]
pub struct GraphChangesGenerator {
    config: GeneratorConfig,

    changes: BTreeSet<GraphChange>
}


impl GraphChangesGenerator {

    pub fn new(config: GeneratorConfig) -> Self {
        GraphChangesGenerator { config, changes: BTreeSet::new() }
    }

    /// Recompute the candidates for the current graph of `constraints`.
    ///
    /// # Errors
    /// * `Error::ThreadPool` or `Error::WorkerPanic` if a worker fails
    pub fn set_graph(&mut self, constraints: &StructuralConstraintDag) -> Result<()> {
        let nodes: Vec<NodeId> = constraints.dag().nodes().collect();

        let found = ThreadExecutor::execute_collect(self.config.num_threads, |this_thread, num_threads, bucket| {
            for i in thread_range(this_thread, num_threads, nodes.len()) {
                let tail = nodes[i];
                for &head in nodes.iter().filter(|&&h| h != tail) {
                    let candidates = [
                        GraphChange::ArcAddition(tail, head),
                        GraphChange::ArcDeletion(tail, head),
                        GraphChange::ArcReversal(tail, head)
                    ];
                    bucket.extend(candidates.iter().filter(|c| constraints.check_modification_alone(c)).cloned());
                }
            }
            Ok(())
        })?;

        self.changes = found.into_iter().collect();
        debug!(
            "{} legal graph changes over {} nodes with {} workers",
            self.changes.len(), nodes.len(), self.config.num_threads
        );
        Ok(())
    }

    pub fn changes(&self) -> &BTreeSet<GraphChange> {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Drop a candidate, typically after the search rejected it
    pub fn erase_change(&mut self, change: &GraphChange) -> bool {
        self.changes.remove(change)
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }
}
