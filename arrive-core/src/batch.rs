//! Mutation batches delivered by sources.

use crate::node::{TreeNode, descendants_inclusive};

/// One group of directly-added nodes, as reported by the environment's
/// change-notification primitive.
#[derive(Clone)]
pub struct MutationRecord<N> {
    added: Vec<N>,
}

impl<N: TreeNode> MutationRecord<N> {
    /// Create a record from the directly-added nodes.
    pub fn new(added: Vec<N>) -> Self {
        Self { added }
    }

    /// The directly-added nodes, in document order.
    pub fn added(&self) -> &[N] {
        &self.added
    }
}

/// A set of mutation records delivered together.
///
/// Candidate expansion is the batch's job: inserting a subtree inserts every
/// descendant at once, so each descendant must be separately tested against
/// the registry.
#[derive(Clone)]
pub struct MutationBatch<N> {
    records: Vec<MutationRecord<N>>,
}

impl<N: TreeNode> MutationBatch<N> {
    /// Create a batch from records.
    pub fn new(records: Vec<MutationRecord<N>>) -> Self {
        Self { records }
    }

    /// A batch holding one record with one added node.
    pub fn single(node: N) -> Self {
        Self::from_added(vec![node])
    }

    /// A batch holding one record with the given added nodes.
    pub fn from_added(added: Vec<N>) -> Self {
        Self {
            records: vec![MutationRecord::new(added)],
        }
    }

    /// The records in delivery order.
    pub fn records(&self) -> &[MutationRecord<N>] {
        &self.records
    }

    /// Whether the batch carries no added nodes at all.
    pub fn is_empty(&self) -> bool {
        self.records.iter().all(|record| record.added.is_empty())
    }

    /// Every directly-added node plus every descendant, in document order,
    /// de-duplicated by node identity.
    pub fn candidates(&self) -> Vec<N> {
        let mut out: Vec<N> = Vec::new();
        for record in &self.records {
            for added in &record.added {
                for node in descendants_inclusive(added) {
                    if !out.iter().any(|seen| seen.same_node(&node)) {
                        out.push(node);
                    }
                }
            }
        }
        out
    }
}
