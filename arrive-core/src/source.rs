//! The seam to the environment's mutation-observation primitive.

use crate::batch::MutationBatch;
use crate::error::BoxError;
use crate::node::TreeNode;
use std::rc::Rc;

bitflags::bitflags! {
    /// What a source is asked to observe.
    ///
    /// Mirrors the init dictionary a browser-style observation primitive
    /// takes: whether to watch the whole subtree or only the root's direct
    /// children.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObserveOptions: u8 {
        /// Report insertions anywhere under the root, not only direct children.
        const SUBTREE = 1 << 0;
        /// Report child-list insertions. Always wanted by the dispatcher;
        /// present so sources that also watch other mutation kinds can tell
        /// the requests apart.
        const CHILD_LIST = 1 << 1;
    }
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::SUBTREE | Self::CHILD_LIST
    }
}

/// Where a source pushes the batches it observes.
pub type BatchSink<N> = Rc<dyn Fn(&MutationBatch<N>)>;

/// A mutation-observation primitive the dispatcher can subscribe to.
///
/// The dispatcher drives the source through a two-state lifecycle: `start` on
/// the first live registration, `stop` once the last one is removed. A
/// started source delivers every batch of insertions it observes into the
/// sink, synchronously, one batch at a time. The sink must not be invoked
/// from inside `start` itself; delivery begins only after `start` returns.
///
/// `start` on an already-started source must be a no-op returning `Ok`; the
/// dispatcher never restarts a running subscription redundantly, but sources
/// should not rely on that.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `ArrivalSource` for `{N}`",
    label = "missing `ArrivalSource` implementation",
    note = "Sources must deliver `MutationBatch<{N}>` values into the sink they are started with."
)]
pub trait ArrivalSource<N: TreeNode> {
    /// Begin observing, pushing batches into `sink`.
    ///
    /// A failure here is fatal for the registration that triggered it: the
    /// dispatcher cannot function without its primitive and surfaces the
    /// error from `register`.
    fn start(&mut self, options: ObserveOptions, sink: BatchSink<N>) -> Result<(), BoxError>;

    /// Stop observing and release the sink.
    fn stop(&mut self);

    /// Record that `node` was reported to a registration by the dispatcher's
    /// synchronous initial scan. Sources that synthesize batches by diffing
    /// the tree use this to keep their seen-set in step, so a node the scan
    /// already reported is not reported again; notification-driven sources
    /// can ignore it.
    fn note_delivered(&mut self, node: &N) {
        let _ = node;
    }
}

impl<N: TreeNode> ArrivalSource<N> for Box<dyn ArrivalSource<N>> {
    fn start(&mut self, options: ObserveOptions, sink: BatchSink<N>) -> Result<(), BoxError> {
        (**self).start(options, sink)
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn note_delivered(&mut self, node: &N) {
        (**self).note_delivered(node);
    }
}

#[cfg(test)]
mod tests {
    use super::ObserveOptions;

    #[test]
    fn default_options_observe_subtree_insertions() {
        let options = ObserveOptions::default();
        assert!(options.contains(ObserveOptions::SUBTREE));
        assert!(options.contains(ObserveOptions::CHILD_LIST));
    }
}
