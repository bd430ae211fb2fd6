//! The two "wait for a node" strategies behind one [`ArrivalSource`]
//! interface: a live subscription to a [`Document`], and an interval-driven
//! polling scanner for environments without reliable mutation notification.
//! Which one a dispatcher uses is a construction-time configuration choice
//! ([`SourceMode`]), never a separate code path.

use crate::tree::{Document, Element, SubscriptionId};
use arrive_core::{
    ArrivalSource, BatchSink, BoxError, MutationBatch, ObserveOptions, TreeNode,
    descendants_inclusive,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Forwards a [`Document`]'s insertion batches into the dispatcher sink.
pub struct LiveSource {
    document: Document,
    subscription: Option<SubscriptionId>,
}

impl LiveSource {
    /// Create a source over the given document.
    pub fn new(document: &Document) -> Self {
        Self {
            document: document.clone(),
            subscription: None,
        }
    }
}

impl ArrivalSource<Element> for LiveSource {
    fn start(&mut self, options: ObserveOptions, sink: BatchSink<Element>) -> Result<(), BoxError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let forward: BatchSink<Element> = if options.contains(ObserveOptions::SUBTREE) {
            sink
        } else {
            // Without SUBTREE only insertions directly under the root are
            // reported.
            let root = self.document.root();
            Rc::new(move |batch: &MutationBatch<Element>| {
                let direct: Vec<Element> = batch
                    .records()
                    .iter()
                    .flat_map(|record| record.added())
                    .filter(|added| added.parent().is_some_and(|p| p.same_node(&root)))
                    .cloned()
                    .collect();
                if !direct.is_empty() {
                    sink(&MutationBatch::from_added(direct));
                }
            })
        };
        self.subscription = Some(self.document.subscribe(forward));
        tracing::debug!("live source subscribed");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.document.unsubscribe(id);
            tracing::debug!("live source unsubscribed");
        }
    }
}

/// Degraded fallback: scans the tree on demand instead of being notified.
///
/// The host drives [`tick`] from its own interval. Each tick synthesizes one
/// batch holding the nodes that appeared since the previous tick; `start`
/// primes the seen-set with the current tree, since pre-existing nodes are
/// covered by each registration's synchronous initial scan.
///
/// Nodes a registration's initial scan reports are fed back through
/// [`ArrivalSource::note_delivered`] and marked seen, so a node inserted
/// between ticks and picked up by the scan is not reported a second time.
///
/// Clones share state, so keep one clone outside the dispatcher to drive
/// ticks:
///
/// ```rust,ignore
/// let poller = PollingSource::new(&doc.root());
/// let dispatcher = Dispatcher::new(doc.root(), poller.clone());
/// // on the host's interval:
/// poller.tick();
/// ```
///
/// [`tick`]: PollingSource::tick
#[derive(Clone)]
pub struct PollingSource {
    shared: Rc<RefCell<PollState>>,
}

struct PollState {
    root: Element,
    subtree: bool,
    seen: HashSet<u64>,
    sink: Option<BatchSink<Element>>,
}

impl PollingSource {
    /// Create a polling source over the subtree at `root`.
    pub fn new(root: &Element) -> Self {
        Self {
            shared: Rc::new(RefCell::new(PollState {
                root: root.clone(),
                subtree: true,
                seen: HashSet::new(),
                sink: None,
            })),
        }
    }

    /// Scan for nodes not seen before and deliver them as one batch.
    /// Inert unless the source has been started.
    pub fn tick(&self) {
        let (sink, fresh) = {
            let mut state = self.shared.borrow_mut();
            let Some(sink) = state.sink.clone() else {
                return;
            };
            let nodes = Self::visible(&state.root, state.subtree);
            let fresh: Vec<Element> = nodes
                .into_iter()
                .filter(|node| state.seen.insert(node.node_key()))
                .collect();
            (sink, fresh)
        };
        if fresh.is_empty() {
            return;
        }
        tracing::debug!(count = fresh.len(), "polling tick found fresh nodes");
        sink(&MutationBatch::from_added(fresh));
    }

    fn visible(root: &Element, subtree: bool) -> Vec<Element> {
        if subtree {
            descendants_inclusive(root)
        } else {
            let mut nodes = vec![root.clone()];
            nodes.extend(root.children());
            nodes
        }
    }
}

impl ArrivalSource<Element> for PollingSource {
    fn start(&mut self, options: ObserveOptions, sink: BatchSink<Element>) -> Result<(), BoxError> {
        let mut state = self.shared.borrow_mut();
        if state.sink.is_some() {
            return Ok(());
        }
        state.subtree = options.contains(ObserveOptions::SUBTREE);
        state.seen = Self::visible(&state.root, state.subtree)
            .iter()
            .map(Element::node_key)
            .collect();
        state.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.shared.borrow_mut();
        state.sink = None;
        state.seen.clear();
    }

    fn note_delivered(&mut self, node: &Element) {
        self.shared.borrow_mut().seen.insert(node.node_key());
    }
}

/// Which observation strategy a dispatcher should be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Subscribe to the document's change notification.
    Observe,
    /// Poll the tree; the host drives the returned [`PollingSource`] handle.
    Poll,
}

impl SourceMode {
    /// Build the configured source. For [`SourceMode::Poll`] the second
    /// element is the handle the host must keep to drive ticks.
    pub fn build(self, document: &Document) -> (Box<dyn ArrivalSource<Element>>, Option<PollingSource>) {
        match self {
            SourceMode::Observe => (Box::new(LiveSource::new(document)), None),
            SourceMode::Poll => {
                let poller = PollingSource::new(&document.root());
                (Box::new(poller.clone()), Some(poller))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LiveSource, PollingSource};
    use crate::tree::{Document, Element};
    use arrive_core::{ArrivalSource, MutationBatch, ObserveOptions, TreeNode};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_sink() -> (
        Rc<dyn Fn(&MutationBatch<Element>)>,
        Rc<RefCell<Vec<Vec<String>>>>,
    ) {
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let captured = seen.clone();
        let sink = Rc::new(move |batch: &MutationBatch<Element>| {
            let tags: Vec<String> = batch
                .candidates()
                .iter()
                .map(|n| n.tag().to_owned())
                .collect();
            captured.borrow_mut().push(tags);
        });
        (sink, seen)
    }

    #[test]
    fn live_source_forwards_batches_until_stopped() {
        let doc = Document::new();
        let mut source = LiveSource::new(&doc);
        let (sink, seen) = recording_sink();
        source.start(ObserveOptions::default(), sink).unwrap();

        doc.root().append_child(&doc.create_element("div"));
        assert_eq!(seen.borrow().len(), 1);

        source.stop();
        doc.root().append_child(&doc.create_element("div"));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn live_source_without_subtree_reports_only_direct_children() {
        let doc = Document::new();
        let mut source = LiveSource::new(&doc);
        let (sink, seen) = recording_sink();
        source
            .start(ObserveOptions::CHILD_LIST, sink)
            .unwrap();

        let section = doc.create_element("section");
        doc.root().append_child(&section);
        let nested = doc.create_element("p");
        section.append_child(&nested);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ["section"]);
    }

    #[test]
    fn polling_reports_each_new_node_once() {
        let doc = Document::new();
        doc.root().append_child(&doc.create_element("nav"));

        let poller = PollingSource::new(&doc.root());
        let mut source = poller.clone();
        let (sink, seen) = recording_sink();
        source.start(ObserveOptions::default(), sink).unwrap();

        // Pre-existing nodes were primed as seen.
        poller.tick();
        assert!(seen.borrow().is_empty());

        doc.root().append_child(&doc.create_element("iframe"));
        poller.tick();
        poller.tick();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ["iframe"]);
    }

    #[test]
    fn polling_skips_nodes_marked_delivered() {
        let doc = Document::new();
        let poller = PollingSource::new(&doc.root());
        let mut source = poller.clone();
        let (sink, seen) = recording_sink();
        source.start(ObserveOptions::default(), sink).unwrap();

        let widget = doc.create_element("div");
        doc.root().append_child(&widget);
        source.note_delivered(&widget);

        poller.tick();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn polling_is_inert_before_start_and_after_stop() {
        let doc = Document::new();
        let poller = PollingSource::new(&doc.root());
        let (sink, seen) = recording_sink();

        poller.tick();
        assert!(seen.borrow().is_empty());

        let mut source = poller.clone();
        source.start(ObserveOptions::default(), sink).unwrap();
        source.stop();
        doc.root().append_child(&doc.create_element("div"));
        poller.tick();
        assert!(seen.borrow().is_empty());
    }
}
