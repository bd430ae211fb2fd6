//! In-memory element tree with change notification.
//!
//! [`Document`] owns the root and the subscriber list; [`Element`] is the
//! `Rc` handle implementing [`TreeNode`]. Insertions into the attached tree
//! are reported to every subscribed sink as a [`MutationBatch`]; building a
//! subtree while detached and appending it once yields a single record whose
//! candidate expansion covers the whole subtree, the way a browser-style
//! primitive reports it.

use arrive_core::{BatchSink, MutationBatch, MutationRecord, TreeNode};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifies one subscribed sink, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// The owner of an element tree: root handle, subscribers, batching state.
#[derive(Clone)]
pub struct Document {
    root: Element,
    shared: Rc<DocShared>,
}

struct DocShared {
    next_node: Cell<u64>,
    next_subscription: Cell<u64>,
    root_key: Cell<u64>,
    sinks: RefCell<Vec<(SubscriptionId, BatchSink<Element>)>>,
    depth: Cell<u32>,
    staged: RefCell<Vec<MutationRecord<Element>>>,
    notifying: Cell<bool>,
    queued: RefCell<VecDeque<MutationBatch<Element>>>,
}

impl Document {
    /// Create a document with an empty `<html>` root.
    pub fn new() -> Self {
        let shared = Rc::new(DocShared {
            next_node: Cell::new(0),
            next_subscription: Cell::new(0),
            root_key: Cell::new(0),
            sinks: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            staged: RefCell::new(Vec::new()),
            notifying: Cell::new(false),
            queued: RefCell::new(VecDeque::new()),
        });
        let root = DocShared::make(&shared, "html");
        shared.root_key.set(root.node_key());
        Self { root, shared }
    }

    /// The root element.
    pub fn root(&self) -> Element {
        self.root.clone()
    }

    /// Create a detached element belonging to this document.
    pub fn create_element(&self, tag: &str) -> Element {
        DocShared::make(&self.shared, tag)
    }

    /// Subscribe a sink to insertion batches.
    pub fn subscribe(&self, sink: BatchSink<Element>) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscription.get());
        self.shared.next_subscription.set(id.0 + 1);
        self.shared.sinks.borrow_mut().push((id, sink));
        id
    }

    /// Remove a previously subscribed sink. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.shared.sinks.borrow_mut().retain(|(sid, _)| *sid != id);
    }

    /// Run `f`, coalescing every insertion it performs into one batch that is
    /// delivered when the outermost transaction ends.
    pub fn transaction<F: FnOnce()>(&self, f: F) {
        self.shared.depth.set(self.shared.depth.get() + 1);
        f();
        self.shared.depth.set(self.shared.depth.get() - 1);
        if self.shared.depth.get() == 0 {
            let staged = std::mem::take(&mut *self.shared.staged.borrow_mut());
            if !staged.is_empty() {
                self.shared.deliver(MutationBatch::new(staged));
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl DocShared {
    fn make(shared: &Rc<DocShared>, tag: &str) -> Element {
        let key = shared.next_node.get();
        shared.next_node.set(key + 1);
        Element(Rc::new(ElementData {
            key,
            tag: tag.into(),
            doc: Rc::downgrade(shared),
            state: RefCell::new(ElementState::default()),
        }))
    }

    fn child_inserted(&self, child: Element) {
        let record = MutationRecord::new(vec![child]);
        if self.depth.get() > 0 {
            self.staged.borrow_mut().push(record);
        } else {
            self.deliver(MutationBatch::new(vec![record]));
        }
    }

    // Mutations performed from inside a sink are queued and delivered as
    // later batches, never reentrantly into an in-flight notification.
    fn deliver(&self, batch: MutationBatch<Element>) {
        if batch.is_empty() {
            return;
        }
        if self.notifying.get() {
            self.queued.borrow_mut().push_back(batch);
            return;
        }
        self.notifying.set(true);
        let mut next = Some(batch);
        while let Some(batch) = next {
            let sinks: Vec<BatchSink<Element>> = self
                .sinks
                .borrow()
                .iter()
                .map(|(_, sink)| sink.clone())
                .collect();
            for sink in sinks {
                sink(&batch);
            }
            next = self.queued.borrow_mut().pop_front();
        }
        self.notifying.set(false);
    }
}

/// A cheap handle to one element.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

struct ElementData {
    key: u64,
    tag: Box<str>,
    doc: Weak<DocShared>,
    state: RefCell<ElementState>,
}

#[derive(Default)]
struct ElementState {
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    parent: Weak<ElementData>,
    children: Vec<Element>,
}

impl Element {
    /// A stable identity key, unique within the owning document.
    pub fn node_key(&self) -> u64 {
        self.0.key
    }

    /// Append `child` as the last child, detaching it from any previous
    /// parent. Reported to subscribers if the new position is attached.
    ///
    /// Appending an element to itself or into its own subtree would create a
    /// parent cycle; such calls are rejected and leave the tree unchanged.
    pub fn append_child(&self, child: &Element) {
        if self.is_under(child) {
            tracing::warn!(
                parent = %self.describe(),
                child = %child.describe(),
                "rejected append that would create a cycle"
            );
            return;
        }
        child.detach();
        child.0.state.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.state.borrow_mut().children.push(child.clone());
        if self.is_attached() {
            if let Some(doc) = self.0.doc.upgrade() {
                doc.child_inserted(child.clone());
            }
        }
    }

    /// Remove this element from its parent, if any. Removals are not
    /// reported; only arrivals are observed.
    pub fn detach(&self) {
        let parent = self.0.state.borrow().parent.upgrade();
        if let Some(parent) = parent {
            parent
                .state
                .borrow_mut()
                .children
                .retain(|c| !Rc::ptr_eq(&c.0, &self.0));
            self.0.state.borrow_mut().parent = Weak::new();
        }
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attr(&self, name: &str, value: &str) {
        self.0
            .state
            .borrow_mut()
            .attrs
            .insert(name.to_owned(), value.to_owned());
    }

    /// Shorthand for setting the `id` attribute.
    pub fn set_id(&self, id: &str) {
        self.set_attr("id", id);
    }

    /// Add a class if not already present.
    pub fn add_class(&self, name: &str) {
        let mut state = self.0.state.borrow_mut();
        if !state.classes.iter().any(|c| c == name) {
            state.classes.push(name.to_owned());
        }
    }

    /// Remove a class if present.
    pub fn remove_class(&self, name: &str) {
        self.0.state.borrow_mut().classes.retain(|c| c != name);
    }

    fn is_attached(&self) -> bool {
        let Some(doc) = self.0.doc.upgrade() else {
            return false;
        };
        let mut current = self.clone();
        loop {
            if current.0.key == doc.root_key.get() {
                return true;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}

impl TreeNode for Element {
    fn tag(&self) -> &str {
        &self.0.tag
    }

    fn classes(&self) -> Vec<String> {
        self.0.state.borrow().classes.clone()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0.state.borrow().attrs.get(name).cloned()
    }

    fn parent(&self) -> Option<Self> {
        self.0.state.borrow().parent.upgrade().map(Element)
    }

    fn children(&self) -> Vec<Self> {
        self.0.state.borrow().children.clone()
    }

    fn same_node(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, Element};
    use arrive_core::{MutationBatch, TreeNode};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn collecting_sink(doc: &Document) -> Rc<RefCell<Vec<MutationBatch<Element>>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let captured = seen.clone();
        doc.subscribe(Rc::new(move |batch: &MutationBatch<Element>| {
            captured.borrow_mut().push(batch.clone());
        }));
        seen
    }

    #[test]
    fn attached_insertion_notifies_subscribers() {
        let doc = Document::new();
        let seen = collecting_sink(&doc);

        let div = doc.create_element("div");
        doc.root().append_child(&div);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let candidates = seen[0].candidates();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].same_node(&div));
    }

    #[test]
    fn detached_construction_is_silent_until_appended() {
        let doc = Document::new();
        let seen = collecting_sink(&doc);

        let container = doc.create_element("div");
        for _ in 0..3 {
            container.append_child(&doc.create_element("span"));
        }
        assert!(seen.borrow().is_empty());

        doc.root().append_child(&container);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        // One record covering the subtree: container plus three spans.
        assert_eq!(seen[0].records().len(), 1);
        assert_eq!(seen[0].candidates().len(), 4);
    }

    #[test]
    fn transaction_coalesces_insertions_into_one_batch() {
        let doc = Document::new();
        let seen = collecting_sink(&doc);

        doc.transaction(|| {
            for _ in 0..3 {
                doc.root().append_child(&doc.create_element("iframe"));
            }
        });

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].records().len(), 3);
        assert_eq!(seen[0].candidates().len(), 3);
    }

    #[test]
    fn mutation_from_inside_a_sink_is_delivered_as_a_later_batch() {
        let doc = Document::new();
        let count = Rc::new(RefCell::new(0usize));

        let captured = count.clone();
        let doc_handle = doc.clone();
        doc.subscribe(Rc::new(move |_batch: &MutationBatch<Element>| {
            let mut count = captured.borrow_mut();
            *count += 1;
            if *count == 1 {
                let extra = doc_handle.create_element("p");
                doc_handle.root().append_child(&extra);
            }
        }));

        doc.root().append_child(&doc.create_element("div"));
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let doc = Document::new();
        let count = Rc::new(RefCell::new(0usize));
        let captured = count.clone();
        let id = doc.subscribe(Rc::new(move |_batch: &MutationBatch<Element>| {
            *captured.borrow_mut() += 1;
        }));

        doc.root().append_child(&doc.create_element("div"));
        doc.unsubscribe(id);
        doc.root().append_child(&doc.create_element("div"));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn append_into_own_subtree_is_rejected() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        outer.append_child(&inner);
        doc.root().append_child(&outer);

        inner.append_child(&outer);
        outer.append_child(&outer);

        assert!(outer.parent().is_some_and(|p| p.same_node(&doc.root())));
        assert!(inner.children().is_empty());
        assert_eq!(outer.children().len(), 1);
        // The tree is still walkable from the leaf.
        assert!(inner.is_under(&doc.root()));
    }

    #[test]
    fn detach_removes_the_parent_link() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.root().append_child(&div);
        assert!(div.parent().is_some());

        div.detach();
        assert!(div.parent().is_none());
        assert!(doc.root().children().is_empty());
    }
}
