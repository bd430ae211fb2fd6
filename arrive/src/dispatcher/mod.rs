//! The element-arrival dispatcher.
//!
//! Owns the observed root, a mutation source, and the registry of
//! (criteria, callback) registrations. Guarantees exactly-once delivery per
//! (node, registration) pair: nodes already present when `register` is
//! called are reported by a synchronous initial scan, nodes inserted later
//! by the batches the source pushes in.

mod handle;
mod registry;

pub use handle::RegistrationHandle;
pub use registry::{ArrivalCallback, RegisterOptions, RegistrationId};

use arrive_core::{
    ArrivalSource, BatchSink, BoxError, Criteria, MutationBatch, ObserveOptions, RegisterError,
    TreeNode, descendants_inclusive,
};
use registry::RegEntry;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Dispatches callbacks for elements arriving under a root.
///
/// Single-threaded and synchronous: batches are dispatched one at a time on
/// the caller's stack, and registrations may be added or removed at any
/// point, including from inside a callback.
///
/// # Example
///
/// ```rust,ignore
/// let doc = Document::new();
/// let dispatcher = Dispatcher::new(doc.root(), LiveSource::new(&doc));
///
/// let handle = dispatcher.register(Criteria::new().class("dashlet"), |node| {
///     println!("dashlet arrived: {}", node.describe());
///     Ok(())
/// })?;
/// // ...
/// handle.unregister();
/// ```
pub struct Dispatcher<N: TreeNode> {
    shared: Rc<Shared<N>>,
}

pub(crate) struct Shared<N: TreeNode> {
    inner: RefCell<Inner<N>>,
    // Batches arriving while one is being dispatched queue here; the
    // dispatcher never runs two batches concurrently.
    pending: RefCell<VecDeque<MutationBatch<N>>>,
    in_flight: Cell<bool>,
}

struct Inner<N: TreeNode> {
    root: N,
    source: Box<dyn ArrivalSource<N>>,
    options: ObserveOptions,
    observing: bool,
    next_id: u64,
    regs: Vec<Rc<RegEntry<N>>>,
}

impl<N: TreeNode> Dispatcher<N> {
    /// Create a dispatcher over `root` with default observation options.
    ///
    /// The source is not started yet; the subscription begins lazily with the
    /// first registration.
    pub fn new(root: N, source: impl ArrivalSource<N> + 'static) -> Self {
        Self::with_options(root, source, ObserveOptions::default())
    }

    /// Create a dispatcher with explicit observation options.
    pub fn with_options(
        root: N,
        source: impl ArrivalSource<N> + 'static,
        options: ObserveOptions,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                inner: RefCell::new(Inner {
                    root,
                    source: Box::new(source),
                    options,
                    observing: false,
                    next_id: 0,
                    regs: Vec::new(),
                }),
                pending: RefCell::new(VecDeque::new()),
                in_flight: Cell::new(false),
            }),
        }
    }

    /// The observed root.
    pub fn root(&self) -> N {
        self.shared.inner.borrow().root.clone()
    }

    /// Register a repeating interest.
    ///
    /// The current tree is scanned synchronously before this returns, so
    /// matches that already exist are not missed; see
    /// [`register_with`](Self::register_with).
    pub fn register(
        &self,
        criteria: Criteria<N>,
        callback: impl FnMut(&N) -> Result<(), BoxError> + 'static,
    ) -> Result<RegistrationHandle<N>, RegisterError> {
        self.register_with(criteria, RegisterOptions::new(), callback)
    }

    /// Register a one-shot interest, removed after its first match.
    pub fn once(
        &self,
        criteria: Criteria<N>,
        callback: impl FnMut(&N) -> Result<(), BoxError> + 'static,
    ) -> Result<RegistrationHandle<N>, RegisterError> {
        self.register_with(criteria, RegisterOptions::new().once(), callback)
    }

    /// Register with explicit options.
    ///
    /// Rejects empty criteria with [`RegisterError::InvalidCriteria`]. On the
    /// first live registration the mutation source is started; a start
    /// failure aborts the registration and surfaces as
    /// [`RegisterError::Source`]. The entry is then added and the current
    /// tree (the scope subtree if one is set, else the root subtree) is
    /// scanned synchronously, in document order. A one-shot registration
    /// consumed by this scan is already spent when the call returns.
    pub fn register_with(
        &self,
        criteria: Criteria<N>,
        options: RegisterOptions<N>,
        callback: impl FnMut(&N) -> Result<(), BoxError> + 'static,
    ) -> Result<RegistrationHandle<N>, RegisterError> {
        if criteria.is_empty() {
            return Err(RegisterError::InvalidCriteria);
        }
        let entry = {
            let mut inner = self.shared.inner.borrow_mut();
            if !inner.observing {
                let sink = batch_sink(Rc::downgrade(&self.shared));
                let observe = inner.options;
                inner.source.start(observe, sink).map_err(RegisterError::Source)?;
                inner.observing = true;
                tracing::debug!("mutation source started");
            }
            let id = RegistrationId(inner.next_id);
            inner.next_id += 1;
            let entry = Rc::new(RegEntry {
                id,
                criteria,
                scope: options.scope,
                repeating: options.repeating,
                live: Cell::new(true),
                callback: RefCell::new(Box::new(callback) as ArrivalCallback<N>),
            });
            inner.regs.push(entry.clone());
            tracing::debug!(
                registration = %entry.criteria.describe(),
                repeating = entry.repeating,
                "registered"
            );
            entry
        };

        // Initial scan. The registry borrow is released first: the callback
        // may re-enter the dispatcher, and tree mutations it performs are
        // delivered as ordinary batches.
        let scan_root = match &entry.scope {
            Some(scope) => scope.clone(),
            None => self.shared.inner.borrow().root.clone(),
        };
        let mut scanned = Vec::new();
        for node in descendants_inclusive(&scan_root) {
            if !entry.live.get() {
                break;
            }
            if entry.accepts(&node) {
                entry.invoke(&node);
                scanned.push(node);
            }
        }
        // Tell the source which nodes the scan covered, so diff-based sources
        // do not report them a second time.
        if !scanned.is_empty() {
            let mut inner = self.shared.inner.borrow_mut();
            for node in &scanned {
                inner.source.note_delivered(node);
            }
        }
        sweep(&self.shared);

        Ok(RegistrationHandle::new(Rc::downgrade(&self.shared), entry.id))
    }

    /// Feed a batch directly, as the source's sink would.
    pub fn deliver(&self, batch: &MutationBatch<N>) {
        deliver_shared(&self.shared, batch);
    }

    /// How many registrations are currently live.
    pub fn live_registrations(&self) -> usize {
        self.shared
            .inner
            .borrow()
            .regs
            .iter()
            .filter(|entry| entry.live.get())
            .count()
    }

    /// Whether the shared subscription is currently running.
    pub fn is_observing(&self) -> bool {
        self.shared.inner.borrow().observing
    }
}

fn batch_sink<N: TreeNode>(weak: Weak<Shared<N>>) -> BatchSink<N> {
    Rc::new(move |batch: &MutationBatch<N>| {
        if let Some(shared) = weak.upgrade() {
            deliver_shared(&shared, batch);
        }
    })
}

fn deliver_shared<N: TreeNode>(shared: &Rc<Shared<N>>, batch: &MutationBatch<N>) {
    if batch.is_empty() {
        return;
    }
    shared.pending.borrow_mut().push_back(batch.clone());
    if shared.in_flight.get() {
        // A batch is already on the stack; this one runs after it.
        return;
    }
    shared.in_flight.set(true);
    loop {
        let next = shared.pending.borrow_mut().pop_front();
        let Some(next) = next else {
            break;
        };
        dispatch_batch(shared, &next);
    }
    shared.in_flight.set(false);
}

fn dispatch_batch<N: TreeNode>(shared: &Rc<Shared<N>>, batch: &MutationBatch<N>) {
    // Snapshot the registry so callbacks registering or unregistering cannot
    // corrupt this batch's iteration. Entries added mid-batch first see the
    // next batch (plus their own initial scan).
    let snapshot: Vec<Rc<RegEntry<N>>> = shared.inner.borrow().regs.clone();
    if snapshot.is_empty() {
        return;
    }
    let candidates = batch.candidates();
    for entry in &snapshot {
        for node in &candidates {
            if !entry.live.get() {
                break;
            }
            if entry.accepts(node) {
                entry.invoke(node);
            }
        }
    }
    sweep(shared);
}

pub(crate) fn unregister_entry<N: TreeNode>(shared: &Rc<Shared<N>>, id: RegistrationId) {
    let entry = shared
        .inner
        .borrow()
        .regs
        .iter()
        .find(|entry| entry.id == id)
        .cloned();
    if let Some(entry) = entry {
        if entry.live.replace(false) {
            tracing::debug!(registration = %entry.criteria.describe(), "unregistered");
        }
        sweep(shared);
    }
}

// Drop spent entries; stop the source once nothing is live.
fn sweep<N: TreeNode>(shared: &Rc<Shared<N>>) {
    let mut inner = shared.inner.borrow_mut();
    inner.regs.retain(|entry| entry.live.get());
    if inner.regs.is_empty() && inner.observing {
        inner.source.stop();
        inner.observing = false;
        tracing::debug!("mutation source stopped");
    }
}
