//! # arrive - Exactly-Once Element-Arrival Dispatch
//!
//! `arrive` reacts to elements that appear in a mutable, DOM-like tree
//! without requiring callers to poll. Page-section handlers register an
//! interest, such as "a `div` with class `dashlet` anywhere under the root"
//! or "an element matching `#menu > ul > li`", and receive a one-shot or repeating
//! notification per matching node, covering both nodes that already exist at
//! registration time and nodes inserted later.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arrive::{Criteria, Dispatcher};
//! use arrive::arrive_std::sources::LiveSource;
//! use arrive::arrive_std::tree::Document;
//!
//! let doc = Document::new();
//! let dispatcher = Dispatcher::new(doc.root(), LiveSource::new(&doc));
//!
//! let handle = dispatcher.register(Criteria::new().tag("iframe"), |node| {
//!     // runs once per iframe, pre-existing or inserted later
//!     Ok(())
//! })?;
//!
//! doc.root().append_child(&doc.create_element("iframe"));
//! handle.unregister(); // idempotent
//! ```
//!
//! The dispatcher is single-threaded and synchronous: callbacks run on the
//! delivery stack, one batch at a time, and may freely register or
//! unregister other interests. A callback that fails is logged and skipped;
//! it never halts dispatch for the rest of the batch.
//!
//! Tree backends and observation strategies are pluggable: anything
//! implementing [`TreeNode`] can be observed through anything implementing
//! [`ArrivalSource`]. The [`arrive_std`] crate ships an in-memory tree, a
//! CSS-style selector engine, and both the live and polling sources.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod dispatcher;

pub use arrive_core::{
    // Source seam
    ArrivalSource,
    BatchSink,
    // Errors
    BoxError,
    // Criteria
    Criteria,
    Criterion,
    HasClass,
    // Batches
    MutationBatch,
    MutationRecord,
    ObserveOptions,
    Predicate,
    RegisterError,
    TagIs,
    // Tree handles
    TreeNode,
    descendants_inclusive,
};

pub use arrive_std;

pub use dispatcher::{
    ArrivalCallback, Dispatcher, RegisterOptions, RegistrationHandle, RegistrationId,
};
