//! # arrive-core
//!
//! Core traits and types for the Arrive element-arrival dispatch library.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! tree backends and criteria implementations that don't need the full
//! dispatcher in the `arrive` crate.
//!
//! # Architecture
//!
//! Arrive reacts to elements that *appear* in a mutable, DOM-like tree. The
//! pieces defined here form the seams of that system:
//!
//! ## Tree handles ([`TreeNode`])
//!
//! The observed tree is owned by a host environment. Arrive only ever touches
//! it through cheap clonable handles: tag, classes, attributes, parent and
//! child links, and node identity. Any backend implementing [`TreeNode`] can
//! be observed.
//!
//! ## Criteria ([`Criterion`], [`Criteria`])
//!
//! A registration's interest is an AND-conjunction of criteria: a tag name,
//! a class, an arbitrary predicate, or anything else implementing
//! [`Criterion`] (the selector engine in `arrive-std` plugs in here).
//!
//! ## Mutation batches ([`MutationBatch`])
//!
//! Arrivals are delivered in batches of mutation records, the way a browser
//! change-notification primitive coalesces them. Adding a subtree adds all of
//! its descendants at once, so [`MutationBatch::candidates`] expands every
//! record into the full set of nodes to test, in document order.
//!
//! ## Sources ([`ArrivalSource`])
//!
//! The seam to the environment's mutation-observation primitive. The
//! dispatcher starts a source lazily on the first registration and stops it
//! when the last registration is removed; the source pushes batches into the
//! [`BatchSink`] it was started with.
//!
//! # Error Types
//!
//! - [`RegisterError`] - registration rejection and source setup failures
//! - [`BoxError`] - boxed error alias used at the callback boundary

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod batch;
mod criteria;
mod error;
mod node;
mod source;

#[cfg(test)]
pub(crate) mod test_node;

// Re-exports
pub use batch::{MutationBatch, MutationRecord};
pub use criteria::{Criteria, Criterion, HasClass, Predicate, TagIs};
pub use error::{BoxError, RegisterError};
pub use node::{TreeNode, descendants_inclusive};
pub use source::{ArrivalSource, BatchSink, ObserveOptions};
