//! Testing utilities for Arrive.
//!
//! # Features
//!
//! - [`RecordingCallback`]: a clonable callback double that counts
//!   invocations, keeps described matches, and can be told to fail.

use arrive_core::{BoxError, TreeNode};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A callback double for registration tests.
///
/// Clones share state: hand [`callback`] to the dispatcher and keep a clone
/// around for assertions.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingCallback::new();
/// dispatcher.register(Criteria::new().tag("iframe"), recorder.callback())?;
/// // ...mutate the tree...
/// assert_eq!(recorder.count(), 3);
/// ```
///
/// [`callback`]: RecordingCallback::callback
#[derive(Clone, Default)]
pub struct RecordingCallback {
    state: Rc<RecordState>,
}

#[derive(Default)]
struct RecordState {
    count: Cell<usize>,
    matches: RefCell<Vec<String>>,
    fail_with: RefCell<Option<String>>,
}

impl RecordingCallback {
    /// Create a fresh recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the closure to register. Invocations are recorded even when
    /// the recorder is set to fail.
    pub fn callback<N: TreeNode>(&self) -> impl FnMut(&N) -> Result<(), BoxError> + 'static {
        let state = self.state.clone();
        move |node: &N| {
            state.count.set(state.count.get() + 1);
            state.matches.borrow_mut().push(node.describe());
            match &*state.fail_with.borrow() {
                Some(message) => Err(message.clone().into()),
                None => Ok(()),
            }
        }
    }

    /// Make every subsequent invocation return an error.
    pub fn fail_with(&self, message: &str) {
        *self.state.fail_with.borrow_mut() = Some(message.to_owned());
    }

    /// How many times the callback has been invoked.
    pub fn count(&self) -> usize {
        self.state.count.get()
    }

    /// The descriptions of every matched node, in delivery order.
    pub fn matches(&self) -> Vec<String> {
        self.state.matches.borrow().clone()
    }
}
