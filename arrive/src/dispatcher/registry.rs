//! Registration entries and per-registration options.

use arrive_core::{BoxError, Criteria, TreeNode};
use std::cell::{Cell, RefCell};

/// The callback type invoked with each matched node.
///
/// Returning `Err` marks the invocation failed; the dispatcher logs it and
/// continues with the remaining registrations in the batch.
pub type ArrivalCallback<N> = Box<dyn FnMut(&N) -> Result<(), BoxError>>;

/// Opaque identity of one registration, unique among currently-live
/// registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub(crate) u64);

/// Options applied at registration time.
pub struct RegisterOptions<N> {
    pub(crate) scope: Option<N>,
    pub(crate) repeating: bool,
}

impl<N: TreeNode> RegisterOptions<N> {
    /// Defaults: no scope restriction, repeating.
    pub fn new() -> Self {
        Self {
            scope: None,
            repeating: true,
        }
    }

    /// Only report candidates at or under `ancestor`.
    pub fn scope(mut self, ancestor: N) -> Self {
        self.scope = Some(ancestor);
        self
    }

    /// Remove the registration automatically after its first match.
    pub fn once(mut self) -> Self {
        self.repeating = false;
        self
    }

    /// Set whether the registration persists after its first match.
    pub fn repeating(mut self, repeating: bool) -> Self {
        self.repeating = repeating;
        self
    }
}

impl<N: TreeNode> Default for RegisterOptions<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct RegEntry<N: TreeNode> {
    pub(crate) id: RegistrationId,
    pub(crate) criteria: Criteria<N>,
    pub(crate) scope: Option<N>,
    pub(crate) repeating: bool,
    pub(crate) live: Cell<bool>,
    pub(crate) callback: RefCell<ArrivalCallback<N>>,
}

impl<N: TreeNode> RegEntry<N> {
    pub(crate) fn accepts(&self, node: &N) -> bool {
        self.live.get()
            && self.criteria.matches(node)
            && self.scope.as_ref().is_none_or(|scope| node.is_under(scope))
    }

    /// Invoke the callback. A one-shot entry is spent before the call, so it
    /// cannot fire twice even if the callback re-enters the dispatcher.
    pub(crate) fn invoke(&self, node: &N) {
        if !self.repeating {
            self.live.set(false);
        }
        let result = (self.callback.borrow_mut())(node);
        if let Err(error) = result {
            tracing::error!(
                registration = %self.criteria.describe(),
                node = %node.describe(),
                error = %error,
                "arrival callback failed"
            );
        }
    }
}
