//! The unregistration capability handed back by `register`.

use super::{Shared, unregister_entry};
use super::registry::RegistrationId;
use arrive_core::TreeNode;
use std::rc::Weak;

/// Capability to remove a registration.
///
/// Callers hold this instead of the registration itself; the dispatcher owns
/// the only live entry. `unregister` is idempotent, and dropping a handle
/// does *not* unregister: a repeating registration may legitimately outlive
/// every handle to it.
pub struct RegistrationHandle<N: TreeNode> {
    shared: Weak<Shared<N>>,
    id: RegistrationId,
}

impl<N: TreeNode> RegistrationHandle<N> {
    pub(crate) fn new(shared: Weak<Shared<N>>, id: RegistrationId) -> Self {
        Self { shared, id }
    }

    /// The registration's opaque identity.
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Remove the registration. Calling again (or after the dispatcher is
    /// gone) has no effect.
    pub fn unregister(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        unregister_entry(&shared, self.id);
    }
}

impl<N: TreeNode> Clone for RegistrationHandle<N> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            id: self.id,
        }
    }
}
