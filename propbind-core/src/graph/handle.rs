//! Registration handles.

use std::fmt;
use std::rc::{Rc, Weak};

use super::host::HostInner;
use super::node::{NodeId, RegistrationId};

/// Cancels one registration.
///
/// Dropping the handle cancels the registration. Call
/// [`detach`](Self::detach) to keep it alive for the lifetime of the host
/// (or until [`BindingHost::unregister_all`](super::BindingHost::unregister_all)).
#[must_use = "dropping a RegistrationHandle cancels the registration"]
pub struct RegistrationHandle {
    host: Weak<HostInner>,
    node: NodeId,
    property: Rc<str>,
    id: RegistrationId,
    detached: bool,
}

impl RegistrationHandle {
    pub(crate) fn new(host: Weak<HostInner>, node: NodeId, property: Rc<str>, id: RegistrationId) -> Self {
        Self {
            host,
            node,
            property,
            id,
            detached: false,
        }
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Remove exactly this registration.
    ///
    /// Returns `true` if it was still registered. Further calls, and calls
    /// after the host is gone or was cleared, return `false`.
    pub fn cancel(&self) -> bool {
        let Some(host) = self.host.upgrade() else {
            return false;
        };
        let cancelled = host.cancel(self.node, &self.property, self.id);
        if cancelled {
            tracing::debug!(id = ?self.id, node = self.node.raw(), "registration cancelled");
        }
        cancelled
    }

    pub fn is_active(&self) -> bool {
        self.host
            .upgrade()
            .is_some_and(|host| host.is_registered(self.node, &self.property, self.id))
    }

    /// Give up the handle without cancelling.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for RegistrationHandle {
    fn drop(&mut self) {
        if !self.detached {
            self.cancel();
        }
    }
}

impl fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("property", &self.property)
            .field("active", &self.is_active())
            .finish()
    }
}
