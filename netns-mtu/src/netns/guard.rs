use tracing::{error, trace};

use super::NamespaceOps;
use crate::error::{Error, Result};

/// Scope in which the calling thread is attached to a target namespace.
///
/// [`NamespaceGuard::restore`] switches back to the root namespace and
/// reports failure. If the guard is dropped without it (early return,
/// panic), the switch back is attempted on drop and failures are logged.
#[must_use]
pub struct NamespaceGuard<'a, N: NamespaceOps> {
    ops: &'a N,
    root: &'a N::Handle,
    restored: bool,
}

impl<'a, N: NamespaceOps> NamespaceGuard<'a, N> {
    /// Switch into `target`. On failure the thread stays where it was.
    pub fn enter(ops: &'a N, target: &N::Handle, root: &'a N::Handle) -> Result<Self> {
        ops.enter(target)
            .map_err(|e| Error::NamespaceSwitchFailed(e.to_string()))?;
        trace!("entered netns");
        Ok(Self {
            ops,
            root,
            restored: false,
        })
    }

    /// Switch back to the root namespace.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.ops
            .enter(self.root)
            .map_err(|e| Error::NamespaceRestoreFailed(e.to_string()))?;
        trace!("restored root netns");
        Ok(())
    }
}

impl<N: NamespaceOps> Drop for NamespaceGuard<'_, N> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.ops.enter(self.root) {
            error!(error = %e, "failed to restore root netns");
        }
    }
}
