//! One reconciliation pass over every namespace and the host links.

use tracing::{debug, info, info_span, warn};

use crate::error::{Error, Result};
use crate::inventory::{EndpointSource, ManagedInventory};
use crate::link::{LinkOps, scan_links, update_host_links, update_namespace_mtu};
use crate::mtu::MtuConfig;
use crate::netns::{NamespaceGuard, NamespaceOps, scan_namespaces};

/// Per-target outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.updated + self.skipped + self.failed
    }
}

/// Counts for a completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub namespaces: Tally,
    pub host_links: Tally,
}

/// Drives namespace discovery, per-namespace updates and the host link
/// update for one run.
///
/// The calling thread's network namespace is switched during [`run`];
/// callers must not share that thread with anything namespace-sensitive.
///
/// [`run`]: Reconciler::run
pub struct Reconciler<'a, N, L> {
    namespaces: &'a N,
    links: &'a L,
    mtu: MtuConfig,
}

impl<'a, N: NamespaceOps, L: LinkOps> Reconciler<'a, N, L> {
    pub fn new(namespaces: &'a N, links: &'a L, mtu: MtuConfig) -> Self {
        Self {
            namespaces,
            links,
            mtu,
        }
    }

    /// Run a full pass.
    ///
    /// Fails only on fatal errors: inventory fetch, host link enumeration,
    /// namespace discovery, or restoring the root namespace. Failures within
    /// a single namespace or link are logged and counted.
    pub fn run(&self, source: &dyn EndpointSource) -> Result<ReconcileReport> {
        info!(
            "Configuring MTU using base MTU {}, tunnel MTU {}",
            self.mtu.device_mtu(),
            self.mtu.tunnel_mtu()
        );

        let endpoints = source.endpoints()?;
        let inventory = ManagedInventory::build(&endpoints);

        let host_links =
            scan_links(self.links).map_err(|e| Error::LinkEnumerationFailed(e.to_string()))?;

        let namespaces = self.update_namespaces(&inventory)?;
        let host_links =
            update_host_links(self.links, &host_links, self.mtu.device_mtu(), &inventory);

        Ok(ReconcileReport {
            namespaces,
            host_links,
        })
    }

    /// Update every non-root namespace whose primary link is managed.
    fn update_namespaces(&self, inventory: &ManagedInventory) -> Result<Tally> {
        let set = scan_namespaces(self.namespaces)?;
        let mut tally = Tally::default();

        for ns in set.others() {
            let _span = info_span!("netns", inode = ns.inode).entered();
            debug!(path = %ns.path.display(), "moving to netns");

            let guard = match NamespaceGuard::enter(self.namespaces, &ns.handle, set.root()) {
                Ok(guard) => guard,
                Err(e) => {
                    tally.failed += 1;
                    warn!(error = %e, "failed to set netns");
                    continue;
                }
            };
            let result = update_namespace_mtu(self.links, &self.mtu, inventory);
            guard.restore()?;

            match result {
                Ok(outcome) if outcome.is_updated() => tally.updated += 1,
                Ok(_) => tally.skipped += 1,
                Err(e) => {
                    tally.failed += 1;
                    warn!(error = %e, "failed to update MTU");
                }
            }
        }

        // Return from whence we came; handles close when `set` drops.
        debug!(inode = set.root_inode(), "moving to root netns");
        self.namespaces
            .enter(set.root())
            .map_err(|e| Error::NamespaceRestoreFailed(e.to_string()))?;

        info!(
            "Updated {}/{} namespaces, {} skipped, {} failed",
            tally.updated,
            set.len(),
            tally.skipped,
            tally.failed
        );
        Ok(tally)
    }
}
