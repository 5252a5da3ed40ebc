//! Network namespace discovery and switching.

mod guard;
mod proc;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

pub use guard::NamespaceGuard;
pub use proc::{PROC_ROOT, ProcNamespaces};

/// Kernel namespace primitives.
///
/// Handles are closed by dropping them.
pub trait NamespaceOps {
    type Handle;

    /// Handle to the namespace the calling thread is attached to.
    fn current(&self) -> Result<Self::Handle>;
    /// Paths that may refer to network namespaces (one per live process).
    fn candidates(&self) -> Result<Vec<PathBuf>>;
    /// Open the namespace at `path`.
    fn open(&self, path: &Path) -> Result<Self::Handle>;
    /// Kernel identity (inode) of the namespace behind `handle`.
    fn identity(&self, handle: &Self::Handle) -> Result<u64>;
    /// Attach the calling thread to the namespace behind `handle`.
    fn enter(&self, handle: &Self::Handle) -> Result<()>;
}

/// An open, non-root network namespace.
#[derive(Debug)]
pub struct Namespace<H> {
    pub handle: H,
    pub inode: u64,
    /// First path the namespace was discovered through.
    pub path: PathBuf,
}

/// Result of a namespace scan: the root namespace and every other unique
/// namespace reachable from it.
#[derive(Debug)]
pub struct NamespaceSet<H> {
    root: H,
    root_inode: u64,
    others: Vec<Namespace<H>>,
}

impl<H> NamespaceSet<H> {
    pub fn root(&self) -> &H {
        &self.root
    }

    pub fn root_inode(&self) -> u64 {
        self.root_inode
    }

    /// Unique non-root namespaces, ordered by inode.
    pub fn others(&self) -> &[Namespace<H>] {
        &self.others
    }

    pub fn len(&self) -> usize {
        self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.others.is_empty()
    }
}

/// Find every network namespace reachable from the current one.
///
/// Namespaces that cannot be opened or identified are skipped. Only the
/// first handle seen per inode is kept; later duplicates and any handle to
/// the root namespace are closed on the spot.
pub fn scan_namespaces<N: NamespaceOps>(ops: &N) -> Result<NamespaceSet<N::Handle>> {
    debug!("fetching list of network namespaces");

    let root = ops
        .current()
        .map_err(|e| Error::NamespaceEnumerationFailed(format!("get current netns: {e}")))?;
    let root_inode = ops
        .identity(&root)
        .map_err(|e| Error::NamespaceEnumerationFailed(format!("get host netns inode: {e}")))?;
    let paths = ops
        .candidates()
        .map_err(|e| Error::NamespaceEnumerationFailed(format!("list netns paths: {e}")))?;

    let mut namespaces: BTreeMap<u64, Namespace<N::Handle>> = BTreeMap::new();
    for path in paths {
        let handle = match ops.open(&path) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to fetch netns");
                continue;
            }
        };

        let inode = match ops.identity(&handle) {
            Ok(inode) => inode,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to get netns inode");
                continue;
            }
        };

        if inode == root_inode {
            trace!(path = %path.display(), "root netns, closing");
            drop(handle);
            continue;
        }

        match namespaces.entry(inode) {
            Entry::Occupied(_) => {
                trace!(path = %path.display(), inode, "duplicate netns, closing");
                drop(handle);
            }
            Entry::Vacant(slot) => {
                slot.insert(Namespace {
                    handle,
                    inode,
                    path,
                });
            }
        }
    }

    let others: Vec<_> = namespaces.into_values().collect();
    debug!(root_inode, found = others.len(), "network namespaces discovered");

    Ok(NamespaceSet {
        root,
        root_inode,
        others,
    })
}
