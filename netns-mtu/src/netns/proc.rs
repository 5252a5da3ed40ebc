use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use nix::sched::{CloneFlags, setns};

use super::NamespaceOps;
use crate::error::{Error, Result};

/// Default mount point of the process filesystem.
pub const PROC_ROOT: &str = "/proc";

/// Namespace primitives backed by `/proc/<pid>/ns/net` files and `setns(2)`.
#[derive(Debug, Clone)]
pub struct ProcNamespaces {
    proc_root: PathBuf,
}

impl Default for ProcNamespaces {
    fn default() -> Self {
        Self::new(PROC_ROOT)
    }
}

impl ProcNamespaces {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

fn netns_path(dir: &Path) -> PathBuf {
    dir.join("ns").join("net")
}

impl NamespaceOps for ProcNamespaces {
    type Handle = File;

    fn current(&self) -> Result<File> {
        let path = netns_path(&self.proc_root.join("self"));
        File::open(&path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("open {}: {e}", path.display()),
            ))
        })
    }

    /// Equivalent of globbing `<proc_root>/*/ns/net`: entries are matched
    /// without following the link, and returned in lexical order.
    fn candidates(&self) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.proc_root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| netns_path(&entry.path()))
            .filter(|path| std::fs::symlink_metadata(path).is_ok())
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn open(&self, path: &Path) -> Result<File> {
        Ok(File::open(path)?)
    }

    fn identity(&self, handle: &File) -> Result<u64> {
        let meta = handle
            .metadata()
            .map_err(|e| Error::Io(std::io::Error::other(format!("stat failed: {e}"))))?;
        Ok(meta.ino())
    }

    fn enter(&self, handle: &File) -> Result<()> {
        setns(handle, CloneFlags::CLONE_NEWNET).map_err(|e| Error::Io(e.into()))
    }
}
