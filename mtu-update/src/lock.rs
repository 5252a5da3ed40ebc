use std::fs::File;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::error::{UpdateError, UpdateResult};

pub const DEFAULT_LOCK_FILE: &str = "/run/mtu-update.lock";

/// Take an exclusive flock on `path` without waiting.
///
/// Namespace switches from two concurrent runs would interleave, so a held
/// lock is reported as an error instead of queueing behind it. The returned
/// guard holds the lock until dropped.
pub fn acquire(path: &Path) -> UpdateResult<Flock<File>> {
    let file = File::options()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| UpdateError::Lock(format!("open lock {}: {e}", path.display())))?;
    Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_file, e)| match e {
        Errno::EWOULDBLOCK => UpdateError::Lock(format!(
            "{} is held by another mtu-update run",
            path.display()
        )),
        e => UpdateError::Lock(format!("flock {}: {e}", path.display())),
    })
}
