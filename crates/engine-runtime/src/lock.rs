use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Single-writer PID-file lock backing the Run Scheduler (§4.8). Grounded in
/// the `FileLock`/stale-lock-reclaim behavior of a cron-driven sync daemon:
/// the lock file holds the owning process's PID; a lock held by a dead PID
/// is reclaimable, a lock held by a live PID is not.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock already held by running process {0}")]
    AlreadyHeld(i32),

    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct FileLock {
    path: PathBuf,
}

/// Held while a sync run owns the lock. Removing the lock file on drop is
/// best-effort — a crash between acquiring and releasing leaves the file
/// behind, which the next `try_acquire` reclaims once it finds the PID dead.
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLock { path: path.into() }
    }

    /// Attempts to acquire the lock without blocking. A manual trigger or a
    /// coalesced cron tick that finds the lock held returns
    /// `LockError::AlreadyHeld` rather than waiting — the caller reports the
    /// run as skipped (§4.8's coalescing rule).
    pub fn try_acquire(&self) -> Result<LockGuard, LockError> {
        if let Some(owner_pid) = self.read_owner()? {
            if process_is_alive(owner_pid) {
                return Err(LockError::AlreadyHeld(owner_pid));
            }
            // Owning process is gone: the lock file is stale, reclaim it.
            fs::remove_file(&self.path)?;
        }

        let pid = std::process::id();
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        write!(file, "{pid}")?;
        file.sync_all()?;

        Ok(LockGuard {
            path: self.path.clone(),
        })
    }

    /// Read-only peek at the current holder, for `status` reporting. Unlike
    /// `try_acquire`, never reclaims a stale lock.
    pub fn current_holder(&self) -> Result<Option<i32>, std::io::Error> {
        self.read_owner()
    }

    fn read_owner(&self) -> Result<Option<i32>, std::io::Error> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents.trim().parse::<i32>().ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn process_is_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}
