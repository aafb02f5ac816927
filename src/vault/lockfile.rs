//! Advisory file locking and permission hardening for the store file.
//!
//! Locking is cooperative: it protects against two well-behaved
//! processes writing the store at the same time, nothing more. Reads
//! take a shared lock without blocking, so concurrent readers coexist
//! and a stuck writer cannot hang them; writes wait for an exclusive
//! lock. If the platform lock primitive is unavailable or errors, we
//! log a warning and proceed unlocked rather than failing the whole
//! operation.
//!
//! Permission hardening is equally best-effort: owner-only access where
//! the platform supports it, a logged warning where it does not.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// How the store file gets locked.
#[derive(Clone, Copy)]
enum LockMode {
    /// Shared and non-blocking: readers coexist, and a writer holding
    /// the exclusive lock degrades the read to unlocked instead of
    /// hanging it.
    Shared,
    /// Exclusive and blocking: writers wait their turn.
    Exclusive,
}

/// A file handle holding a best-effort advisory lock.
///
/// The lock is released when the guard is dropped — on Unix by closing
/// the descriptor, on Windows by an explicit unlock call. Every exit
/// path, including early returns on error, goes through `Drop`.
pub struct LockedFile {
    file: File,
    locked: bool,
}

impl LockedFile {
    /// Open `path` for reading under a shared advisory lock.
    pub fn open_read(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::lock(file, path, LockMode::Shared))
    }

    /// Open `path` for writing and take an exclusive advisory lock.
    ///
    /// The file is truncated only once the lock attempt has finished,
    /// so another lock holder never observes the store's contents
    /// destroyed out from under it.
    pub fn open_write(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).create(true).open(path)?;
        let guard = Self::lock(file, path, LockMode::Exclusive);
        guard.file.set_len(0)?;
        Ok(guard)
    }

    fn lock(file: File, path: &Path, mode: LockMode) -> Self {
        let locked = match lock_file(&file, mode) {
            Ok(()) => {
                debug!(path = %path.display(), "acquired file lock");
                true
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "could not acquire file lock, proceeding without it"
                );
                false
            }
        };
        Self { file, locked }
    }

    /// The underlying file handle.
    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    /// Whether the advisory lock was actually acquired.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if self.locked {
            if let Err(e) = unlock(&self.file) {
                warn!(error = %e, "failed to release file lock");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Platform lock primitives
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn lock_file(file: &File, mode: LockMode) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let op = match mode {
        LockMode::Shared => libc::LOCK_SH | libc::LOCK_NB,
        LockMode::Exclusive => libc::LOCK_EX,
    };
    let ret = unsafe { libc::flock(file.as_raw_fd(), op) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn unlock(_file: &File) -> io::Result<()> {
    // Unix advisory locks are released when the descriptor is closed.
    Ok(())
}

#[cfg(windows)]
fn lock_file(file: &File, mode: LockMode) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::fileapi::LockFileEx;
    use winapi::um::minwinbase::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY};

    let flags = match mode {
        LockMode::Shared => LOCKFILE_FAIL_IMMEDIATELY,
        LockMode::Exclusive => LOCKFILE_EXCLUSIVE_LOCK,
    };
    let mut overlapped: winapi::um::minwinbase::OVERLAPPED = unsafe { std::mem::zeroed() };
    let result = unsafe {
        LockFileEx(
            file.as_raw_handle() as _,
            flags,
            0,
            u32::MAX,
            u32::MAX,
            &mut overlapped,
        )
    };
    if result == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
fn unlock(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::fileapi::UnlockFile;

    let result = unsafe { UnlockFile(file.as_raw_handle() as _, 0, 0, u32::MAX, u32::MAX) };
    if result == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn lock_file(_file: &File, _mode: LockMode) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "file locking not supported on this platform",
    ))
}

#[cfg(not(any(unix, windows)))]
fn unlock(_file: &File) -> io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Permission hardening
// ---------------------------------------------------------------------------

/// Restrict the store file to owner read/write where the platform
/// supports it. Failures are logged, never raised.
pub fn harden_permissions(path: &Path) {
    if let Err(e) = try_harden_permissions(path) {
        warn!(
            path = %path.display(),
            error = %e,
            "could not set restrictive file permissions"
        );
    }
}

#[cfg(unix)]
fn try_harden_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn try_harden_permissions(path: &Path) -> io::Result<()> {
    // No POSIX chmod semantics here; rely on the filesystem's default
    // per-user ACLs for the containing directory.
    debug!(path = %path.display(), "relying on default filesystem permissions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_guard_locks_and_releases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        {
            let guard = LockedFile::open_write(&path).unwrap();
            #[cfg(any(unix, windows))]
            assert!(guard.is_locked());
        }

        // Lock must be gone after drop: re-acquiring succeeds.
        let guard2 = LockedFile::open_write(&path).unwrap();
        #[cfg(any(unix, windows))]
        assert!(guard2.is_locked());
    }

    #[cfg(unix)]
    #[test]
    fn open_write_keeps_contents_until_lock_is_held() {
        use std::io::Write;
        use std::os::unix::io::AsRawFd;
        use std::sync::mpsc;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, br#"{"salt": "AAAA"}"#).unwrap();

        // Hold the exclusive lock on a separate open file description.
        let holder = File::open(&path).unwrap();
        assert_eq!(unsafe { libc::flock(holder.as_raw_fd(), libc::LOCK_EX) }, 0);

        let (tx, rx) = mpsc::channel();
        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            let mut guard = LockedFile::open_write(&writer_path).unwrap();
            guard.file().write_all(b"{}").unwrap();
            tx.send(()).unwrap();
        });

        // The writer must block before truncating: while the lock is
        // held elsewhere, the old contents stay intact on disk.
        std::thread::sleep(Duration::from_millis(200));
        assert!(rx.try_recv().is_err(), "writer should still be blocked");
        assert_ne!(std::fs::metadata(&path).unwrap().len(), 0);

        drop(holder);
        writer.join().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn concurrent_readers_share_the_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{}").unwrap();

        let first = LockedFile::open_read(&path).unwrap();
        let second = LockedFile::open_read(&path).unwrap();
        assert!(first.is_locked());
        assert!(second.is_locked());
    }

    #[cfg(unix)]
    #[test]
    fn read_does_not_block_on_held_exclusive_lock() {
        use std::os::unix::io::AsRawFd;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{}").unwrap();

        let holder = File::open(&path).unwrap();
        assert_eq!(unsafe { libc::flock(holder.as_raw_fd(), libc::LOCK_EX) }, 0);

        // The read proceeds unlocked rather than hanging.
        let guard = LockedFile::open_read(&path).unwrap();
        assert!(!guard.is_locked());
    }

    #[test]
    fn open_read_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let result = LockedFile::open_read(&dir.path().join("absent.json"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn harden_permissions_sets_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{}").unwrap();

        harden_permissions(&path);

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn harden_permissions_missing_file_does_not_panic() {
        let dir = TempDir::new().unwrap();
        harden_permissions(&dir.path().join("absent.json"));
    }
}
