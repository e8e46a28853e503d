use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::ArchiveError;

/// Lock file name inside the repository's git directory.
pub const LOCK_FILE_NAME: &str = "zip2commit.lock";

/// Per-repository run lock guard, released on drop.
///
/// The lock file stays in the git directory between runs. Deleting it would let a process that
/// opened the old file and a process that created a new one both hold "the" lock.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Clear the holder pid while still locked, then release; ignore errors.
        let _ = self.file.set_len(0);
        let _ = self.file.unlock();
    }
}

/// Acquire the run lock for the repository whose git directory is `git_dir`.
///
/// A lock held by another process is `RunInProgress`; never blocks.
pub fn acquire_run_lock(git_dir: &Path) -> Result<RunLock, ArchiveError> {
    let path = git_dir.join(LOCK_FILE_NAME);
    match acquire_lock_at(&path) {
        Ok(lock) => {
            tracing::debug!(lock = %path.display(), "run lock acquired");
            Ok(lock)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            tracing::warn!(lock = %path.display(), "run lock held by another process");
            Err(ArchiveError::RunInProgress(path))
        }
        Err(e) => Err(ArchiveError::Io(e)),
    }
}

/// Acquire a lock at a specific path. `WouldBlock` when another holder exists.
pub fn acquire_lock_at(p: &Path) -> io::Result<RunLock> {
    if let Some(parent) = p.parent() {
        let _ = fs::create_dir_all(parent);
    }
    // No truncate here: truncating before the lock is held would clobber the holder's pid.
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(p)?;
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = file.set_len(0);
            let _ = writeln!(file, "{}", std::process::id());
            Ok(RunLock {
                file,
                path: p.to_path_buf(),
            })
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(e),
        Err(e) => {
            // fs2 reports contention as a raw OS error on some platforms.
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                Err(io::Error::new(io::ErrorKind::WouldBlock, e))
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lock_is_run_in_progress() {
        let td = tempfile::tempdir().expect("tmpdir");
        let first = acquire_run_lock(td.path()).expect("first lock");
        assert_eq!(first.path(), td.path().join(LOCK_FILE_NAME));
        match acquire_run_lock(td.path()) {
            Err(ArchiveError::RunInProgress(p)) => assert_eq!(p, td.path().join(LOCK_FILE_NAME)),
            other => panic!("expected RunInProgress, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_releases_lock_and_keeps_file() {
        let td = tempfile::tempdir().expect("tmpdir");
        let path = td.path().join(LOCK_FILE_NAME);
        {
            let _lock = acquire_run_lock(td.path()).expect("lock");
            // Windows byte-range locks block reads through other handles.
            if cfg!(unix) {
                let pid = fs::read_to_string(&path).expect("read lock file");
                assert_eq!(pid.trim(), std::process::id().to_string());
            }
        }
        assert!(path.exists(), "lock file stays in place after release");
        assert_eq!(fs::read_to_string(&path).expect("read lock file"), "");

        let again = acquire_run_lock(td.path()).expect("relock after drop");
        // The same file is reused, so a concurrent acquirer contends on it.
        assert!(matches!(
            acquire_run_lock(td.path()),
            Err(ArchiveError::RunInProgress(_))
        ));
        drop(again);
    }
}
