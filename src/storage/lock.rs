//! Advisory per-table lock.
//!
//! One engine owns a table's file triple at a time. The lock is a file
//! created with `create_new` next to the data file and removed on drop;
//! a second open of the same table fails instead of racing the first.
//! The lock is advisory only and does not survive process crashes, so a
//! leftover lock file after a crash must be removed by the operator.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;

use eyre::{bail, Result, WrapErr};

#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

impl DirLock {
    /// Takes the lock at `path`, failing if another engine holds it.
    pub fn acquire(path: PathBuf) -> Result<Self> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!(
                    "table is locked by another engine ('{}' exists)",
                    path.display()
                )
            }
            Err(e) => Err(e)
                .wrap_err_with(|| format!("failed to create lock file '{}'", path.display())),
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_excludes_second_holder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tbl.lock");

        let lock = DirLock::acquire(path.clone()).unwrap();
        assert!(DirLock::acquire(path.clone()).is_err());

        drop(lock);
        let _relock = DirLock::acquire(path).unwrap();
    }

    #[test]
    fn lock_file_removed_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tbl.lock");

        let lock = DirLock::acquire(path.clone()).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }
}
