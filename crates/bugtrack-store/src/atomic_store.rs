//! Cross-process exclusion for the bugs document.
//!
//! A writer owns the document while a sibling `<document>.lock` file exists.
//! The lock file names its holder (`pid=`, `acquired=`) so a contended caller
//! can say who is in the way. Acquisition never waits.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::{MemoryStore, StoreError};

const UNKNOWN_HOLDER: &str = "unknown holder";

pub fn bugs_lock_path(bugs_path: &Path) -> PathBuf {
    let mut path: OsString = bugs_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Exclusive hold on one bugs document. Released on drop.
#[derive(Debug)]
pub struct DocumentLock {
    document: PathBuf,
    lock_path: PathBuf,
}

impl DocumentLock {
    pub fn acquire(document: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let document = document.into();
        let lock_path = bugs_lock_path(&document);
        if let Some(dir) = lock_path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|e| lock_io(&lock_path, e))?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::LockBusy {
                    holder: lock_holder(&lock_path),
                    lock_path: lock_path.display().to_string(),
                });
            }
            Err(e) => return Err(lock_io(&lock_path, e)),
        };

        // From here on the lock file is ours; drop removes it on any failure.
        let lock = Self {
            document,
            lock_path,
        };
        writeln!(
            file,
            "pid={}\nacquired={}",
            std::process::id(),
            Utc::now().to_rfc3339()
        )
        .map_err(|e| lock_io(&lock.lock_path, e))?;
        Ok(lock)
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    /// Current contents of the held document.
    pub fn load(&self) -> Result<MemoryStore, StoreError> {
        MemoryStore::load_jsonl(&self.document)
    }

    /// Replace the held document with `store`.
    pub fn commit(&self, store: &MemoryStore) -> Result<(), StoreError> {
        store.save_jsonl(&self.document)
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// Load the document under its lock, apply `mutator`, and commit the result.
/// A mutator error leaves the file untouched.
pub fn mutate_store_jsonl<T, F>(path: impl AsRef<Path>, mutator: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut MemoryStore) -> Result<T, StoreError>,
{
    let lock = DocumentLock::acquire(path.as_ref())?;
    let mut store = lock.load()?;
    let value = mutator(&mut store)?;
    lock.commit(&store)?;
    Ok(value)
}

/// `pid` recorded in a lock file, for contention messages.
fn lock_holder(lock_path: &Path) -> String {
    fs::read_to_string(lock_path)
        .ok()
        .and_then(|text| {
            text.lines()
                .find_map(|line| line.strip_prefix("pid="))
                .map(|pid| format!("pid {}", pid.trim()))
        })
        .unwrap_or_else(|| UNKNOWN_HOLDER.to_string())
}

fn lock_io(lock_path: &Path, err: std::io::Error) -> StoreError {
    StoreError::LockIo {
        lock_path: lock_path.display().to_string(),
        message: err.to_string(),
    }
}
