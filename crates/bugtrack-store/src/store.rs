//! `BugStore`: the entity store handle shared by callers.
//!
//! Wraps a document backend and serializes writers inside one process, so
//! concurrent callers queue rather than trip the cross-process file lock.
//! Each mutating call is one read-modify-write with last-write-wins
//! semantics; there is no version check.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::atomic_store::mutate_store_jsonl;
use crate::bug::{Bug, Comment};
use crate::error::StoreError;
use crate::fields::BugFields;
use crate::memory::MemoryStore;
use crate::query::BugQuery;

#[derive(Debug)]
enum Backend {
    /// JSONL document file, reloaded for every operation.
    Jsonl { path: PathBuf, writer: Mutex<()> },
    /// Process-local state, lost on drop.
    Memory(Mutex<MemoryStore>),
}

#[derive(Debug)]
pub struct BugStore {
    backend: Backend,
}

impl BugStore {
    /// Open (creating if absent) a JSONL-backed store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            MemoryStore::default().save_jsonl(&path)?;
        }
        MemoryStore::load_jsonl(&path)?;
        Ok(Self {
            backend: Backend::Jsonl {
                path,
                writer: Mutex::new(()),
            },
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(MemoryStore::default())),
        }
    }

    /// Backing file, when the store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Jsonl { path, .. } => Some(path.as_path()),
            Backend::Memory(_) => None,
        }
    }

    pub fn create(&self, fields: BugFields) -> Result<Bug, StoreError> {
        self.write(|store| store.create(fields))
    }

    pub fn find_by_id(&self, id: &str) -> Result<Bug, StoreError> {
        self.read(|store| store.find_by_id(id).cloned())
    }

    pub fn find_all(&self, query: &BugQuery) -> Result<Vec<Bug>, StoreError> {
        self.read(|store| Ok(store.find_all(query)))
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.read(|store| Ok(store.len()))
    }

    pub fn replace_fields(
        &self,
        id: &str,
        patch: BugFields,
        by: Option<String>,
    ) -> Result<Bug, StoreError> {
        self.write(|store| store.replace_fields(id, patch, by))
    }

    pub fn set_status(
        &self,
        id: &str,
        status: &str,
        reason: Option<String>,
        by: Option<String>,
    ) -> Result<Bug, StoreError> {
        self.write(|store| store.set_status(id, status, reason, by))
    }

    pub fn append_comment(
        &self,
        id: &str,
        author: Option<String>,
        message: Option<String>,
    ) -> Result<Comment, StoreError> {
        self.write(|store| store.append_comment(id, author, message))
    }

    pub fn delete(&self, id: &str) -> Result<Bug, StoreError> {
        self.write(|store| store.delete(id))
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match &self.backend {
            Backend::Jsonl { path, .. } => f(&MemoryStore::load_jsonl(path)?),
            Backend::Memory(store) => f(&*lock(store)),
        }
    }

    /// Run `f` against the current state and persist only if it succeeds.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match &self.backend {
            Backend::Jsonl { path, writer } => {
                let _writer = lock(writer);
                mutate_store_jsonl(path, f)
            }
            Backend::Memory(store) => {
                let mut guard = lock(store);
                let mut draft = guard.clone();
                let value = f(&mut draft)?;
                *guard = draft;
                Ok(value)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
