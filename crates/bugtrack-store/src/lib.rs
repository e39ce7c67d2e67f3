//! # bugtrack-store
//!
//! Entity store for bug records.
//!
//! This crate provides:
//! - `Bug` and its append-only sub-collections (comments, status history)
//! - schema validation over `BugFields` write payloads
//! - `MemoryStore` (canonical in-memory state plus the entity operations)
//! - JSONL read/write and lock-scoped atomic mutation (the document file)
//! - `BugStore`, the shared handle the API layer talks to
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per bug)
//!     ↕  load / atomic rename
//! MemoryStore (one read-modify-write per mutation)
//!     ↑
//! BugStore (in-process writer serialization)
//! ```

pub mod atomic_store;
pub mod bug;
pub mod error;
pub mod fields;
pub mod jsonl;
pub mod memory;
pub mod query;
pub mod store;

pub use atomic_store::{DocumentLock, bugs_lock_path, mutate_store_jsonl};
pub use bug::{
    Bug, Comment, Customer, MAX_COMMENT_CHARS, MAX_DESCRIPTION_CHARS, MAX_REASON_CHARS,
    MAX_REPORTED_BY_CHARS, MAX_TITLE_CHARS, Priority, SYSTEM_ACTOR, Source, Status, StatusChange,
    new_bug_id, parse_bug_id,
};
pub use error::{StoreError, ValidationError, Violation};
pub use fields::{BugFields, CustomerFields, ValidBugFields};
pub use jsonl::{JsonlError, read_bugs, read_bugs_from_path, write_bugs, write_bugs_to_path};
pub use memory::MemoryStore;
pub use query::{BugFilter, BugQuery, SortField, SortOrder};
pub use store::BugStore;
