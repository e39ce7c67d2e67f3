//! The bugs document: one JSON-encoded bug per line.
//!
//! Loading checks more than syntax. A document is rejected when two lines
//! share an id, or when a record contradicts itself (history that does not
//! end at the current status, a customer block on an internal bug,
//! `updatedAt` before `createdAt`). Writes emit bugs oldest first and replace
//! the file through a sibling temp file and a rename.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bug::{Bug, Source, parse_bug_id};

/// Errors from decoding or persisting the bugs document.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("line {line}: not a bug record: {message}")]
    Parse { line: usize, message: String },

    #[error("failed to encode bug {id}: {message}")]
    Encode { id: String, message: String },

    #[error("{path}: unreadable document: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("line {line}: bug {id} already defined on line {first_line}")]
    DuplicateId {
        id: String,
        line: usize,
        first_line: usize,
    },

    #[error("line {line}: bug {id} is inconsistent: {reason}")]
    Inconsistent {
        id: String,
        line: usize,
        reason: String,
    },
}

/// Decode a bugs document. Blank lines are ignored.
pub fn read_bugs(document: &str) -> Result<Vec<Bug>, JsonlError> {
    let mut bugs = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, raw) in document.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let bug: Bug = serde_json::from_str(raw).map_err(|e| JsonlError::Parse {
            line,
            message: e.to_string(),
        })?;
        check_record(&bug, line)?;
        if let Some(&first_line) = seen.get(&bug.id) {
            return Err(JsonlError::DuplicateId {
                id: bug.id,
                line,
                first_line,
            });
        }
        seen.insert(bug.id.clone(), line);
        bugs.push(bug);
    }
    Ok(bugs)
}

/// Encode bugs oldest first, one per line.
pub fn write_bugs(writer: &mut impl Write, bugs: &[Bug]) -> Result<(), JsonlError> {
    let mut ordered: Vec<&Bug> = bugs.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    for bug in ordered {
        let encoded = serde_json::to_string(bug).map_err(|e| JsonlError::Encode {
            id: bug.id.clone(),
            message: e.to_string(),
        })?;
        writeln!(writer, "{encoded}").map_err(|e| JsonlError::Io {
            path: "<writer>".to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

/// Load and decode the document at `path`.
pub fn read_bugs_from_path(path: impl AsRef<Path>) -> Result<Vec<Bug>, JsonlError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    let document = String::from_utf8(bytes).map_err(|_| JsonlError::Corrupt {
        path: path.display().to_string(),
        reason: "not valid UTF-8".to_string(),
    })?;
    if let Some(line) = document.lines().position(|l| l.contains('\0')) {
        return Err(JsonlError::Corrupt {
            path: path.display().to_string(),
            reason: format!("NUL byte on line {}", line + 1),
        });
    }
    read_bugs(&document)
}

/// Replace the document at `path` with `bugs`.
pub fn write_bugs_to_path(path: impl AsRef<Path>, bugs: &[Bug]) -> Result<(), JsonlError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let staged = staging_path(path);
    if let Err(err) = write_staged(&staged, bugs) {
        let _ = fs::remove_file(&staged);
        return Err(err);
    }
    fs::rename(&staged, path).map_err(|e| {
        let _ = fs::remove_file(&staged);
        io_error(path, e)
    })
}

fn write_staged(staged: &Path, bugs: &[Bug]) -> Result<(), JsonlError> {
    let file = File::create(staged).map_err(|e| io_error(staged, e))?;
    let mut writer = BufWriter::new(file);
    write_bugs(&mut writer, bugs)?;
    let file = writer
        .into_inner()
        .map_err(|e| io_error(staged, e.into_error()))?;
    file.sync_all().map_err(|e| io_error(staged, e))
}

fn check_record(bug: &Bug, line: usize) -> Result<(), JsonlError> {
    let inconsistent = |reason: &str| JsonlError::Inconsistent {
        id: bug.id.clone(),
        line,
        reason: reason.to_string(),
    };

    if parse_bug_id(&bug.id).ok().as_deref() != Some(bug.id.as_str()) {
        return Err(inconsistent("id is not a canonical bug id"));
    }
    if bug.updated_at < bug.created_at {
        return Err(inconsistent("updatedAt precedes createdAt"));
    }
    if let Some(last) = bug.status_history.last()
        && last.to != bug.status
    {
        return Err(inconsistent("status history does not end at current status"));
    }
    if bug.customer.is_some() && bug.source != Source::Customer {
        return Err(inconsistent("customer block on an internal bug"));
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut staged: OsString = path.as_os_str().to_os_string();
    staged.push(format!(".staged-{}-{stamp}", std::process::id()));
    PathBuf::from(staged)
}

fn io_error(path: &Path, err: std::io::Error) -> JsonlError {
    JsonlError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
