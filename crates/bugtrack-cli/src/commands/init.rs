use crate::support::{exit_with, print_json, yes_no};
use bugtrack_server::DEFAULT_BUGS_PATH;
use bugtrack_store::MemoryStore;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub root: PathBuf,
    pub bugs_path: PathBuf,
    pub created_root: bool,
    pub created_bugs_file: bool,
}

pub fn init_layout(path: impl AsRef<Path>) -> Result<InitOutcome, String> {
    let root = path.as_ref().to_path_buf();

    let mut created_root = false;
    if !root.exists() {
        fs::create_dir_all(&root)
            .map_err(|e| format!("failed to create init path {}: {e}", root.display()))?;
        created_root = true;
    }
    if !root.is_dir() {
        return Err(format!("init path is not a directory: {}", root.display()));
    }

    let bugs_path = root.join(DEFAULT_BUGS_PATH);
    if bugs_path.exists() && !bugs_path.is_file() {
        return Err(format!(
            "bugs path exists but is not a file: {}",
            bugs_path.display()
        ));
    }

    let mut created_bugs_file = false;
    if !bugs_path.exists() {
        MemoryStore::default()
            .save_jsonl(&bugs_path)
            .map_err(|e| format!("failed to initialize {}: {e}", bugs_path.display()))?;
        created_bugs_file = true;
    }

    Ok(InitOutcome {
        root,
        bugs_path,
        created_root,
        created_bugs_file,
    })
}

pub fn run(path: String, json_output: bool) {
    let outcome = init_layout(&path).unwrap_or_else(|e| exit_with(e));

    if json_output {
        print_json(&json!({
            "action": "init",
            "root": outcome.root.display().to_string(),
            "bugsPath": outcome.bugs_path.display().to_string(),
            "createdRoot": outcome.created_root,
            "createdBugsFile": outcome.created_bugs_file
        }));
        return;
    }

    println!("bugtrack init {path}");
    println!();
    println!("  root: {}", outcome.root.display());
    println!("  bugs path: {}", outcome.bugs_path.display());
    println!("  created root: {}", yes_no(outcome.created_root));
    println!("  created bugs file: {}", yes_no(outcome.created_bugs_file));
}
