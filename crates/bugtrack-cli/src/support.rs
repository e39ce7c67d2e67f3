use bugtrack_store::MemoryStore;
use serde_json::Value;
use std::path::PathBuf;
use std::process;

pub fn yes_no(ok: bool) -> &'static str {
    if ok { "yes" } else { "no" }
}

pub fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

pub fn print_json(payload: &Value) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with(format!("failed to render JSON output: {e}")),
    }
}

/// Load an existing bugs file; a missing file is an error rather than an
/// empty store.
pub fn load_store_existing_or_exit(bugs: &str) -> (MemoryStore, PathBuf) {
    let path = PathBuf::from(bugs);
    if !path.exists() {
        exit_with(format!(
            "bugs file not found: {} (run `bugtrack init` first)",
            path.display()
        ));
    }
    let store = MemoryStore::load_jsonl(&path)
        .unwrap_or_else(|e| exit_with(format!("failed to load {}: {e}", path.display())));
    (store, path)
}
