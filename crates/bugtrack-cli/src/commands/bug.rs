use crate::cli::BugCommands;
use crate::support::{load_store_existing_or_exit, print_json};
use bugtrack_store::{Bug, BugFilter, BugQuery, SortField, SortOrder};
use serde_json::json;

pub fn run(command: BugCommands) {
    match command {
        BugCommands::List {
            status,
            priority,
            source,
            assigned_to,
            sort_by,
            order,
            bugs,
            json,
        } => {
            let query = BugQuery {
                filter: BugFilter {
                    status,
                    priority,
                    source,
                    assigned_to,
                },
                sort_by: SortField::parse_or_default(sort_by.as_deref()),
                order: SortOrder::parse_or_default(order.as_deref()),
            };
            run_list(query, bugs, json)
        }
    }
}

fn run_list(query: BugQuery, bugs: String, json_output: bool) {
    let (store, path) = load_store_existing_or_exit(&bugs);
    let rows: Vec<Bug> = store.find_all(&query);

    if json_output {
        print_json(&json!({
            "action": "bug.list",
            "bugsPath": path.display().to_string(),
            "count": rows.len(),
            "items": rows
        }));
        return;
    }

    println!(
        "bugtrack bug list\n  Path: {}\n  Count: {}",
        path.display(),
        rows.len()
    );
    for bug in rows {
        let assignee = if bug.assigned_to.is_empty() {
            String::new()
        } else {
            format!(" @{}", bug.assigned_to)
        };
        println!(
            "  - {} [{} {} {}] {}{}",
            bug.id,
            bug.status.as_str(),
            bug.priority.as_str(),
            bug.source.as_str(),
            bug.title,
            assignee
        );
    }
}
