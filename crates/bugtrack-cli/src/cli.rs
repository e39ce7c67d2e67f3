use bugtrack_server::{DEFAULT_BUGS_PATH, DEFAULT_PORT, Environment};
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;

#[derive(Parser)]
#[command(
    name = "bugtrack",
    about = "bugtrack: a small bug tracker with a JSON HTTP API over a JSONL store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Create the bug store layout under a directory
    Init {
        /// Directory to initialize
        #[arg(default_value = ".")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect bugs directly from the store file
    Bug {
        #[command(subcommand)]
        command: BugCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Path to the bugs JSONL file
    #[arg(long, env = "BUGTRACK_BUGS_PATH", default_value = DEFAULT_BUGS_PATH)]
    pub bugs: String,

    /// Address to bind
    #[arg(long, env = "BUGTRACK_BIND", default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Frontend origin allowed by CORS (any origin when unset)
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    /// Webhook receiving new-bug notices (disabled when unset)
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Runtime environment: development or production
    #[arg(long, env = "BUGTRACK_ENV", default_value = "production")]
    pub environment: Environment,
}

#[derive(Subcommand)]
pub enum BugCommands {
    /// List bugs with optional filters
    List {
        /// Filter by status (Open, In Progress, Resolved)
        #[arg(long)]
        status: Option<String>,

        /// Filter by priority (Low, Medium, High)
        #[arg(long)]
        priority: Option<String>,

        /// Filter by source (internal, customer)
        #[arg(long)]
        source: Option<String>,

        /// Filter by assignee
        #[arg(long)]
        assigned_to: Option<String>,

        /// Sort field: createdAt, updatedAt, title, priority, status
        #[arg(long)]
        sort_by: Option<String>,

        /// Sort order: asc or desc
        #[arg(long)]
        order: Option<String>,

        /// Path to the bugs JSONL file
        #[arg(long, default_value = DEFAULT_BUGS_PATH)]
        bugs: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
