use crate::cli::ServeArgs;
use crate::support::exit_with;
use bugtrack_server::{ServerConfig, serve};
use std::net::SocketAddr;
use std::path::PathBuf;

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            bind: SocketAddr::new(args.bind, args.port),
            bugs_path: PathBuf::from(args.bugs),
            frontend_url: args.frontend_url,
            webhook_url: args.webhook_url,
            environment: args.environment,
        }
    }
}

pub fn run(args: ServeArgs) {
    let config = ServerConfig::from(args);

    println!("bugtrack serve");
    println!("  bind: {}", config.bind);
    println!("  bugs: {}", config.bugs_path.display());
    println!("  environment: {}", config.environment);
    println!("  routes:");
    println!("    GET    /api/health");
    println!("    GET    /api/bugs[?status=&priority=&source=&assignedTo=&sortBy=&order=]");
    println!("    POST   /api/bugs");
    println!("    POST   /api/bugs/feedback");
    println!("    GET    /api/bugs/:id");
    println!("    PUT    /api/bugs/:id");
    println!("    DELETE /api/bugs/:id");
    println!("    PATCH  /api/bugs/:id/status");
    println!("    POST   /api/bugs/:id/comments");

    let runtime = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| exit_with(format!("failed to start async runtime: {e}")));
    if let Err(e) = runtime.block_on(serve(config)) {
        exit_with(format!("bugtrack API failed: {e}"));
    }
}
