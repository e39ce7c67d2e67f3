use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BUGS_PATH: &str = ".bugtrack/bugs.jsonl";
pub const DEFAULT_PORT: u16 = 5000;

/// Deployment mode. Development exposes internal error detail in 500s, so
/// it must be chosen explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment `{other}` (expected development or production)"
            )),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the server needs, resolved once at process start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub bugs_path: PathBuf,
    /// Allowed cross-origin frontend. `None` allows any origin.
    pub frontend_url: Option<String>,
    /// Creation notices go here. `None` disables them.
    pub webhook_url: Option<String>,
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            bugs_path: PathBuf::from(DEFAULT_BUGS_PATH),
            frontend_url: None,
            webhook_url: None,
            environment: Environment::default(),
        }
    }
}
