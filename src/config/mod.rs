use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 4300;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://taskd.db?mode=rwc";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Server configuration, resolved from CLI flags and environment variables
/// (`TASKD_PORT`, `TASKD_BIND`, `DATABASE_URL`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
    /// SQLite connection string, e.g. `sqlite:///var/lib/taskd/tasks.db?mode=rwc`.
    pub database_url: String,
}

impl ServerConfig {
    pub fn new(
        port: Option<u16>,
        bind_address: Option<String>,
        database_url: Option<String>,
    ) -> Self {
        Self {
            port: port.unwrap_or(DEFAULT_PORT),
            bind_address: bind_address.unwrap_or_else(default_bind_address),
            database_url: database_url.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::new(None, None, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr(), format!("127.0.0.1:{DEFAULT_PORT}"));
    }

    #[test]
    fn explicit_values_win() {
        let config = ServerConfig::new(
            Some(8080),
            Some("0.0.0.0".to_string()),
            Some("sqlite::memory:".to_string()),
        );
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_url, "sqlite::memory:");
    }
}
