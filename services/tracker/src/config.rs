use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;

use crate::db::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    /// Deadline applied to every store call.
    pub store_timeout: Duration,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("MAILBOX_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = std::env::var("MAILBOX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("MAILBOX_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let store_timeout = match std::env::var("MAILBOX_STORE_TIMEOUT_MS") {
            Ok(ms) => Duration::from_millis(ms.parse()?),
            Err(_) => Duration::from_millis(5000),
        };

        let database = DbConfig::from_env();

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            store_timeout,
            database,
        })
    }
}
