//! Configuration for the game WebSocket server.
//!
//! For now this is intentionally simple: you can either use defaults
//! or override via a few environment variables:
//!
//! - `REFEREE_BIND_ADDR`   (default: "0.0.0.0")
//! - `REFEREE_PORT`        (default: "8080")
//! - `REFEREE_MAX_CLIENTS` (default: "1024")
//! - `REFEREE_TOKEN_SECRET` (default: "insecure-dev-secret")

use std::env;
use std::str::FromStr;

use anyhow::Result;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Secret the token validator verifies signatures against.
    pub token_secret: String,
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("REFEREE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = read_env_or_default("REFEREE_PORT", 8080u16)?;
        let max_clients = read_env_or_default("REFEREE_MAX_CLIENTS", 1024usize)?;
        let token_secret =
            env::var("REFEREE_TOKEN_SECRET").unwrap_or_else(|_| "insecure-dev-secret".to_string());

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            token_secret,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
