use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite:chores.db";

/// Runtime configuration, read once at startup from the environment
/// (optionally seeded from a `.env` file).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("CHORES_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let host = env::var("CHORES_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("CHORES_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("CHORES_PORT must be a valid port number")?;

        Ok(Self {
            database_url,
            host,
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("invalid host address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_localhost() {
        let config = Config {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "localhost".to_string(),
            port: 4000,
        };
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:4000");
    }

    #[test]
    fn test_socket_addr_rejects_garbage_host() {
        let config = Config {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "not-an-address".to_string(),
            port: 4000,
        };
        assert!(config.socket_addr().is_err());
    }
}
