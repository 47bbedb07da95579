use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use wall_api::blocklist::Blocklist;
use wall_api::count::COUNT_TTL;

/// Server settings, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub blocked_names: String,
    pub blocked_wallets: String,
    pub count_ttl: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("WALL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("WALL_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()?;
        let db_path = std::env::var("WALL_DB_PATH")
            .unwrap_or_else(|_| "wall.db".into())
            .into();
        let count_ttl = std::env::var("WALL_COUNT_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(COUNT_TTL);

        Ok(Self {
            host,
            port,
            db_path,
            blocked_names: std::env::var("WALL_BLOCKED_NAMES").unwrap_or_default(),
            blocked_wallets: std::env::var("WALL_BLOCKED_WALLETS").unwrap_or_default(),
            count_ttl,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn blocklist(&self) -> Blocklist {
        Blocklist::from_lists(&self.blocked_names, &self.blocked_wallets)
    }
}
