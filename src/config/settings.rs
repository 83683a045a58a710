use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::utils::io::require_dirs;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_USER: &str = "default";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Storage root of a stock server install.
pub const DEFAULT_DATA_ROOT: &str = "/var/lib/clickhouse";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub debug: bool,
    pub timeout: Duration,
}

impl ConnectionSettings {
    pub fn url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}/", self.host, self.port)
        } else {
            format!("http://{}:{}/", self.host, self.port)
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: None,
            debug: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    /// Only this database when set, every database otherwise.
    pub database: Option<String>,
    /// Live storage root holding `shadow/` and `metadata/`.
    pub source_root: PathBuf,
    /// Archive root receiving `partitions/` and `metadata/`.
    pub destination_root: PathBuf,
    pub dry_run: bool,
}

impl BackupSettings {
    pub fn validate(&self) -> Result<()> {
        require_dirs([self.source_root.as_path(), self.destination_root.as_path()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSettings {
    pub database: String,
    /// Archive root produced by a backup run.
    pub source_root: PathBuf,
    /// Live storage root.
    pub destination_root: PathBuf,
}

impl RestoreSettings {
    pub fn validate(&self) -> Result<()> {
        require_dirs([self.source_root.as_path(), self.destination_root.as_path()])
    }
}
