use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::settings::{
    BackupSettings, ConnectionSettings, RestoreSettings, DEFAULT_DATA_ROOT, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER,
};
use crate::error::{Error, Result};
use crate::ops;

/// chfreeze: partition-level backup and restore for ClickHouse
#[derive(Parser, Debug)]
#[command(
    name = "chfreeze",
    version,
    about = "Freeze ClickHouse partitions and copy them, with table metadata, into an archive.",
    long_about = None,
    disable_help_flag = true
)]
pub struct Cli {
    /// Print help (`-h` is the host)
    #[arg(long, action = ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,

    /// Backup mode
    #[arg(long)]
    pub backup: bool,

    /// Restore mode
    #[arg(long)]
    pub restore: bool,

    /// Server hostname
    #[arg(short = 'h', long = "host", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Database name (required for restore, limits backup to one database); `-db` also works
    #[arg(long = "db", value_name = "name")]
    pub database: Option<String>,

    /// Show debug info, including every statement sent to the server
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Do not freeze, only show partitions
    #[arg(long = "no-freeze")]
    pub no_freeze: bool,

    /// Source directory (/var/lib/clickhouse for backup mode by default)
    #[arg(long = "in", value_name = "dir")]
    pub input: Option<PathBuf>,

    /// Destination directory (/var/lib/clickhouse for restore mode by default)
    #[arg(long = "out", value_name = "dir")]
    pub output: Option<PathBuf>,

    /// Server user
    #[arg(short = 'u', long = "user", default_value = DEFAULT_USER)]
    pub user: String,

    /// Server password
    #[arg(long, conflicts_with = "ask_password")]
    pub password: Option<String>,

    /// Prompt for the server password
    #[arg(long = "ask-password")]
    pub ask_password: bool,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "secs", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Backup,
    Restore,
}

impl Cli {
    /// `Ok(None)` when neither mode was chosen.
    pub fn mode(&self) -> Result<Option<Mode>> {
        match (self.backup, self.restore) {
            (true, true) => Err(Error::ConflictingModes),
            (true, false) => Ok(Some(Mode::Backup)),
            (false, true) => Ok(Some(Mode::Restore)),
            (false, false) => Ok(None),
        }
    }

    fn database(&self) -> Option<String> {
        self.database.clone().filter(|db| !db.is_empty())
    }

    pub fn connection_settings(&self) -> Result<ConnectionSettings> {
        let password = if self.ask_password {
            Some(ops::prompt_password(&format!("Password for {}@{}: ", self.user, self.host))?)
        } else {
            self.password.clone()
        };
        Ok(ConnectionSettings {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password,
            debug: self.debug,
            timeout: Duration::from_secs(self.timeout),
        })
    }

    pub fn backup_settings(&self) -> Result<BackupSettings> {
        let destination_root = self
            .output
            .clone()
            .ok_or_else(|| Error::Config("please set destination directory".into()))?;
        Ok(BackupSettings {
            database: self.database(),
            source_root: self.input.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT)),
            destination_root,
            dry_run: self.no_freeze,
        })
    }

    pub fn restore_settings(&self) -> Result<RestoreSettings> {
        let source_root = self
            .input
            .clone()
            .ok_or_else(|| Error::Config("please set source directory".into()))?;
        let database = self
            .database()
            .ok_or_else(|| Error::Config("please set database for restore".into()))?;
        Ok(RestoreSettings {
            database,
            source_root,
            destination_root: self.output.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT)),
        })
    }
}

/// Accept the historical single-dash `-db` spelling, which clap would
/// otherwise read as `-d -b`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.to_str() {
            Some("-db") => OsString::from("--db"),
            Some(s) if s.starts_with("-db=") => OsString::from(format!("-{s}")),
            _ => arg,
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn parse(args: &[&str]) -> Cli {
    let mut full = vec!["chfreeze"];
    full.extend_from_slice(args);
    Cli::try_parse_from(normalize_args(full)).unwrap()
}
