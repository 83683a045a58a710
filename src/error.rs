use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[{code}] {message}")]
    Server { code: i32, message: String },

    #[error("connection failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("can't decode server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} exists and is not a directory")]
    NotADirectory(PathBuf),

    #[error("{0} not found")]
    MissingDirectory(PathBuf),

    #[error("{0}")]
    Config(String),

    #[error("Run in only one mode (backup or restore)")]
    ConflictingModes,

    #[error("database '{database}' not found in archive {archive}")]
    DatabaseNotInArchive { database: String, archive: PathBuf },

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io { path: path.as_ref().to_path_buf(), source }
    }
}

/// Attach the offending path to a bare `io::Result`.
pub trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
