use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::connection::DatabaseType;

/// The step of a connect call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Scheme,
    Config,
    Construct,
    Ping,
    Filesystem,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Parse => "parse",
            Stage::Scheme => "scheme",
            Stage::Config => "config",
            Stage::Construct => "construct",
            Stage::Ping => "ping",
            Stage::Filesystem => "filesystem",
        })
    }
}

/// Errors that can occur while opening a database connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("Invalid scheme: {0}. Expected 'mongodb' or 'mongodb+srv'")]
    InvalidScheme(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to open {backend} client: {reason}")]
    Client {
        backend: DatabaseType,
        reason: String,
    },
    #[error("Failed to ping {backend}: {reason}")]
    Ping {
        backend: DatabaseType,
        reason: String,
    },
    #[error("Failed to create SQLite database file {}: {source}", .path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Driver not available: {0} (not compiled)")]
    DriverNotAvailable(&'static str),
}

impl ConnectionError {
    pub fn stage(&self) -> Stage {
        match self {
            ConnectionError::InvalidConnectionString(_) => Stage::Parse,
            ConnectionError::InvalidScheme(_) => Stage::Scheme,
            ConnectionError::InvalidConfig(_) | ConnectionError::DriverNotAvailable(_) => {
                Stage::Config
            }
            ConnectionError::Client { .. } => Stage::Construct,
            ConnectionError::Ping { .. } => Stage::Ping,
            ConnectionError::CreateFile { .. } => Stage::Filesystem,
        }
    }

    pub(crate) fn client(backend: DatabaseType, reason: impl fmt::Display) -> Self {
        ConnectionError::Client {
            backend,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn ping(backend: DatabaseType, reason: impl fmt::Display) -> Self {
        ConnectionError::Ping {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Emit the error on the log sink and hand it back
    pub(crate) fn logged(self) -> Self {
        tracing::error!(stage = %self.stage(), "{}", self);
        self
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_follow_variants() {
        assert_eq!(
            ConnectionError::InvalidScheme("http".into()).stage(),
            Stage::Scheme
        );
        assert_eq!(
            ConnectionError::ping(DatabaseType::Redis, "refused").stage(),
            Stage::Ping
        );
        assert_eq!(
            ConnectionError::DriverNotAvailable("mysql").stage(),
            Stage::Config
        );
    }

    #[test]
    fn messages_name_the_backend() {
        let err = ConnectionError::client(DatabaseType::PostgreSQL, "bad port");
        assert_eq!(err.to_string(), "Failed to open PostgreSQL client: bad port");

        let err = ConnectionError::InvalidScheme("http".into());
        assert_eq!(
            err.to_string(),
            "Invalid scheme: http. Expected 'mongodb' or 'mongodb+srv'"
        );
    }
}
