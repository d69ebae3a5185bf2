//! SQLite driver implementation

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::db::connection::DatabaseType;
use crate::db::error::{ConnectionError, Result};

/// Open an SQLite database and ping it.
///
/// A non-empty `dsn` is used as-is. Otherwise `file_path` is opened as
/// `file:<path>?cache=shared&mode=rwc`, creating an empty file first when
/// nothing exists at that path. Both empty is a configuration error.
pub async fn connect_sqlite(dsn: &str, file_path: impl AsRef<Path>) -> Result<Connection> {
    let dsn = resolve_dsn(dsn, file_path.as_ref()).map_err(ConnectionError::logged)?;

    info!("Opening SQLite database {}", dsn);

    // SQLite is synchronous, so we run it in a blocking task
    let result = tokio::task::spawn_blocking(move || {
        let conn = Connection::open(&dsn)
            .map_err(|e| ConnectionError::client(DatabaseType::SQLite, e))?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| ConnectionError::ping(DatabaseType::SQLite, e))?;
        Ok::<_, ConnectionError>(conn)
    })
    .await
    .map_err(|e| ConnectionError::client(DatabaseType::SQLite, e))
    .and_then(|opened| opened);

    let conn = result.map_err(ConnectionError::logged)?;
    info!("Successfully connected to SQLite database");
    Ok(conn)
}

fn resolve_dsn(dsn: &str, file_path: &Path) -> Result<String> {
    if !dsn.is_empty() {
        return Ok(dsn.to_string());
    }
    if file_path.as_os_str().is_empty() {
        return Err(ConnectionError::InvalidConfig(
            "both connection string and file path are empty".into(),
        ));
    }

    match OpenOptions::new().write(true).create_new(true).open(file_path) {
        Ok(_) => info!(
            "SQLite database file did not exist, created new database at {}",
            file_path.display()
        ),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(source) => {
            return Err(ConnectionError::CreateFile {
                path: file_path.to_path_buf(),
                source,
            })
        }
    }

    Ok(file_uri(file_path))
}

fn file_uri(file_path: &Path) -> String {
    let path = file_path
        .to_string_lossy()
        .replace('%', "%25")
        .replace('?', "%3f")
        .replace('#', "%23");
    format!("file:{path}?cache=shared&mode=rwc")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::error::Stage;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[test]
    fn dsn_wins_over_file_path() {
        let dsn = resolve_dsn("file::memory:?cache=shared", Path::new("ignored.db")).unwrap();
        assert_eq!(dsn, "file::memory:?cache=shared");
        assert!(!Path::new("ignored.db").exists());
    }

    #[test]
    fn both_inputs_empty_is_a_config_error() {
        let err = resolve_dsn("", Path::new("")).unwrap_err();
        assert_eq!(err.stage(), Stage::Config);
    }

    #[test]
    #[traced_test]
    fn missing_file_is_created_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");

        let dsn = resolve_dsn("", &path).unwrap();

        assert_eq!(dsn, format!("file:{}?cache=shared&mode=rwc", path.display()));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert!(logs_contain("created new database"));
    }

    #[test]
    #[traced_test]
    fn existing_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kept.db");
        std::fs::write(&path, b"not touched").unwrap();

        resolve_dsn("", &path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"not touched");
        assert!(!logs_contain("created new database"));
    }

    #[test]
    fn unwritable_location_is_a_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("app.db");

        let err = resolve_dsn("", &path).unwrap_err();

        assert_eq!(err.stage(), Stage::Filesystem);
    }

    #[test]
    fn uri_reserved_characters_are_escaped() {
        assert_eq!(
            file_uri(Path::new("data/what?#.db")),
            "file:data/what%3f%23.db?cache=shared&mode=rwc"
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn in_memory_dsn_opens_and_pings() {
        let conn = connect_sqlite("file::memory:", "").await.unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
        assert!(logs_contain("Successfully connected to SQLite database"));
    }
}
