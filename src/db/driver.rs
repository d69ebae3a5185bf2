use tracing::debug;

use super::connection::{Connection, DatabaseType};
use super::error::{ConnectionError, Result};

/// A live, pinged client for one of the supported backends
pub enum DatabaseHandle {
    #[cfg(feature = "mongodb")]
    MongoDB(mongodb::Client),
    #[cfg(feature = "mysql")]
    MySQL(mysql_async::Pool),
    #[cfg(feature = "postgres")]
    PostgreSQL(tokio_postgres::Client),
    #[cfg(feature = "sqlite-driver")]
    SQLite(rusqlite::Connection),
    #[cfg(feature = "redis")]
    Redis(redis::Client),
}

impl DatabaseHandle {
    pub fn db_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "mongodb")]
            DatabaseHandle::MongoDB(_) => DatabaseType::MongoDB,
            #[cfg(feature = "mysql")]
            DatabaseHandle::MySQL(_) => DatabaseType::MySQL,
            #[cfg(feature = "postgres")]
            DatabaseHandle::PostgreSQL(_) => DatabaseType::PostgreSQL,
            #[cfg(feature = "sqlite-driver")]
            DatabaseHandle::SQLite(_) => DatabaseType::SQLite,
            #[cfg(feature = "redis")]
            DatabaseHandle::Redis(_) => DatabaseType::Redis,
        }
    }
}

impl std::fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DatabaseHandle").field(&self.db_type()).finish()
    }
}

/// Factory function - opens the right connection type based on the profile's backend
pub async fn create_connection(profile: &Connection) -> Result<DatabaseHandle> {
    if !profile.db_type.is_available() {
        return Err(ConnectionError::DriverNotAvailable(profile.db_type.feature_name()).logged());
    }
    debug!("Opening profile {:?} ({})", profile.name, profile.db_type);

    let conn_str = profile.connection_string()?;

    match profile.db_type {
        #[cfg(feature = "mongodb")]
        DatabaseType::MongoDB => {
            let client = super::drivers::mongo::connect_mongodb(&conn_str).await?;
            Ok(DatabaseHandle::MongoDB(client))
        }

        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => {
            let pool = super::drivers::mysql::connect_mysql(conn_str).await?;
            Ok(DatabaseHandle::MySQL(pool))
        }

        #[cfg(feature = "postgres")]
        DatabaseType::PostgreSQL => {
            let client = super::drivers::postgres::connect_postgres(&conn_str).await?;
            Ok(DatabaseHandle::PostgreSQL(client))
        }

        #[cfg(feature = "sqlite-driver")]
        DatabaseType::SQLite => {
            use super::drivers::sqlite::connect_sqlite;

            // An explicit string is a DSN, a built one is the database file path
            let conn = match profile.connection_string {
                Some(_) => connect_sqlite(conn_str.as_str(), "").await?,
                None => connect_sqlite("", conn_str.as_str()).await?,
            };
            Ok(DatabaseHandle::SQLite(conn))
        }

        #[cfg(feature = "redis")]
        DatabaseType::Redis => {
            let client = super::drivers::redis_driver::connect_redis(conn_str).await?;
            Ok(DatabaseHandle::Redis(client))
        }

        // Fallback for when feature not compiled
        #[allow(unreachable_patterns)]
        _ => Err(ConnectionError::DriverNotAvailable(profile.db_type.feature_name()).logged()),
    }
}
