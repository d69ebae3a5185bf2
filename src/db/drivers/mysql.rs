//! MySQL driver implementation

use std::collections::BTreeMap;
use std::path::PathBuf;

use mysql_async::prelude::*;
use mysql_async::{Opts, Pool};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::db::connection::DatabaseType;
use crate::db::error::{ConnectionError, Result};

/// How the client reaches the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MySqlTransport {
    #[default]
    Tcp,
    Socket(PathBuf),
}

/// Structured MySQL connection settings, rendered to a `mysql://` DSN by [`MySqlConfig::to_dsn`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub transport: MySqlTransport,
    pub prefer_socket: Option<bool>,
    pub tcp_nodelay: Option<bool>,
    pub stmt_cache_size: Option<usize>,
    /// Extra driver URL parameters, passed through untouched
    pub params: BTreeMap<String, String>,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DatabaseType::MySQL.default_port(),
            user: None,
            password: None,
            database: None,
            transport: MySqlTransport::Tcp,
            prefer_socket: None,
            tcp_nodelay: None,
            stmt_cache_size: None,
            params: BTreeMap::new(),
        }
    }
}

impl MySqlConfig {
    pub fn to_dsn(&self) -> Result<String> {
        let invalid = |what: &str| {
            ConnectionError::InvalidConfig(format!("cannot set MySQL {what} for host {:?}", self.host))
        };

        let mut url = Url::parse(&format!("mysql://{}", self.host))
            .map_err(|e| ConnectionError::InvalidConfig(format!("invalid MySQL host {:?}: {e}", self.host)))?;
        url.set_port(Some(self.port)).map_err(|_| invalid("port"))?;
        if let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) {
            url.set_username(user).map_err(|_| invalid("user"))?;
        }
        if let Some(password) = self.password.as_deref() {
            url.set_password(Some(password)).map_err(|_| invalid("password"))?;
        }
        if let Some(database) = self.database.as_deref().filter(|d| !d.is_empty()) {
            url.set_path(&format!("/{database}"));
        }

        let mut query: Vec<(&str, String)> = Vec::new();
        if let MySqlTransport::Socket(path) = &self.transport {
            query.push(("socket", path.display().to_string()));
        }
        if let Some(prefer_socket) = self.prefer_socket {
            query.push(("prefer_socket", prefer_socket.to_string()));
        }
        if let Some(tcp_nodelay) = self.tcp_nodelay {
            query.push(("tcp_nodelay", tcp_nodelay.to_string()));
        }
        if let Some(size) = self.stmt_cache_size {
            query.push(("stmt_cache_size", size.to_string()));
        }
        for (key, value) in &self.params {
            query.push((key, value.clone()));
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url.to_string())
    }
}

/// Either a ready DSN or structured settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MySqlInput {
    Dsn(String),
    Config(MySqlConfig),
}

impl MySqlInput {
    fn dsn(&self) -> Result<String> {
        match self {
            MySqlInput::Dsn(dsn) => Ok(dsn.clone()),
            MySqlInput::Config(config) => config.to_dsn(),
        }
    }
}

impl From<&str> for MySqlInput {
    fn from(dsn: &str) -> Self {
        MySqlInput::Dsn(dsn.to_string())
    }
}

impl From<String> for MySqlInput {
    fn from(dsn: String) -> Self {
        MySqlInput::Dsn(dsn)
    }
}

impl From<MySqlConfig> for MySqlInput {
    fn from(config: MySqlConfig) -> Self {
        MySqlInput::Config(config)
    }
}

/// Build a MySQL pool and ping one pooled connection before handing the pool back.
pub async fn connect_mysql(input: impl Into<MySqlInput>) -> Result<Pool> {
    let dsn = input.into().dsn().map_err(ConnectionError::logged)?;
    let opts = Opts::from_url(&dsn)
        .map_err(|e| ConnectionError::InvalidConnectionString(e.to_string()).logged())?;

    info!(
        "Connecting to MySQL at {}:{}",
        opts.ip_or_hostname(),
        opts.tcp_port()
    );
    let pool = Pool::new(opts);

    let mut conn = match pool.get_conn().await {
        Ok(conn) => conn,
        Err(e) => {
            pool.disconnect().await.ok();
            return Err(ConnectionError::ping(DatabaseType::MySQL, e).logged());
        }
    };

    info!("Pinging MySQL");
    if let Err(e) = conn.ping().await {
        drop(conn);
        pool.disconnect().await.ok();
        return Err(ConnectionError::ping(DatabaseType::MySQL, e).logged());
    }
    drop(conn);

    info!("Successfully connected to MySQL");
    Ok(pool)
}
