//! Redis driver implementation

use redis::{
    Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo, ProtocolVersion,
    RedisConnectionInfo,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::connection::DatabaseType;
use crate::db::error::{ConnectionError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedisProtocol {
    #[default]
    Resp2,
    Resp3,
}

/// Structured Redis client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisOptions {
    /// `host:port`. An empty host means `localhost` and the port defaults to 6379.
    /// IPv6 hosts go in brackets (`[::1]:6379`); the driver prints them back
    /// without brackets.
    pub addr: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub db: i64,
    pub protocol: RedisProtocol,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self::new("localhost:6379")
    }
}

impl RedisOptions {
    /// Options for `addr` with no credentials on database 0
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            username: None,
            password: None,
            db: 0,
            protocol: RedisProtocol::Resp2,
        }
    }

    fn connection_info(&self) -> Result<ConnectionInfo> {
        let (host, port) = split_host_port(&self.addr)?;
        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host, port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: self.username.clone(),
                password: self.password.clone(),
                protocol: match self.protocol {
                    RedisProtocol::Resp2 => ProtocolVersion::RESP2,
                    RedisProtocol::Resp3 => ProtocolVersion::RESP3,
                },
            },
        })
    }
}

/// Either an address string or structured options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisInput {
    /// `host:port`, or a `redis://`/`rediss://` URL
    Addr(String),
    Options(RedisOptions),
}

impl RedisInput {
    /// What the driver will connect with, without connecting
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        match self {
            RedisInput::Addr(addr) if addr.contains("://") => addr
                .as_str()
                .into_connection_info()
                .map_err(|e| ConnectionError::InvalidConnectionString(e.to_string())),
            RedisInput::Addr(addr) => RedisOptions::new(addr.as_str()).connection_info(),
            RedisInput::Options(options) => options.connection_info(),
        }
    }
}

impl From<&str> for RedisInput {
    fn from(addr: &str) -> Self {
        RedisInput::Addr(addr.to_string())
    }
}

impl From<String> for RedisInput {
    fn from(addr: String) -> Self {
        RedisInput::Addr(addr)
    }
}

impl From<RedisOptions> for RedisInput {
    fn from(options: RedisOptions) -> Self {
        RedisInput::Options(options)
    }
}

/// Build a Redis client and check that `PING` answers `PONG`.
pub async fn connect_redis(input: impl Into<RedisInput>) -> Result<Client> {
    let info = input
        .into()
        .connection_info()
        .map_err(ConnectionError::logged)?;

    info!("Connecting to Redis at {}", info.addr);
    let client = Client::open(info)
        .map_err(|e| ConnectionError::client(DatabaseType::Redis, e).logged())?;

    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ConnectionError::ping(DatabaseType::Redis, e).logged())?;

    info!("Pinging Redis");
    let pong: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| ConnectionError::ping(DatabaseType::Redis, e).logged())?;
    if pong != "PONG" {
        return Err(ConnectionError::ping(
            DatabaseType::Redis,
            format!("unexpected reply {pong:?}"),
        )
        .logged());
    }

    info!("Successfully connected to Redis");
    Ok(client)
}

fn split_host_port(addr: &str) -> Result<(String, u16)> {
    let invalid = |why: &str| ConnectionError::InvalidConfig(format!("Redis address {addr:?}: {why}"));
    let default_port = DatabaseType::Redis.default_port();

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| invalid("unclosed '['"))?;
        match tail {
            "" => (host, None),
            _ => (host, Some(tail.strip_prefix(':').ok_or_else(|| invalid("junk after ']'"))?)),
        }
    } else {
        match addr.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (addr, None),
        }
    };

    let host = if host.is_empty() { "localhost" } else { host };
    let port = match port {
        Some(port) => port.parse().map_err(|_| invalid("port is not a number"))?,
        None => default_port,
    };
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::error::Stage;

    fn tcp(info: &ConnectionInfo) -> (&str, u16) {
        match &info.addr {
            ConnectionAddr::Tcp(host, port) => (host.as_str(), *port),
            other => panic!("expected a TCP address, got {other:?}"),
        }
    }

    #[test]
    fn bare_address_has_no_credentials() {
        let info = RedisInput::from("localhost:6379").connection_info().unwrap();
        assert_eq!(tcp(&info), ("localhost", 6379));
        assert_eq!(info.addr.to_string(), "localhost:6379");
        assert_eq!(info.redis.password, None);
        assert_eq!(info.redis.username, None);
        assert_eq!(info.redis.db, 0);
    }

    #[test]
    fn options_keep_their_credential() {
        let options = RedisOptions {
            password: Some("s3cret".into()),
            db: 2,
            ..RedisOptions::new("cache.internal:6380")
        };
        let info = RedisInput::from(options).connection_info().unwrap();
        assert_eq!(tcp(&info), ("cache.internal", 6380));
        assert_eq!(info.redis.password.as_deref(), Some("s3cret"));
        assert_eq!(info.redis.db, 2);
    }

    #[test]
    fn urls_go_through_the_driver_parser() {
        let info = RedisInput::from("redis://:pw@127.0.0.1:6390/3")
            .connection_info()
            .unwrap();
        assert_eq!(tcp(&info), ("127.0.0.1", 6390));
        assert_eq!(info.redis.password.as_deref(), Some("pw"));
        assert_eq!(info.redis.db, 3);
    }

    #[test]
    fn port_defaults_and_ipv6_brackets() {
        assert_eq!(split_host_port("redis-host").unwrap(), ("redis-host".into(), 6379));
        assert_eq!(split_host_port("[::1]:7000").unwrap(), ("::1".into(), 7000));
        assert_eq!(split_host_port("[::1]").unwrap(), ("::1".into(), 6379));
    }

    #[test]
    fn empty_host_falls_back_to_localhost() {
        assert_eq!(split_host_port("").unwrap(), ("localhost".into(), 6379));
        assert_eq!(split_host_port(":6380").unwrap(), ("localhost".into(), 6380));
    }

    #[test]
    fn ipv6_addresses_display_without_brackets() {
        let info = RedisInput::from("[::1]:6379").connection_info().unwrap();
        assert_eq!(tcp(&info), ("::1", 6379));
        assert_eq!(info.addr.to_string(), "::1:6379");
    }

    #[tokio::test]
    async fn unreachable_server_fails_at_ping_stage() {
        let err = connect_redis("127.0.0.1:1").await.unwrap_err();
        assert_eq!(err.stage(), Stage::Ping);
    }

    #[test]
    fn malformed_addresses_are_config_errors() {
        for addr in ["localhost:port", "[::1", "[::1]x"] {
            let err = RedisInput::from(addr).connection_info().unwrap_err();
            assert_eq!(err.stage(), Stage::Config, "{addr}");
        }
    }
}
