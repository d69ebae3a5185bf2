//! Connect-and-ping helpers for the databases Chambers talks to.
//!
//! Every constructor takes a connection string or a structured config,
//! opens the driver's client, pings it once and returns the live handle.

pub mod db;

pub use db::{
    create_connection, load_profiles, Connection, ConnectionError, DatabaseHandle, DatabaseType,
    Result, Stage,
};

#[cfg(feature = "mongodb")]
pub use db::drivers::mongo::connect_mongodb;
#[cfg(feature = "mysql")]
pub use db::drivers::mysql::{connect_mysql, MySqlConfig, MySqlInput, MySqlTransport};
#[cfg(feature = "postgres")]
pub use db::drivers::postgres::connect_postgres;
#[cfg(feature = "redis")]
pub use db::drivers::redis_driver::{connect_redis, RedisInput, RedisOptions, RedisProtocol};
#[cfg(feature = "sqlite-driver")]
pub use db::drivers::sqlite::connect_sqlite;
