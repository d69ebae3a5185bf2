//! Database driver implementations
//! Each driver is conditionally compiled based on features

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(feature = "redis")]
pub mod redis_driver;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite-driver")]
pub mod sqlite;
