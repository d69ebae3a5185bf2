pub mod connection;
pub mod driver;
pub mod drivers;
pub mod error;

pub use connection::{load_profiles, Connection, DatabaseType};
pub use driver::{create_connection, DatabaseHandle};
pub use error::{ConnectionError, Result, Stage};
