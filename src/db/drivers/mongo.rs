//! MongoDB driver implementation

use mongodb::{bson::doc, options::ClientOptions, Client};
use tracing::info;

use crate::db::connection::DatabaseType;
use crate::db::error::{ConnectionError, Result};

const ACCEPTED_SCHEMES: [&str; 2] = ["mongodb", "mongodb+srv"];

/// Open a MongoDB client from a `mongodb://` or `mongodb+srv://` URI and ping it.
///
/// The scheme is checked before the driver sees the URI, so a wrong scheme
/// fails with [`ConnectionError::InvalidScheme`] without any construction attempt.
pub async fn connect_mongodb(uri: &str) -> Result<Client> {
    let scheme = uri_scheme(uri).map_err(ConnectionError::logged)?;
    // Schemes are case-insensitive; the driver only accepts the lowercase form
    let lowered = scheme.to_ascii_lowercase();
    if !ACCEPTED_SCHEMES.contains(&lowered.as_str()) {
        return Err(ConnectionError::InvalidScheme(scheme.to_string()).logged());
    }
    let uri = format!("{lowered}{}", &uri[scheme.len()..]);

    let options = ClientOptions::parse(uri.as_str())
        .await
        .map_err(|e| ConnectionError::client(DatabaseType::MongoDB, e).logged())?;
    let hosts = options
        .hosts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    info!("Connecting to MongoDB at {}", hosts);

    let client = Client::with_options(options)
        .map_err(|e| ConnectionError::client(DatabaseType::MongoDB, e).logged())?;

    info!("Pinging MongoDB");
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| ConnectionError::ping(DatabaseType::MongoDB, e).logged())?;

    info!("Successfully connected to MongoDB");
    Ok(client)
}

/// Scheme of a `scheme://rest` URI.
///
/// Seed lists (`host1,host2`) are not valid URL authorities, so only the
/// scheme is taken apart here and the driver parses everything after it.
fn uri_scheme(uri: &str) -> Result<&str> {
    let (scheme, rest) = uri.split_once("://").ok_or_else(|| {
        ConnectionError::InvalidConnectionString("URI has no scheme separator".into())
    })?;

    let mut chars = scheme.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !well_formed {
        return Err(ConnectionError::InvalidConnectionString(format!(
            "malformed scheme {scheme:?}"
        )));
    }
    if rest.is_empty() {
        return Err(ConnectionError::InvalidConnectionString(
            "URI has no host".into(),
        ));
    }
    Ok(scheme)
}
