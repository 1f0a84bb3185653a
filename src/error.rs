//! Unified error type.

use thiserror::Error;

/// The error type returned by formecho's fallible infrastructure operations.
///
/// Application-level failures (a malformed form, a missing file) are
/// expressed as HTTP [`Response`](crate::Response) values, not as `Error`s.
/// This type surfaces startup and transport failures: loading configuration,
/// binding to a port, accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("config: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
