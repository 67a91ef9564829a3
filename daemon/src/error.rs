//! Error types for the BHX bridge.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Bridge error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Malformed log record (expected 6 fields, got {fields}): {line:?}")]
    MalformedRecord { line: String, fields: usize },

    #[error("Program name is {len} characters, command field holds {width}")]
    LengthExceeded { len: usize, width: usize },

    #[error("Connection to {addr} timed out")]
    ConnectionTimeout { addr: String },

    #[error("Transport error talking to {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not resolve command target {0}")]
    Unresolvable(String),

    #[error("Invalid log timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Bad arguments for {method}: {reason}")]
    BadArguments { method: String, reason: String },

    #[error("Config not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Config parse error: {0}")]
    ConfigParse(String),
}

impl Error {
    pub(crate) fn transport(addr: &SocketAddr, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                Error::ConnectionTimeout {
                    addr: addr.to_string(),
                }
            }
            _ => Error::Transport {
                addr: addr.to_string(),
                source,
            },
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::ConfigParse(e.to_string())
    }
}
