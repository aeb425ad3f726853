//! Error types for the HostDB client.
//!
//! # Design
//! `RequestFailed` deliberately carries no payload: the status code, status
//! line and server trace of the failing call are kept on the client and read
//! back through `HostDb::last_status`. Transport and bootstrap-file errors are
//! passed through untouched so callers see the underlying cause.

use thiserror::Error;

/// Errors returned by `HostDb` construction and operations.
#[derive(Debug, Error)]
pub enum HostDbError {
    /// A variadic operation received too few or empty arguments.
    #[error("parameters are invalid/missing")]
    InvalidParams,

    /// The server answered with a status other than 200 or 201.
    #[error("request failed")]
    RequestFailed,

    /// Connection, DNS, TLS, timeout or body-read failure.
    #[error(transparent)]
    Transport(#[from] ureq::Error),

    /// The bootstrap document could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The bootstrap document is not valid YAML.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
