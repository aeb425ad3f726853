//! Synchronous client for the HostDB configuration/inventory service.
//!
//! # Overview
//! A `HostDb` reads the bootstrap document (`/etc/hostdb/client_conf.yaml`
//! unless overridden), resolves a read-write and a read-only endpoint,
//! optionally authenticates, and then exposes the node operations: `get`,
//! `multi_get`, `parents`, `derived`, `revisions`, `set`, `rename` and
//! `delete`. Every operation returns the raw response body.
//!
//! # Design
//! - Request construction (`RequestBuilder`) and response classification
//!   (`decode`) are pure; all I/O goes through the `Transport` trait, with
//!   `UreqTransport` as the default.
//! - The bootstrap document is parsed into an untyped `ConfigNode` tree whose
//!   keys may be strings, integers or floats; `ConfigNode::lookup` compares
//!   path segments against each key's canonical rendering.
//! - Failure detail (status line, `Calltrace`) is stored per client and read
//!   through `HostDb::last_status`.

pub mod auth;
pub mod client;
pub mod conf;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub use auth::Credentials;
pub use client::HostDb;
pub use conf::{ConfigKey, ConfigNode};
pub use config::{BootstrapConfig, ClientConfig};
pub use endpoint::Endpoints;
pub use error::HostDbError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use request::RequestBuilder;
pub use response::{decode, LastStatus};
pub use transport::UreqTransport;
pub use types::{GetOptions, MultiGetQuery, RevisionsOptions};
