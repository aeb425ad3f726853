//! Read-write / read-only endpoint resolution.

use tracing::warn;

const SCHEME: &str = "https";
const API_VERSION: &str = "v1";

/// The two base URLs a client talks to. Fixed after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    rw: String,
    ro: String,
}

impl Endpoints {
    /// Pick the hosts and expand them to `https://{host}/v1`.
    ///
    /// A non-empty `server_override` wins for both slots. Otherwise writes go
    /// to `configured_rw` and reads go to `configured_ro`, falling back to
    /// `configured_rw` when no read replica is configured.
    ///
    /// Empty hosts are not rejected; requests against them fail in the
    /// transport.
    pub fn resolve(server_override: Option<&str>, configured_rw: &str, configured_ro: &str) -> Self {
        let server = server_override.unwrap_or_default();
        let rw_host = first_non_empty(server, configured_rw);
        let ro_host = first_non_empty(server, first_non_empty(configured_ro, configured_rw));
        if rw_host.is_empty() {
            warn!("no read-write HostDB host configured");
        }
        Self {
            rw: api_base(rw_host),
            ro: api_base(ro_host),
        }
    }

    pub fn rw(&self) -> &str {
        &self.rw
    }

    pub fn ro(&self) -> &str {
        &self.ro
    }
}

fn first_non_empty<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

fn api_base(host: &str) -> String {
    format!("{SCHEME}://{host}/{API_VERSION}")
}
