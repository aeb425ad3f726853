//! Client configuration and the bootstrap document.
//!
//! # Design
//! `ClientConfig` is what the caller supplies: credentials, an optional
//! server override, where the bootstrap document lives and the transport
//! timeout. `BootstrapConfig` is what the document yields: the read-write
//! and read-only hosts. The parsed tree is dropped as soon as both hosts are
//! extracted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credentials;
use crate::conf::ConfigNode;
use crate::error::HostDbError;

/// Well-known location of the bootstrap document.
pub const DEFAULT_CONF_PATH: &str = "/etc/hostdb/client_conf.yaml";

/// Per-call timeout applied by the default transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Caller-supplied settings for `HostDb::new`.
#[derive(Clone)]
pub struct ClientConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    /// An existing session token. Takes precedence over user/password.
    pub session: Option<String>,
    /// Host that replaces both configured endpoints when set.
    pub server: Option<String>,
    pub conf_path: PathBuf,
    /// `None` disables the timeout.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            session: None,
            server: None,
            conf_path: PathBuf::from(DEFAULT_CONF_PATH),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("session", &self.session.as_ref().map(|_| "<redacted>"))
            .field("server", &self.server)
            .field("conf_path", &self.conf_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Build a config from `HOSTDB_*` environment variables.
    ///
    /// Reads `HOSTDB_USER`, `HOSTDB_PASSWORD`, `HOSTDB_SESSION`,
    /// `HOSTDB_SERVER` and `HOSTDB_CONF`. Unset and empty variables leave
    /// the default in place.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self {
            user: var("HOSTDB_USER"),
            password: var("HOSTDB_PASSWORD"),
            session: var("HOSTDB_SESSION"),
            server: var("HOSTDB_SERVER"),
            ..Self::default()
        };
        if let Some(path) = var("HOSTDB_CONF") {
            config.conf_path = PathBuf::from(path);
        }
        config
    }

    /// Classify the supplied credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials::select(
            self.session.as_deref(),
            self.user.as_deref(),
            self.password.as_deref(),
        )
    }
}

/// Endpoint hosts read from the bootstrap document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub hostdb_rw: String,
    pub hostdb_ro: String,
}

impl BootstrapConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HostDbError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, HostDbError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        Ok(Self::from_tree(&ConfigNode::from(value)))
    }

    /// Extract both hosts. Missing or non-scalar entries read as empty.
    pub fn from_tree(root: &ConfigNode) -> Self {
        let host = |key: &str| {
            root.lookup(&[key])
                .and_then(ConfigNode::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            hostdb_rw: host("hostdb_rw"),
            hostdb_ro: host("hostdb_ro"),
        }
    }
}
