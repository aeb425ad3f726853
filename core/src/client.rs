//! The stateful HostDB client.
//!
//! # Design
//! `HostDb` owns the resolved endpoints, the session identity and the detail
//! of the last failing call. Every operation follows the same three steps:
//! `RequestBuilder` produces an `HttpRequest`, the `Transport` executes it,
//! and `decode` classifies the response while updating `last_status`.
//!
//! Operations take `&mut self` because decoding writes `last_status`; use one
//! client per concurrent caller.

use tracing::{debug, info, warn};

use crate::auth::{self, Credentials};
use crate::config::{BootstrapConfig, ClientConfig};
use crate::endpoint::Endpoints;
use crate::error::HostDbError;
use crate::http::{HttpRequest, Transport};
use crate::request::RequestBuilder;
use crate::response::{decode, LastStatus};
use crate::transport::UreqTransport;
use crate::types::{GetOptions, MultiGetQuery, RevisionsOptions};

/// Synchronous HostDB client.
pub struct HostDb<T = UreqTransport> {
    endpoints: Endpoints,
    read_only: bool,
    user: String,
    session: String,
    last_status: LastStatus,
    transport: T,
}

impl HostDb<UreqTransport> {
    /// Load the bootstrap document named by `config`, resolve endpoints and
    /// authenticate with whatever credentials `config` carries.
    pub fn new(config: &ClientConfig) -> Result<Self, HostDbError> {
        Self::with_transport(config, UreqTransport::new(config.timeout))
    }
}

impl<T: Transport> HostDb<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Result<Self, HostDbError> {
        let bootstrap = BootstrapConfig::load(&config.conf_path)?;
        Self::from_bootstrap(config, &bootstrap, transport)
    }

    /// Construct from an already-loaded bootstrap document.
    ///
    /// Fails if authentication is attempted and does not succeed; no client
    /// is returned in that case.
    pub fn from_bootstrap(
        config: &ClientConfig,
        bootstrap: &BootstrapConfig,
        transport: T,
    ) -> Result<Self, HostDbError> {
        let endpoints = Endpoints::resolve(
            config.server.as_deref(),
            &bootstrap.hostdb_rw,
            &bootstrap.hostdb_ro,
        );
        debug!(rw = endpoints.rw(), ro = endpoints.ro(), "resolved HostDB endpoints");

        let mut client = Self {
            endpoints,
            read_only: true,
            user: String::new(),
            session: String::new(),
            last_status: LastStatus::default(),
            transport,
        };
        client.authenticate(config.credentials())?;
        Ok(client)
    }

    fn authenticate(&mut self, credentials: Credentials) -> Result<(), HostDbError> {
        match credentials {
            Credentials::Session(token) => {
                let req = auth::build_session_lookup(&self.endpoints, &token);
                let user = self.exchange_identity(req)?;
                self.user = user;
                self.session = token;
            }
            Credentials::Password { user, password } => {
                let req = auth::build_login(&self.endpoints, &user, &password);
                let token = self.exchange_identity(req)?;
                self.session = token;
                self.user = user;
            }
            Credentials::Anonymous => {
                debug!("no credentials supplied, staying read-only");
                return Ok(());
            }
        }
        self.read_only = false;
        info!(user = %self.user, "authenticated to HostDB");
        Ok(())
    }

    // A successful auth reply must name a user or a token; an empty body
    // counts as a failed authentication.
    fn exchange_identity(&mut self, req: HttpRequest) -> Result<String, HostDbError> {
        debug!(method = req.method.as_str(), "sending HostDB auth request");
        let response = self.transport.execute(req)?;
        if matches!(response.status, 200 | 201) && response.body.is_empty() {
            self.last_status = LastStatus::of(&response);
            warn!(code = response.status, "HostDB auth reply carried no identity");
            return Err(HostDbError::RequestFailed);
        }
        decode(response, &mut self.last_status)
    }

    /// Fetch node `id`.
    pub fn get(&mut self, id: &str, options: &GetOptions) -> Result<String, HostDbError> {
        let req = self.requests().build_get(id, options);
        self.execute(id, req)
    }

    /// Fetch every node matching `query.id_pattern`, expanded by the
    /// server-side `foreach` expression.
    ///
    /// Returns `InvalidParams` without a network call when the pattern or
    /// expression is empty.
    pub fn multi_get(&mut self, query: &MultiGetQuery) -> Result<String, HostDbError> {
        let req = self.requests().build_multi_get(query)?;
        self.execute(&query.id_pattern, req)
    }

    /// Positional form of `multi_get`: `[id_pattern, foreach, revision?]`.
    pub fn multi_get_args<S: AsRef<str>>(&mut self, args: &[S]) -> Result<String, HostDbError> {
        let query = MultiGetQuery::from_args(args)?;
        self.multi_get(&query)
    }

    /// Groups in `namespace` that `host` belongs to.
    pub fn parents(&mut self, host: &str, namespace: &str) -> Result<String, HostDbError> {
        let req = self.requests().build_parents(host, namespace);
        self.execute(host, req)
    }

    /// Values `host` inherits from its groups in `namespace`.
    pub fn derived(&mut self, host: &str, namespace: &str) -> Result<String, HostDbError> {
        let req = self.requests().build_derived(host, namespace);
        self.execute(host, req)
    }

    pub fn revisions(&mut self, id: &str, options: &RevisionsOptions) -> Result<String, HostDbError> {
        let req = self.requests().build_revisions(id, options);
        self.execute(id, req)
    }

    /// Write `value` to `id` with a change `log`. On `/members` ids the
    /// value travels in the log field.
    pub fn set(&mut self, id: &str, value: &str, log: &str) -> Result<String, HostDbError> {
        let req = self.requests().build_set(id, value, log);
        self.execute(id, req)
    }

    pub fn rename(&mut self, id: &str, newname: &str, log: &str) -> Result<String, HostDbError> {
        let req = self.requests().build_rename(id, newname, log);
        self.execute(id, req)
    }

    pub fn delete(&mut self, id: &str, log: &str) -> Result<String, HostDbError> {
        let req = self.requests().build_delete(id, log);
        self.execute(id, req)
    }

    /// `true` until authentication succeeds.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Detail of the most recent `RequestFailed`.
    pub fn last_status(&self) -> &LastStatus {
        &self.last_status
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn requests(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.endpoints, &self.session)
    }

    // `node` is logged instead of the URL, which may carry the session token.
    fn execute(&mut self, node: &str, req: HttpRequest) -> Result<String, HostDbError> {
        debug!(method = req.method.as_str(), node, "sending HostDB request");
        let response = self.transport.execute(req)?;
        decode(response, &mut self.last_status)
    }
}
