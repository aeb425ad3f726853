//! Per-operation request construction.
//!
//! # Design
//! `RequestBuilder` borrows the client's endpoints and session token and
//! turns each operation into an `HttpRequest` without doing any I/O. Reads go
//! to the read-only endpoint; mutations go to the read-write endpoint and
//! carry the session token. Node ids are slash-separated paths and are
//! embedded verbatim; query values and form fields are urlencoded.

use url::form_urlencoded;

use crate::auth::FORM_CONTENT_TYPE;
use crate::endpoint::Endpoints;
use crate::error::HostDbError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{GetOptions, MultiGetQuery, RevisionsOptions};

/// Membership ids take their payload in the `log` field.
const MEMBERS_MARKER: &str = "/members";

#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    endpoints: &'a Endpoints,
    session: &'a str,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(endpoints: &'a Endpoints, session: &'a str) -> Self {
        Self { endpoints, session }
    }

    pub fn build_get(&self, id: &str, options: &GetOptions) -> HttpRequest {
        let mut query = Query::new();
        if let Some(revision) = options.revision.as_deref().filter(|r| !r.is_empty()) {
            query.pair("revision", revision);
        }
        if options.raw {
            query.pair("raw", "true");
        }
        get(query.append_to(format!("{}/{id}", self.endpoints.ro())))
    }

    /// Fails with `InvalidParams` when the pattern or expression is empty.
    pub fn build_multi_get(&self, query: &MultiGetQuery) -> Result<HttpRequest, HostDbError> {
        query.validate()?;
        let mut q = Query::new();
        q.pair("foreach", &query.foreach);
        if let Some(revision) = query.revision.as_deref().filter(|r| !r.is_empty()) {
            q.pair("revision", revision);
        }
        Ok(get(q.append_to(format!("{}/{}", self.endpoints.ro(), query.id_pattern))))
    }

    pub fn build_parents(&self, host: &str, namespace: &str) -> HttpRequest {
        self.build_host_meta(host, "parent", namespace)
    }

    pub fn build_derived(&self, host: &str, namespace: &str) -> HttpRequest {
        self.build_host_meta(host, "derived", namespace)
    }

    fn build_host_meta(&self, host: &str, meta: &str, namespace: &str) -> HttpRequest {
        let mut query = Query::new();
        query.pair("meta", meta).pair("from", namespace);
        get(query.append_to(format!("{}/hosts/{host}", self.endpoints.ro())))
    }

    pub fn build_revisions(&self, id: &str, options: &RevisionsOptions) -> HttpRequest {
        let mut query = Query::new();
        query.pair("meta", "revisions");
        if let Some(limit) = options.limit {
            query.pair("limit", &limit.to_string());
        }
        get(query.append_to(format!("{}/{id}", self.endpoints.ro())))
    }

    /// `PUT {rw}/{id}` with `value`, `log` and `session` form fields.
    ///
    /// For ids containing `/members` the server expects the membership
    /// payload in `log`: `value` is moved there and the caller's `log` text
    /// is dropped.
    pub fn build_set(&self, id: &str, value: &str, log: &str) -> HttpRequest {
        let (value, log) = if id.contains(MEMBERS_MARKER) {
            ("", value)
        } else {
            (value, log)
        };
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("value", value)
            .append_pair("log", log)
            .append_pair("session", self.session)
            .finish();
        self.form(HttpMethod::Put, id, body)
    }

    pub fn build_rename(&self, id: &str, newname: &str, log: &str) -> HttpRequest {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("newname", newname)
            .append_pair("log", log)
            .append_pair("session", self.session)
            .finish();
        self.form(HttpMethod::Post, id, body)
    }

    /// `DELETE {rw}/{id}?log=..&session=..`. Spaces in `log` become
    /// underscores.
    pub fn build_delete(&self, id: &str, log: &str) -> HttpRequest {
        let mut query = Query::new();
        query
            .pair("log", &log.replace(' ', "_"))
            .pair("session", self.session);
        HttpRequest {
            method: HttpMethod::Delete,
            url: query.append_to(format!("{}/{id}", self.endpoints.rw())),
            headers: Vec::new(),
            body: None,
        }
    }

    fn form(&self, method: HttpMethod, id: &str, body: String) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}/{id}", self.endpoints.rw()),
            headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: Some(body),
        }
    }
}

fn get(url: String) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Get,
        url,
        headers: Vec::new(),
        body: None,
    }
}

/// Query string accumulator; renders nothing when empty.
struct Query {
    inner: form_urlencoded::Serializer<'static, String>,
    empty: bool,
}

impl Query {
    fn new() -> Self {
        Self {
            inner: form_urlencoded::Serializer::new(String::new()),
            empty: true,
        }
    }

    fn pair(&mut self, key: &str, value: &str) -> &mut Self {
        self.inner.append_pair(key, value);
        self.empty = false;
        self
    }

    fn append_to(mut self, mut url: String) -> String {
        if !self.empty {
            url.push('?');
            url.push_str(&self.inner.finish());
        }
        url
    }
}
