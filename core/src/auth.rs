//! Credential selection and the login exchange requests.
//!
//! A client authenticates at most once, against the read-write endpoint:
//! either by resolving an existing session token to its user, or by trading
//! a user/password pair for a new token. Without credentials the client
//! stays anonymous and read-only.

use url::form_urlencoded;

use crate::endpoint::Endpoints;
use crate::http::{HttpMethod, HttpRequest};

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// How a client identifies itself.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Reuse an existing session token.
    Session(String),
    /// Log in and obtain a fresh token.
    Password { user: String, password: String },
    Anonymous,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Session(_) => f.write_str("Session(<redacted>)"),
            Credentials::Password { user, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .finish_non_exhaustive(),
            Credentials::Anonymous => f.write_str("Anonymous"),
        }
    }
}

impl Credentials {
    /// A non-empty session token wins; a user/password pair is used only when
    /// both halves are non-empty.
    pub fn select(session: Option<&str>, user: Option<&str>, password: Option<&str>) -> Self {
        let present = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        if let Some(token) = present(session) {
            return Credentials::Session(token);
        }
        match (present(user), present(password)) {
            (Some(user), Some(password)) => Credentials::Password { user, password },
            _ => Credentials::Anonymous,
        }
    }
}

/// `GET {rw}/auth/session/{token}`. The response body is the user name.
pub fn build_session_lookup(endpoints: &Endpoints, token: &str) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Get,
        url: format!("{}/auth/session/{token}", endpoints.rw()),
        headers: Vec::new(),
        body: None,
    }
}

/// `POST {rw}/auth/session` with a `username`/`password` form. The response
/// body is the issued session token.
pub fn build_login(endpoints: &Endpoints, user: &str, password: &str) -> HttpRequest {
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("username", user)
        .append_pair("password", password)
        .finish();
    HttpRequest {
        method: HttpMethod::Post,
        url: format!("{}/auth/session", endpoints.rw()),
        headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
        body: Some(body),
    }
}
