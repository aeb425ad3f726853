use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Account seeded into every `app()`.
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "secret";

/// Header carrying the diagnostic token on every error response.
pub const TRACE_HEADER: &str = "calltrace";

const MEMBERS_SUFFIX: &str = "/members";

/// One stored version of a node. Revisions are numbered from 1.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Revision {
    pub revision: usize,
    pub value: String,
    pub log: String,
    pub user: String,
}

/// Node as returned by a non-raw `GET`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub revision: usize,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct Store {
    nodes: BTreeMap<String, Vec<Revision>>,
    sessions: HashMap<String, String>,
    users: HashMap<String, String>,
}

impl Store {
    fn current(&self, id: &str) -> Option<&Revision> {
        self.nodes.get(id).and_then(|history| history.last())
    }

    fn at(&self, id: &str, revision: Option<usize>) -> Option<&Revision> {
        match revision {
            Some(n) => self.nodes.get(id)?.get(n.checked_sub(1)?),
            None => self.current(id),
        }
    }

    /// Groups under `namespace` whose member list names `host`.
    fn groups_of(&self, host: &str, namespace: &str) -> Vec<String> {
        let prefix = format!("{namespace}/");
        self.nodes
            .iter()
            .filter(|(id, _)| id.starts_with(&prefix))
            .filter_map(|(id, history)| {
                let group = id.strip_suffix(MEMBERS_SUFFIX)?;
                let members = &history.last()?.value;
                members
                    .split([',', '\n'])
                    .any(|m| m.trim() == host)
                    .then(|| group.to_string())
            })
            .collect()
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let mut store = Store::default();
    store
        .users
        .insert(DEFAULT_USER.to_string(), DEFAULT_PASSWORD.to_string());
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/v1/auth/session", post(login))
        .route("/v1/auth/session/{token}", get(lookup_session))
        .fallback(node)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Error response carrying a fresh `calltrace` token.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

fn fail(status: StatusCode, message: impl Into<String>) -> Failure {
    Failure {
        status,
        message: message.into(),
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let trace = Uuid::new_v4().to_string();
        warn!(status = self.status.as_u16(), %trace, message = %self.message, "request failed");
        (self.status, [(TRACE_HEADER, trace)], self.message).into_response()
    }
}

type Reply = Result<(StatusCode, String), Failure>;

fn params(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Reply {
    serde_json::to_string(value)
        .map(|body| (status, body))
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

fn authorize(store: &Store, form: &HashMap<String, String>) -> Result<String, Failure> {
    form.get("session")
        .and_then(|token| store.sessions.get(token))
        .cloned()
        .ok_or_else(|| fail(StatusCode::FORBIDDEN, "invalid or missing session"))
}

async fn login(State(db): State<Db>, body: String) -> Reply {
    let form = params(&body);
    let (Some(user), Some(password)) = (form.get("username"), form.get("password")) else {
        return Err(fail(StatusCode::BAD_REQUEST, "username and password required"));
    };
    let mut store = db.write().await;
    if store.users.get(user) != Some(password) {
        return Err(fail(StatusCode::UNAUTHORIZED, "bad credentials"));
    }
    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone(), user.clone());
    Ok((StatusCode::CREATED, token))
}

async fn lookup_session(State(db): State<Db>, Path(token): Path<String>) -> Reply {
    let store = db.read().await;
    store
        .sessions
        .get(&token)
        .map(|user| (StatusCode::OK, user.clone()))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "unknown session"))
}

async fn node(State(db): State<Db>, method: Method, uri: Uri, body: String) -> Reply {
    let Some(id) = uri.path().strip_prefix("/v1/").filter(|id| !id.is_empty()) else {
        return Err(fail(StatusCode::NOT_FOUND, "unknown path"));
    };
    let query = params(uri.query().unwrap_or_default());
    debug!(%method, id, "node request");
    match method {
        Method::GET => read_node(&db, id, &query).await,
        Method::PUT => set_node(&db, id, &params(&body)).await,
        Method::POST => rename_node(&db, id, &params(&body)).await,
        Method::DELETE => delete_node(&db, id, &query).await,
        _ => Err(fail(StatusCode::METHOD_NOT_ALLOWED, "unsupported method")),
    }
}

fn revision_param(query: &HashMap<String, String>) -> Result<Option<usize>, Failure> {
    query
        .get("revision")
        .map(|r| r.parse::<usize>())
        .transpose()
        .map_err(|_| fail(StatusCode::BAD_REQUEST, "revision must be a number"))
}

async fn read_node(db: &Db, id: &str, query: &HashMap<String, String>) -> Reply {
    let store = db.read().await;

    match query.get("meta").map(String::as_str) {
        Some("revisions") => {
            let history = store
                .nodes
                .get(id)
                .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("{id} not found")))?;
            let limit = match query.get("limit") {
                Some(l) => l
                    .parse::<usize>()
                    .map_err(|_| fail(StatusCode::BAD_REQUEST, "limit must be a number"))?,
                None => history.len(),
            };
            let newest_first: Vec<&Revision> = history.iter().rev().take(limit).collect();
            return json(StatusCode::OK, &newest_first);
        }
        Some(meta @ ("parent" | "derived")) => {
            let host = id
                .strip_prefix("hosts/")
                .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "meta lookups need hosts/{host}"))?;
            let namespace = query
                .get("from")
                .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "from is required"))?;
            let groups = store.groups_of(host, namespace);
            if meta == "parent" {
                return json(StatusCode::OK, &groups);
            }
            let derived: BTreeMap<&str, &str> = groups
                .iter()
                .filter_map(|g| Some((g.as_str(), store.current(g)?.value.as_str())))
                .collect();
            return json(StatusCode::OK, &derived);
        }
        Some(other) => {
            return Err(fail(StatusCode::BAD_REQUEST, format!("unknown meta {other}")));
        }
        None => {}
    }

    let revision = revision_param(query)?;

    if let Some(foreach) = query.get("foreach") {
        if !id.contains('*') {
            return Err(fail(StatusCode::BAD_REQUEST, "foreach needs a * in the id"));
        }
        let found: BTreeMap<String, String> = foreach
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .filter_map(|item| {
                let target = id.replacen('*', item, 1);
                let rev = store.at(&target, revision)?;
                Some((target, rev.value.clone()))
            })
            .collect();
        if found.is_empty() {
            return Err(fail(StatusCode::NOT_FOUND, format!("nothing matches {id}")));
        }
        return json(StatusCode::OK, &found);
    }

    let rev = store
        .at(id, revision)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("{id} not found")))?;
    if query.get("raw").map(String::as_str) == Some("true") {
        return Ok((StatusCode::OK, rev.value.clone()));
    }
    json(
        StatusCode::OK,
        &Node {
            id: id.to_string(),
            revision: rev.revision,
            value: rev.value.clone(),
        },
    )
}

async fn set_node(db: &Db, id: &str, form: &HashMap<String, String>) -> Reply {
    let mut store = db.write().await;
    let user = authorize(&store, form)?;
    let field = |name: &str| form.get(name).cloned().unwrap_or_default();

    // Membership edits carry their payload in `log`.
    let (value, log) = if id.contains(MEMBERS_SUFFIX) {
        (field("log"), "membership update".to_string())
    } else {
        (field("value"), field("log"))
    };

    let history = store.nodes.entry(id.to_string()).or_default();
    let status = if history.is_empty() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let revision = history.len() + 1;
    history.push(Revision {
        revision,
        value: value.clone(),
        log,
        user,
    });
    json(
        status,
        &Node {
            id: id.to_string(),
            revision,
            value,
        },
    )
}

async fn rename_node(db: &Db, id: &str, form: &HashMap<String, String>) -> Reply {
    let mut store = db.write().await;
    authorize(&store, form)?;
    let newname = form
        .get("newname")
        .filter(|n| !n.is_empty() && !n.contains('/'))
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "newname must be a single path segment"))?;
    let target = match id.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{newname}"),
        None => newname.clone(),
    };
    if store.nodes.contains_key(&target) {
        return Err(fail(StatusCode::CONFLICT, format!("{target} already exists")));
    }
    let history = store
        .nodes
        .remove(id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("{id} not found")))?;
    store.nodes.insert(target.clone(), history);
    Ok((StatusCode::OK, target))
}

async fn delete_node(db: &Db, id: &str, query: &HashMap<String, String>) -> Reply {
    let mut store = db.write().await;
    authorize(&store, query)?;
    store
        .nodes
        .remove(id)
        .map(|_| (StatusCode::OK, id.to_string()))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("{id} not found")))
}
