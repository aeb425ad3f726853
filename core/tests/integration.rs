//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, writes a bootstrap document
//! pointing at it, and drives a real `HostDb` over ureq. Endpoints are always
//! `https://`; the mock only speaks plain HTTP, so the test transport rewrites
//! the scheme before delegating to `UreqTransport`.

use std::io::Write;
use std::net::SocketAddr;

use hostdb_client::{
    ClientConfig, GetOptions, HostDb, HostDbError, HttpRequest, HttpResponse, MultiGetQuery,
    RevisionsOptions, Transport, UreqTransport,
};
use hostdb_mock::{DEFAULT_PASSWORD, DEFAULT_USER};

struct PlainHttp(UreqTransport);

impl Transport for PlainHttp {
    fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, ureq::Error> {
        if let Some(rest) = request.url.strip_prefix("https://") {
            request.url = format!("http://{rest}");
        }
        self.0.execute(request)
    }
}

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            hostdb_mock::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// Bootstrap document with only a read-write host, plus unrelated keys of
/// mixed types.
fn write_bootstrap(addr: SocketAddr) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "hostdb_rw: \"{addr}\"").unwrap();
    writeln!(file, "42: answer").unwrap();
    writeln!(file, "1.5: ratio").unwrap();
    file.flush().unwrap();
    file
}

fn connect(conf: &tempfile::NamedTempFile, config: ClientConfig) -> Result<HostDb<PlainHttp>, HostDbError> {
    let config = ClientConfig {
        conf_path: conf.path().to_path_buf(),
        ..config
    };
    HostDb::with_transport(&config, PlainHttp(UreqTransport::new(config.timeout)))
}

fn admin() -> ClientConfig {
    ClientConfig {
        user: Some(DEFAULT_USER.to_string()),
        password: Some(DEFAULT_PASSWORD.to_string()),
        ..ClientConfig::default()
    }
}

#[test]
fn hostdb_lifecycle() {
    let addr = start_server();
    let conf = write_bootstrap(addr);

    // Step 1: anonymous client reads from the RW host (no RO configured).
    let mut anon = connect(&conf, ClientConfig::default()).unwrap();
    assert!(anon.read_only());
    assert_eq!(anon.endpoints().ro(), format!("https://{addr}/v1"));
    assert_eq!(anon.endpoints().ro(), anon.endpoints().rw());

    let err = anon.get("hosts/web1", &GetOptions::default()).unwrap_err();
    assert!(matches!(err, HostDbError::RequestFailed));
    assert_eq!(anon.last_status().code, 404);
    assert_eq!(anon.last_status().message, "404 Not Found");
    assert!(!anon.last_status().trace.is_empty());

    // Step 2: anonymous writes are rejected by the server.
    let err = anon.set("hosts/web1", "10.0.0.1", "initial").unwrap_err();
    assert!(matches!(err, HostDbError::RequestFailed));
    assert_eq!(anon.last_status().code, 403);

    // Step 3: bad password aborts construction.
    let bad = ClientConfig {
        password: Some("wrong".to_string()),
        ..admin()
    };
    assert!(matches!(connect(&conf, bad), Err(HostDbError::RequestFailed)));

    // Step 4: log in.
    let mut db = connect(&conf, admin()).unwrap();
    assert!(!db.read_only());
    assert_eq!(db.user(), DEFAULT_USER);
    assert!(!db.session().is_empty());

    // Step 5: create and update a node, read it back.
    db.set("hosts/web1", "10.0.0.1", "initial").unwrap();
    db.set("hosts/web1", "10.0.0.2", "moved to new subnet").unwrap();
    db.set("hosts/web2", "10.0.0.3", "initial").unwrap();

    let raw = db.get("hosts/web1", &GetOptions::raw()).unwrap();
    assert_eq!(raw, "10.0.0.2");
    let first = db
        .get(
            "hosts/web1",
            &GetOptions {
                revision: Some("1".to_string()),
                raw: true,
            },
        )
        .unwrap();
    assert_eq!(first, "10.0.0.1");
    let node: serde_json::Value =
        serde_json::from_str(&db.get("hosts/web1", &GetOptions::default()).unwrap()).unwrap();
    assert_eq!(node["revision"], 2);

    // Step 6: revision history.
    let history: serde_json::Value = serde_json::from_str(
        &db.revisions("hosts/web1", &RevisionsOptions { limit: Some(1) })
            .unwrap(),
    )
    .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["log"], "moved to new subnet");

    // Step 7: multi-get.
    let found: serde_json::Value = serde_json::from_str(
        &db.multi_get(&MultiGetQuery::new("hosts/*", "web1,web2"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(found["hosts/web1"], "10.0.0.2");
    assert_eq!(found["hosts/web2"], "10.0.0.3");
    assert!(matches!(
        db.multi_get_args(&["hosts/*"]),
        Err(HostDbError::InvalidParams)
    ));

    // Step 8: membership edits, parents and derived values.
    db.set("groups/web/members", "web1,web2", "ignored for members")
        .unwrap();
    db.set("groups/web", "role=frontend", "group defaults").unwrap();
    let parents: Vec<String> =
        serde_json::from_str(&db.parents("web1", "groups").unwrap()).unwrap();
    assert_eq!(parents, vec!["groups/web".to_string()]);
    let derived: serde_json::Value =
        serde_json::from_str(&db.derived("web2", "groups").unwrap()).unwrap();
    assert_eq!(derived["groups/web"], "role=frontend");

    // Step 9: a session token from the first login authenticates a second client.
    let token = db.session().to_string();
    let reused = connect(
        &conf,
        ClientConfig {
            session: Some(token.clone()),
            ..ClientConfig::default()
        },
    )
    .unwrap();
    assert_eq!(reused.user(), DEFAULT_USER);
    assert_eq!(reused.session(), token);
    assert!(!reused.read_only());

    // Step 10: rename and delete.
    assert_eq!(db.rename("hosts/web2", "web3", "renamed").unwrap(), "hosts/web3");
    assert_eq!(db.delete("hosts/web3", "remove old host").unwrap(), "hosts/web3");
    assert!(db.get("hosts/web3", &GetOptions::default()).is_err());
    assert_eq!(db.last_status().code, 404);

    // The anonymous client never picked up anyone else's state.
    assert_eq!(anon.last_status().code, 403);
    assert_eq!(anon.user(), "");
}

#[test]
fn unknown_session_token_fails_construction() {
    let addr = start_server();
    let conf = write_bootstrap(addr);
    let config = ClientConfig {
        session: Some("not-a-session".to_string()),
        ..ClientConfig::default()
    };
    assert!(matches!(connect(&conf, config), Err(HostDbError::RequestFailed)));
}

#[test]
fn missing_bootstrap_file_is_io_error() {
    let config = ClientConfig {
        conf_path: "/nonexistent/hostdb/client_conf.yaml".into(),
        ..ClientConfig::default()
    };
    assert!(matches!(HostDb::new(&config), Err(HostDbError::Io(_))));
}

#[test]
fn unreachable_server_is_transport_error() {
    // Bind and drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let conf = write_bootstrap(addr);
    let mut db = connect(&conf, ClientConfig::default()).unwrap();
    let err = db.get("hosts/web1", &GetOptions::default()).unwrap_err();
    assert!(matches!(err, HostDbError::Transport(_)));
}
