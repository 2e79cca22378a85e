//! Stub of the Tadata deployment API.
//!
//! Implements `POST /api/deployments/from-openapi` with the same response
//! envelope as the real service, plus `GET /specs/{name}` for serving OpenAPI
//! documents to URL-sourced deployments. State is in memory only.
//!
//! The [`TestServer`] helper starts a stub on a random port for integration
//! testing.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

pub const DEPLOY_ROUTE: &str = "/api/deployments/from-openapi";
pub const SPECS_PREFIX: &str = "/specs/";

/// A request as seen by the stub.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, when there was one.
    pub body: Option<Value>,
}

struct Document {
    content_type: String,
    body: String,
}

/// In-memory state of the stub service.
pub struct Stub {
    api_keys: HashSet<String>,
    documents: RwLock<HashMap<String, Document>>,
    /// Deployment name → id, so redeploying a name reports `updated`.
    deployments: Mutex<HashMap<String, String>>,
    next_id: AtomicUsize,
    requests: Mutex<Vec<CapturedRequest>>,
}

impl Stub {
    pub fn new<I, S>(api_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api_keys: api_keys.into_iter().map(Into::into).collect(),
            documents: RwLock::new(HashMap::new()),
            deployments: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serve `body` at `/specs/{name}`.
    pub fn add_document(&self, name: &str, content_type: &str, body: &str) {
        let mut docs = self.documents.write().expect("documents lock poisoned");
        docs.insert(
            name.to_owned(),
            Document {
                content_type: content_type.to_owned(),
                body: body.to_owned(),
            },
        );
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }

    fn record(&self, request: CapturedRequest) {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(request);
    }

    fn upsert(&self, name: Option<&str>) -> (String, bool) {
        let mut deployments = self.deployments.lock().expect("deployments lock poisoned");
        if let Some(id) = name.and_then(|n| deployments.get(n)) {
            return (id.clone(), true);
        }
        let id = format!("dep_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        if let Some(name) = name {
            deployments.insert(name.to_owned(), id.clone());
        }
        (id, false)
    }
}

fn error_envelope(status: u16, code: &str, message: &str) -> Value {
    json!({
        "ok": false,
        "status": status,
        "error": {"code": code, "message": message}
    })
}

fn respond_json(req: tiny_http::Request, status: u16, value: &Value) {
    let header = Header::from_bytes("Content-Type", "application/json").expect("valid header");
    let _ = req.respond(
        Response::from_string(value.to_string())
            .with_status_code(StatusCode(status))
            .with_header(header),
    );
}

fn respond_document(req: tiny_http::Request, doc: &Document) {
    let header =
        Header::from_bytes("Content-Type", doc.content_type.as_bytes()).expect("valid header");
    let _ = req.respond(Response::from_string(doc.body.clone()).with_header(header));
}

fn read_body(req: &mut tiny_http::Request) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    if req.as_reader().read_to_end(&mut body).is_ok() {
        Some(body)
    } else {
        None
    }
}

fn split_url(url: &str) -> (String, BTreeMap<String, String>) {
    match url.split_once('?') {
        Some((path, query)) => (
            path.to_owned(),
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (url.to_owned(), BTreeMap::new()),
    }
}

fn handle_deploy(stub: &Stub, captured: &CapturedRequest, raw_body: &[u8]) -> (u16, Value) {
    let authorized = captured
        .query
        .get("apiKey")
        .is_some_and(|k| stub.api_keys.contains(k));
    if !authorized {
        warn!("rejecting deployment: invalid API key");
        return (401, error_envelope(401, "AUTH_ERROR", "Invalid API key"));
    }

    if !matches!(
        captured.headers.get("x-api-version").map(String::as_str),
        Some("05-2025" | "latest")
    ) {
        return (
            400,
            error_envelope(400, "VALIDATION_ERROR", "Missing or unknown x-api-version"),
        );
    }

    let Ok(body) = serde_json::from_slice::<Value>(raw_body) else {
        return (400, error_envelope(400, "JSON_PARSE_ERROR", "Invalid JSON body"));
    };

    let spec_version = body
        .get("openApiSpec")
        .and_then(|s| s.get("openapi"))
        .and_then(Value::as_str);
    if !spec_version.is_some_and(|v| v.starts_with("3.")) {
        let mut envelope = error_envelope(400, "VALIDATION_ERROR", "Invalid request body");
        envelope["error"]["errors"] = json!([{
            "field": "openApiSpec",
            "message": "A valid OpenAPI 3.x specification is required",
            "source": "body"
        }]);
        return (400, envelope);
    }

    let (id, updated) = stub.upsert(body.get("name").and_then(Value::as_str));
    let status = if updated { 200 } else { 201 };
    info!(
        "{} deployment {id}",
        if updated { "updated" } else { "created" }
    );
    (
        status,
        json!({
            "ok": true,
            "status": status,
            "data": {
                "updated": updated,
                "deployment": {
                    "id": id,
                    "createdAt": Utc::now().to_rfc3339(),
                    "createdBy": "stub",
                    "updatedBy": "stub",
                    "mcpServerId": format!("mcp_{id}"),
                    "status": "active"
                }
            }
        }),
    )
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(stub: &Stub, mut req: tiny_http::Request) {
    let method = req.method().clone();
    let (path, query) = split_url(req.url());
    debug!("{method} {path}");

    let headers = req
        .headers()
        .iter()
        .map(|h| (h.field.to_string().to_ascii_lowercase(), h.value.to_string()))
        .collect();
    let raw_body = read_body(&mut req).unwrap_or_default();
    let captured = CapturedRequest {
        method: method.to_string(),
        path: path.clone(),
        query,
        headers,
        body: serde_json::from_slice(&raw_body).ok(),
    };

    if path == DEPLOY_ROUTE && method == Method::Post {
        let (status, envelope) = handle_deploy(stub, &captured, &raw_body);
        stub.record(captured);
        respond_json(req, status, &envelope);
        return;
    }
    stub.record(captured);

    if let Some(name) = path.strip_prefix(SPECS_PREFIX) {
        let docs = stub.documents.read().expect("documents lock poisoned");
        match docs.get(name) {
            Some(doc) if method == Method::Get => respond_document(req, doc),
            _ => respond_json(req, 404, &error_envelope(404, "NOT_FOUND", "Not found")),
        }
    } else if path == "/health" && method == Method::Get {
        respond_json(req, 200, &json!({"status": "ok"}));
    } else {
        respond_json(req, 404, &error_envelope(404, "NOT_FOUND", "Not found"));
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(stub: &Arc<Stub>, server: &Server) {
    for request in server.incoming_requests() {
        handle_request(stub, request);
    }
}

/// A stub server on a random local port, served from a background thread.
///
/// Dropping the `TestServer` unblocks and stops the server.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub stub: Arc<Stub>,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    /// Binds to `127.0.0.1:0`.
    pub fn start(stub: Stub) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let stub = Arc::new(stub);
        let srv = Arc::clone(&server);
        let state = Arc::clone(&stub);
        let handle = std::thread::spawn(move || run_server(&state, &srv));

        Self {
            url,
            port,
            stub,
            server,
            _handle: handle,
        }
    }

    /// URL of a document registered with [`Stub::add_document`].
    pub fn document_url(&self, name: &str) -> String {
        format!("{}{SPECS_PREFIX}{name}", self.url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}
