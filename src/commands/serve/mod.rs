//! The mnemo daemon: a blocking HTTP server over the memory service.
//!
//! Design: thread-per-connection microserver, no async. The boundary is a
//! trusted localhost control plane - bind 127.0.0.1 and there is no auth to
//! configure or leak.
//!
//! Routes:
//! - `POST /store`           embed + dedup + persist a learning
//! - `POST /recall`          rank learnings against a query
//! - `GET  /health`          provider reachability + storage path
//! - `GET  /stats`           corpus statistics
//! - `POST /chunks/store`    upsert a transcript chunk
//! - `POST /chunks/search`   rank chunks against a query
//! - `POST /chunks/sessions` rank whole sessions (fork detection)

mod microserver;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener};
use std::sync::Arc;

use microserver::{HttpRequest, HttpResponse};
use mnemo::embeddings::OllamaProvider;
use mnemo::error::MemoryError;
use mnemo::store::{NewLearning, TranscriptChunk};
use mnemo::{LearningStore, MemoryConfig, MemoryService};

// === Request bodies ===

fn default_confidence() -> f64 {
    0.9
}

#[derive(Deserialize)]
struct StoreBody {
    #[serde(rename = "type")]
    kind: String,
    content: String,
    context: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
    session_source: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecallBody {
    query: String,
    min_similarity: Option<f32>,
    max_results: Option<usize>,
}

/// `/chunks/search` reuses the recall body shape.
#[derive(Deserialize)]
struct ChunkStoreBody {
    session_id: String,
    chunk_index: i64,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionsBody {
    query: String,
    min_similarity: Option<f32>,
    max_sessions: Option<usize>,
}

// === Response helpers ===

impl HttpResponse {
    fn json(status: u16, value: &impl Serialize) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }
}

fn json_error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::json(status, &serde_json::json!({"error": message}))
}

/// Map a core error to the HTTP outcome its class demands.
fn error_response(err: &MemoryError) -> HttpResponse {
    match err {
        MemoryError::Validation(_) => json_error(400, &err.to_string()),
        MemoryError::EmbeddingUnavailable(_) | MemoryError::EmbeddingTimeout { .. } => {
            json_error(503, &err.to_string())
        }
        MemoryError::DimensionMismatch { .. } | MemoryError::CorruptEmbedding { .. } => {
            // Invariant violation: log loudly, fail this call only
            eprintln!("ERROR: {err}");
            json_error(500, &err.to_string())
        }
        MemoryError::Storage(_) => {
            eprintln!("ERROR: {err}");
            json_error(500, &err.to_string())
        }
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(request: &HttpRequest) -> Result<T, HttpResponse> {
    if request.body.is_empty() {
        return Err(json_error(400, "Missing request body"));
    }
    serde_json::from_slice(&request.body)
        .map_err(|e| json_error(400, &format!("Invalid JSON: {e}")))
}

// === Handlers ===

fn route_request(request: &HttpRequest, service: &MemoryService) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => handle_health(service),
        ("GET", "/stats") => handle_stats(service),
        ("POST", "/store") => handle_store(request, service),
        ("POST", "/recall") => handle_recall(request, service),
        ("POST", "/chunks/store") => handle_chunk_store(request, service),
        ("POST", "/chunks/search") => handle_chunk_search(request, service),
        ("POST", "/chunks/sessions") => handle_sessions(request, service),
        _ => json_error(404, "Not found"),
    }
}

fn handle_health(service: &MemoryService) -> HttpResponse {
    HttpResponse::json(200, &service.health())
}

fn handle_stats(service: &MemoryService) -> HttpResponse {
    match service.stats() {
        Ok(report) => HttpResponse::json(200, &report),
        Err(e) => error_response(&e),
    }
}

fn handle_store(request: &HttpRequest, service: &MemoryService) -> HttpResponse {
    let body: StoreBody = match parse_body(request) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let learning = NewLearning {
        kind: body.kind,
        content: body.content,
        context: body.context,
        confidence: body.confidence,
        session_source: body.session_source,
    };

    match service.store_learning(learning) {
        Ok(outcome) => HttpResponse::json(
            200,
            &serde_json::json!({
                "status": outcome.status(),
                "id": outcome.id(),
            }),
        ),
        Err(e) => error_response(&e),
    }
}

fn handle_recall(request: &HttpRequest, service: &MemoryService) -> HttpResponse {
    let body: RecallBody = match parse_body(request) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match service.recall(&body.query, body.min_similarity, body.max_results) {
        Ok(memories) => HttpResponse::json(200, &serde_json::json!({ "memories": memories })),
        // Recall sits on an interactive path: a down or slow provider means
        // "no memories right now", not a failed request.
        Err(e) if e.is_provider_failure() => {
            eprintln!("recall degraded: {e}");
            HttpResponse::json(200, &serde_json::json!({ "memories": [] }))
        }
        Err(e) => error_response(&e),
    }
}

fn handle_chunk_store(request: &HttpRequest, service: &MemoryService) -> HttpResponse {
    let body: ChunkStoreBody = match parse_body(request) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let chunk = TranscriptChunk {
        session_id: body.session_id.clone(),
        chunk_index: body.chunk_index,
        content: body.content,
    };

    match service.store_chunk(chunk) {
        Ok(()) => HttpResponse::json(
            200,
            &serde_json::json!({
                "status": "stored",
                "session_id": body.session_id,
                "chunk_index": body.chunk_index,
            }),
        ),
        Err(e) => error_response(&e),
    }
}

fn handle_chunk_search(request: &HttpRequest, service: &MemoryService) -> HttpResponse {
    let body: RecallBody = match parse_body(request) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match service.search_chunks(&body.query, body.min_similarity, body.max_results) {
        Ok(chunks) => HttpResponse::json(
            200,
            &serde_json::json!({ "count": chunks.len(), "chunks": chunks }),
        ),
        Err(e) => error_response(&e),
    }
}

fn handle_sessions(request: &HttpRequest, service: &MemoryService) -> HttpResponse {
    let body: SessionsBody = match parse_body(request) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match service.relevant_sessions(&body.query, body.min_similarity, body.max_sessions) {
        Ok(sessions) => HttpResponse::json(
            200,
            &serde_json::json!({ "count": sessions.len(), "sessions": sessions }),
        ),
        Err(e) => error_response(&e),
    }
}

// === Transport ===

fn handle_connection(stream: &mut (impl Read + Write), service: &MemoryService) {
    let request = match microserver::read_request(stream) {
        Some(Ok(request)) => request,
        Some(Err(e)) => {
            microserver::write_response(stream, &json_error(e.status(), &e.to_string()));
            return;
        }
        None => return,
    };

    let response = route_request(&request, service);
    microserver::write_response(stream, &response);
}

/// Options for starting the daemon (CLI overrides on top of config).
#[derive(Default)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Run the mnemo daemon. Blocks forever.
pub fn run_server(options: ServeOptions) -> Result<()> {
    let mut config = MemoryConfig::load(mnemo::paths::config_path())?;
    if let Some(host) = options.host {
        config.host = host;
    }
    if let Some(port) = options.port {
        config.port = port;
    }

    if config.host != "127.0.0.1" && config.host != "localhost" {
        eprintln!(
            "WARNING: Binding to {} exposes the daemon to the network.",
            config.host
        );
        eprintln!("  There is no auth and no encryption (HTTP only). Keep it on localhost.");
    }

    std::fs::create_dir_all(mnemo::paths::mnemo_home())?;
    let db_path = mnemo::paths::db_path();
    let store = LearningStore::open(&db_path)
        .with_context(|| format!("opening memory database {}", db_path.display()))?;
    let provider = Box::new(OllamaProvider::new(&config));

    let addr = config.bind_addr();
    let model = config.embedding_model.clone();
    let service = Arc::new(MemoryService::new(store, provider, config, db_path.clone()));

    write_pid_file()?;
    #[cfg(unix)]
    register_signal_handlers();

    let listener = TcpListener::bind(&addr)
        .with_context(|| format!("binding daemon listener on {addr}"))?;

    println!("mnemo daemon starting");
    println!("   PID: {}", std::process::id());
    println!("   Listening on http://{addr}");
    println!("   Database: {}", db_path.display());
    println!("   Model: {model}");
    println!("   Press Ctrl+C to stop\n");

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    handle_connection(&mut stream, &service);
                    let _ = stream.shutdown(Shutdown::Write);
                });
            }
            Err(e) => eprintln!("accept error: {e}"),
        }
    }

    Ok(())
}

/// Write the PID file for daemon lifecycle management.
fn write_pid_file() -> Result<()> {
    let pid_path = mnemo::paths::pid_path();
    std::fs::create_dir_all(mnemo::paths::run_dir())?;
    std::fs::write(&pid_path, std::process::id().to_string())
        .with_context(|| format!("writing PID file {}", pid_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&pid_path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", pid_path.display()))?;
    }

    Ok(())
}

fn cleanup_pid_file() {
    let _ = std::fs::remove_file(mnemo::paths::pid_path());
}

#[cfg(unix)]
fn register_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGINT,
            sigint_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGTERM,
            sigint_handler as *const () as libc::sighandler_t,
        );
    }
}

#[cfg(unix)]
extern "C" fn sigint_handler(_: libc::c_int) {
    cleanup_pid_file();
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo::embeddings::EmbeddingProvider;
    use std::path::PathBuf;

    /// Deterministic provider: looks vectors up in a fixed table.
    struct TableProvider {
        table: Vec<(&'static str, Vec<f32>)>,
    }

    impl EmbeddingProvider for TableProvider {
        fn embed(&self, text: &str) -> mnemo::error::Result<Vec<f32>> {
            self.table
                .iter()
                .find(|(t, _)| *t == text)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| MemoryError::EmbeddingUnavailable("unknown text".to_string()))
        }

        fn model_name(&self) -> &str {
            "table-test"
        }

        fn is_reachable(&self) -> bool {
            true
        }
    }

    /// Provider that is always down, for degradation tests.
    struct DownProvider;

    impl EmbeddingProvider for DownProvider {
        fn embed(&self, _text: &str) -> mnemo::error::Result<Vec<f32>> {
            Err(MemoryError::EmbeddingUnavailable("connection refused".to_string()))
        }

        fn model_name(&self) -> &str {
            "down"
        }

        fn is_reachable(&self) -> bool {
            false
        }
    }

    fn service_with(provider: Box<dyn EmbeddingProvider>) -> MemoryService {
        MemoryService::new(
            LearningStore::open_in_memory().unwrap(),
            provider,
            MemoryConfig::default(),
            PathBuf::from("/tmp/test.db"),
        )
    }

    fn post(path: &str, body: &str) -> HttpRequest {
        HttpRequest {
            method: "POST".to_string(),
            path: path.to_string(),
            headers: vec![],
            body: body.as_bytes().to_vec(),
        }
    }

    fn body_json(response: &HttpResponse) -> serde_json::Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn test_store_then_duplicate() {
        let service = service_with(Box::new(TableProvider {
            table: vec![
                ("X strips variables before Y sees them", vec![1.0, 0.02]),
                ("Variables get stripped by X before reaching Y", vec![1.0, 0.01]),
            ],
        }));

        let first = route_request(
            &post(
                "/store",
                r#"{"type":"GOTCHA","content":"X strips variables before Y sees them"}"#,
            ),
            &service,
        );
        assert_eq!(first.status, 200);
        let first_json = body_json(&first);
        assert_eq!(first_json["status"], "stored");
        let first_id = first_json["id"].as_i64().unwrap();

        // Paraphrase lands above the duplicate threshold
        let second = route_request(
            &post(
                "/store",
                r#"{"type":"GOTCHA","content":"Variables get stripped by X before reaching Y"}"#,
            ),
            &service,
        );
        let second_json = body_json(&second);
        assert_eq!(second_json["status"], "duplicate");
        assert_eq!(second_json["id"].as_i64().unwrap(), first_id);
    }

    #[test]
    fn test_store_empty_content_is_400() {
        let service = service_with(Box::new(DownProvider));
        let response = route_request(&post("/store", r#"{"type":"GOTCHA","content":"  "}"#), &service);
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_store_provider_down_is_503() {
        let service = service_with(Box::new(DownProvider));
        let response = route_request(&post("/store", r#"{"type":"GOTCHA","content":"x"}"#), &service);
        assert_eq!(response.status, 503);
    }

    #[test]
    fn test_recall_degrades_when_provider_down() {
        let service = service_with(Box::new(DownProvider));
        let response = route_request(&post("/recall", r#"{"query":"anything"}"#), &service);
        assert_eq!(response.status, 200);
        assert_eq!(body_json(&response)["memories"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_recall_empty_query_is_400() {
        let service = service_with(Box::new(DownProvider));
        let response = route_request(&post("/recall", r#"{"query":""}"#), &service);
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_unknown_route_is_404() {
        let service = service_with(Box::new(DownProvider));
        let request = HttpRequest {
            method: "GET".to_string(),
            path: "/nope".to_string(),
            headers: vec![],
            body: vec![],
        };
        assert_eq!(route_request(&request, &service).status, 404);
    }

    #[test]
    fn test_health_reports_provider_state() {
        let service = service_with(Box::new(DownProvider));
        let request = HttpRequest {
            method: "GET".to_string(),
            path: "/health".to_string(),
            headers: vec![],
            body: vec![],
        };
        let response = route_request(&request, &service);
        assert_eq!(response.status, 200);
        let json = body_json(&response);
        assert_eq!(json["ok"], false);
        assert_eq!(json["embeddingProviderReachable"], false);
        assert_eq!(json["storagePath"], "/tmp/test.db");
    }

    #[test]
    fn test_invalid_json_is_400() {
        let service = service_with(Box::new(DownProvider));
        let response = route_request(&post("/store", "{not json"), &service);
        assert_eq!(response.status, 400);
    }
}
