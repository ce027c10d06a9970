//! HTTP Server for the Healthdash API.
//!
//! Holds one derived dataset per session; every dashboard query is a full
//! filter + aggregate pass over that dataset.
//!
//! # API Endpoints
//!
//! | Method | Path                            | Description                       |
//! |--------|---------------------------------|-----------------------------------|
//! | GET    | `/health`                       | Health check                      |
//! | POST   | `/api/upload`                   | Upload CSV, open a session        |
//! | GET    | `/api/sessions`                 | List open sessions                |
//! | GET    | `/api/sessions/{id}`            | Session metadata and defaults     |
//! | POST   | `/api/sessions/{id}/dashboard`  | Dashboard for given criteria      |
//! | DELETE | `/api/sessions/{id}`            | Drop a session                    |
//! | GET    | `/api/logs`                     | SSE stream for real-time logs     |

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, HeaderMap, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{
    dataset_warnings, error_response, DashboardRequest, SessionResponse, UploadResponse,
};
use crate::config::ServerConfig;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::models::FilterCriteria;
use crate::session::{SessionStore, SessionSummary};
use crate::transform::pipeline::{build_dashboard, load_bytes, Dashboard, DatasetInfo};

/// Rejection returned by handlers
type ApiError = (StatusCode, Json<Value>);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<SessionStore>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(SessionStore::with_capacity(config.max_sessions))),
            config: Arc::new(config),
        }
    }
}

impl ServerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(PipelineError::Ingest(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Pipeline(PipelineError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user
    pub fn user_message(&self) -> String {
        match self {
            ServerError::Pipeline(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

fn reject(err: ServerError) -> ApiError {
    log_error(err.to_string());
    (err.status_code(), Json(error_response(&err.user_message())))
}

/// Request body limit: the upload itself plus room for multipart framing.
fn body_limit(config: &ServerConfig) -> usize {
    config.max_upload_bytes.saturating_add(64 * 1024)
}

fn multipart_error(err: MultipartError, config: &ServerConfig) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge {
            limit: config.max_upload_bytes,
        }
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", err.body_text()))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = body_limit(&state.config);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/dashboard", post(dashboard))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Healthdash server running on http://localhost:{}", port);
    println!("   POST   /api/upload                  - Upload CSV file");
    println!("   GET    /api/sessions                - List sessions");
    println!("   GET    /api/sessions/{{id}}           - Session info");
    println!("   POST   /api/sessions/{{id}}/dashboard - Filtered dashboard");
    println!("   DELETE /api/sessions/{{id}}           - Close session");
    println!("   GET    /api/logs                    - SSE log stream");
    println!("   GET    /health                      - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "healthdash",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "dashboard": "POST /api/sessions/{id}/dashboard",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before snapshotting history so nothing falls in between
    let rx = LOG_BROADCASTER.subscribe();
    let history = stream::iter(LOG_BROADCASTER.recent());

    let stream = history
        .chain(BroadcastStream::new(rx).filter_map(|result| result.ok()))
        .filter_map(|entry| {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
async fn upload_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > body_limit(&state.config)) {
        return Err(reject(ServerError::PayloadTooLarge {
            limit: state.config.max_upload_bytes,
        }));
    }

    let mut multipart = multipart.map_err(|e| {
        reject(if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge {
                limit: state.config.max_upload_bytes,
            }
        } else {
            ServerError::BadRequest(e.body_text())
        })
    })?;
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(multipart_error(e, &state.config)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| reject(multipart_error(e, &state.config)))?
                    .to_vec(),
            );
        }
    }

    let bytes =
        file_data.ok_or_else(|| reject(ServerError::BadRequest("No file provided".into())))?;

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    );
    println!("{}\n", "=".repeat(70));

    create_session(&state, &bytes, file_name).await.map(Json).map_err(reject)
}

/// Ingest an upload and register it as a new session
pub async fn create_session(
    state: &AppState,
    bytes: &[u8],
    name: Option<String>,
) -> ServerResult<UploadResponse> {
    let limit = state.config.max_upload_bytes;
    if bytes.len() > limit {
        return Err(ServerError::PayloadTooLarge { limit });
    }

    let dataset = load_bytes(bytes)?;
    let info = DatasetInfo::from_dataset(&dataset);
    let default_criteria = FilterCriteria::full_domain(&dataset);
    let dashboard = build_dashboard(&dataset, &default_criteria, false);
    let warnings = dataset_warnings(&info);

    let session_id = {
        let mut sessions = state.sessions.write().await;
        if let Some(idle) = state.config.session_idle() {
            let evicted = sessions.evict_idle(idle);
            if evicted > 0 {
                log_info(format!("Dropped {} idle session(s)", evicted));
            }
        }
        sessions.insert(dataset, name)
    };

    log_success(format!(
        "Session {} ready: {} patients match the default filters",
        session_id, dashboard.summary.patient_count
    ));

    Ok(UploadResponse {
        session_id: session_id.to_string(),
        status: if warnings.is_empty() { "ready" } else { "warning" }.to_string(),
        warnings,
        dataset: info,
        default_criteria,
        dashboard,
    })
}

fn parse_session_id(raw: &str) -> ServerResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ServerError::BadRequest(format!("Invalid session id: {}", raw)))
}

/// List sessions endpoint
async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    let sessions = state.sessions.read().await;
    Json(sessions.list().into_iter().map(SessionSummary::from).collect())
}

/// Session metadata endpoint
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = parse_session_id(&id).map_err(reject)?;
    let sessions = state.sessions.read().await;
    let session = sessions
        .peek(&id)
        .ok_or_else(|| reject(ServerError::SessionNotFound(id.to_string())))?;

    Ok(Json(SessionResponse {
        session: SessionSummary::from(session),
        dataset: DatasetInfo::from_dataset(&session.dataset),
        default_criteria: FilterCriteria::full_domain(&session.dataset),
    }))
}

/// Close session endpoint
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_session_id(&id).map_err(reject)?;
    if state.sessions.write().await.remove(&id) {
        Ok(Json(json!({ "status": "ok", "sessionId": id.to_string() })))
    } else {
        Err(reject(ServerError::SessionNotFound(id.to_string())))
    }
}

/// Dashboard query endpoint
async fn dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Result<Json<DashboardRequest>, JsonRejection>,
) -> Result<Json<Dashboard>, ApiError> {
    let Json(request) = request.map_err(|e| reject(ServerError::BadRequest(e.body_text())))?;
    let id = parse_session_id(&id).map_err(reject)?;
    query_dashboard(&state, &id, &request).await.map(Json).map_err(reject)
}

/// Compute a dashboard for a stored session
pub async fn query_dashboard(
    state: &AppState,
    id: &Uuid,
    request: &DashboardRequest,
) -> ServerResult<Dashboard> {
    let dataset = state
        .sessions
        .write()
        .await
        .get(id)
        .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))?;

    Ok(build_dashboard(&dataset, &request.criteria, request.include_rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    const CSV: &[u8] = b"Age,Gender,Admission Type,Medical Condition,Date of Admission,Billing Amount
40,M,Emergency,Flu,2023-01-05,100
70,F,Emergency,Flu,2023-02-10,300
20,M,Elective,Asthma,########,
";

    fn state() -> AppState {
        AppState::new(ServerConfig::default())
    }

    /// Serve `state` on a local port, send one raw HTTP request and return
    /// the raw response.
    async fn send_raw(state: AppState, request: String) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        let _ = stream.read_to_end(&mut response).await;
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_create_session_defaults() {
        let state = state();
        let response = create_session(&state, CSV, Some("patients.csv".into())).await.unwrap();

        assert_eq!(response.status, "ready");
        assert_eq!(response.dataset.row_count, 3);
        assert_eq!(response.default_criteria.age_min, 20);
        assert_eq!(response.dashboard.summary.patient_count, 3);
        assert_eq!(state.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_session_rejects_missing_columns() {
        let err = create_session(&state(), b"Age,Name\n1,x\n", None).await.unwrap_err();
        assert!(matches!(
            err,
            ServerError::Pipeline(PipelineError::Ingest(IngestError::MissingColumns(_)))
        ));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.user_message().contains("Gender"));
    }

    #[tokio::test]
    async fn test_create_session_size_limit() {
        let mut config = ServerConfig::default();
        config.max_upload_bytes = 10;
        let err = create_session(&AppState::new(config), CSV, None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_query_dashboard() {
        let state = state();
        let response = create_session(&state, CSV, None).await.unwrap();
        let id = parse_session_id(&response.session_id).unwrap();

        let request = DashboardRequest {
            criteria: FilterCriteria::new(18, 99, ["M", "F"], ["Emergency"]),
            include_rows: true,
        };
        let dashboard = query_dashboard(&state, &id, &request).await.unwrap();

        assert_eq!(dashboard.summary.patient_count, 2);
        assert_eq!(dashboard.average_billing_display, "$200.00");
        assert_eq!(dashboard.rows.map(|r| r.len()), Some(2));
    }

    #[tokio::test]
    async fn test_query_unknown_session() {
        let request = DashboardRequest {
            criteria: FilterCriteria::new(0, 1, ["M"], ["Urgent"]),
            include_rows: false,
        };
        let err = query_dashboard(&state(), &Uuid::new_v4(), &request).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_session_with_huge_idle_timeout() {
        let mut config = ServerConfig::default();
        config.session_idle_secs = 100_000_000_000_000_000;
        let state = AppState::new(config);

        let response = create_session(&state, CSV, None).await.unwrap();
        assert_eq!(response.dataset.row_count, 3);
        assert_eq!(state.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let mut config = ServerConfig::default();
        config.max_upload_bytes = 10;
        let request = format!(
            "POST /api/upload HTTP/1.1\r\n\
             Host: localhost\r\n\
             Content-Type: multipart/form-data; boundary=XYZ\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n",
            10 * 1024 * 1024
        );

        let response = send_raw(AppState::new(config), request).await;
        assert!(response.starts_with("HTTP/1.1 413"), "{}", response);
        assert!(response.contains("\"status\":\"error\""));
    }

    #[tokio::test]
    async fn test_malformed_dashboard_body_is_bad_request() {
        let body = "{not json";
        let request = format!(
            "POST /api/sessions/{}/dashboard HTTP/1.1\r\n\
             Host: localhost\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            Uuid::new_v4(),
            body.len(),
            body
        );

        let response = send_raw(state(), request).await;
        assert!(response.starts_with("HTTP/1.1 400"), "{}", response);
        assert!(response.contains("\"status\":\"error\""));
    }

    #[test]
    fn test_parse_session_id() {
        assert!(parse_session_id("not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_session_id(&id.to_string()).unwrap(), id);
    }
}
