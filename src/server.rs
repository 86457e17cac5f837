//! HTTP service boundary.
//!
//! Exposes the pipeline, the trend pivot, and the Q&A layer as a JSON API
//! for dashboard frontends. State is loaded once at startup: the raw batch
//! is shared read-only and the history table sits behind a read/write lock,
//! so classification happens outside the lock and only the append holds it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/simulate-day` | Classify one day's reviews into history (`?date=YYYY-MM-DD`) |
//! | `GET`  | `/trends` | Date-by-topic trend records |
//! | `POST` | `/chat` | Ask a question over recent history |
//! | `GET`  | `/raw-date-range` | Min and max dates in the raw batch |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid date: 'tomorrow'" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500). Per-record
//! classification failures are not HTTP errors; they are reported inside
//! the simulate-day payload.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser dashboards
//! can call the API directly.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::chat::answer;
use crate::classifier::{create_model, ChatModel};
use crate::config::Config;
use crate::pipeline::{append_batch, classify_batch};
use crate::store::{HistoryStore, RawStore};
use crate::trends::{compute_matrix, to_records};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    /// Raw batch, immutable for the life of the process.
    raw: Arc<RawStore>,
    /// History table: many readers, one writer.
    history: Arc<RwLock<HistoryStore>>,
    model: Arc<dyn ChatModel>,
}

/// Initialize logging from the configured level.
///
/// `RUST_LOG` takes precedence over `[server].log_level`. Idempotent: a
/// second call leaves the first subscriber in place.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = tracing::subscriber::set_global_default(registry.with(fmt::layer()));
}

/// Start the HTTP service.
///
/// Binds to `[server].bind`, loads both stores, instantiates the configured
/// chat model, and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let raw = Arc::new(RawStore::load(&config.storage.raw_path));
    let history = Arc::new(RwLock::new(HistoryStore::load(&config.storage.history_path)));
    let model: Arc<dyn ChatModel> = Arc::from(create_model(&config.classifier)?);

    if !config.classifier.is_enabled() {
        println!("classifier disabled: simulate-day will report failures and chat will return error replies");
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        raw,
        history,
        model,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/simulate-day", get(handle_simulate_day))
        .route("/trends", get(handle_trends))
        .route("/chat", post(handle_chat))
        .route("/raw-date-range", get(handle_raw_date_range))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("review service listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}: {}", self.code, self.message);
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error from a pipeline failure.
fn internal_error(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
    }
}

// ============ GET /simulate-day ============

#[derive(Deserialize)]
struct SimulateParams {
    date: Option<String>,
}

/// Handler for `GET /simulate-day`.
///
/// Classifies the raw reviews attributed to `?date` (the configured default
/// date when omitted) and appends the results to history. The history lock
/// is held only for the append, never across model calls. A malformed date
/// is a `400`; classification failures are counters in the payload.
async fn handle_simulate_day(
    State(state): State<AppState>,
    Query(params): Query<SimulateParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date_str = params.date.unwrap_or_else(|| {
        state
            .config
            .pipeline
            .default_date
            .format("%Y-%m-%d")
            .to_string()
    });
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|_| bad_request(format!("invalid date: '{}'. Expected YYYY-MM-DD.", date_str)))?;

    let reviews = state.raw.for_date(date);
    let (rows, mut report) = classify_batch(state.model.as_ref(), date, &reviews).await;

    if report.fetched == 0 {
        return Ok(Json(serde_json::json!({
            "status": "empty",
            "message": format!("No reviews found in CSV for {}", date_str),
            "processed_count": 0,
        })));
    }

    {
        let mut history = state.history.write().await;
        report.replaced = append_batch(
            &mut history,
            date,
            rows,
            &state.config.pipeline.resimulate,
        )
        .map_err(internal_error)?;
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "simulated_date": date.format("%Y-%m-%d").to_string(),
        "reviews_processed_in_batch": report.classified,
        "failed_classifications": report.failed,
        "skipped_empty": report.skipped_empty,
    })))
}

// ============ GET /trends ============

/// Handler for `GET /trends`.
///
/// Returns the trend pivot as one record per topic. An empty history is an
/// empty array, not an error.
async fn handle_trends(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    let history = state.history.read().await;
    let matrix = compute_matrix(history.rows());
    Json(to_records(&matrix))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

/// Handler for `POST /chat`.
///
/// The recent history window is copied out under the read lock and the
/// lock is released before the model call.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let window = state.config.pipeline.chat_context_rows;
    let rows = {
        let history = state.history.read().await;
        history.recent(window).to_vec()
    };

    let reply = answer(state.model.as_ref(), &rows, window, &request.message).await;
    Json(ChatResponse { response: reply })
}

// ============ GET /raw-date-range ============

/// Handler for `GET /raw-date-range`.
///
/// Reports the span of the raw batch so frontends can bound their date
/// pickers. Both fields are `null` when the batch is empty.
async fn handle_raw_date_range(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.raw.date_bounds() {
        Some((min, max)) => Json(serde_json::json!({
            "min_date": min.format("%Y-%m-%d").to_string(),
            "max_date": max.format("%Y-%m-%d").to_string(),
        })),
        None => Json(serde_json::json!({ "min_date": null, "max_date": null })),
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
