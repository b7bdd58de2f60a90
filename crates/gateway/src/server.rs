use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    serde::{Deserialize, Serialize},
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use {
    folio_config::FolioConfig,
    folio_retrieval::{ConversationTurn, RetrievalService},
};

use crate::{
    error::ApiError,
    extract::{PdfTextExtractor, extract_blocking, is_pdf_filename},
    state::GatewayState,
};

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub chat_history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub chunks: usize,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ask", get(ask_handler))
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start_gateway(config: &FolioConfig) -> anyhow::Result<()> {
    let service = Arc::new(RetrievalService::from_config(config)?);
    let embedder = format!(
        "{} ({}-d)",
        service.embedder().model_name(),
        service.embedder().dimensions()
    );
    let chunking = format!(
        "{} chars, {} overlap",
        service.chunker().chunk_size(),
        service.chunker().chunk_overlap()
    );
    let state = GatewayState::new(service, Arc::new(PdfTextExtractor));

    let app = build_gateway_app(Arc::clone(&state), config.server.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("folio gateway v{}", state.version),
        format!("listening on http://{addr}"),
        format!("embeddings: {embedder}"),
        format!("chunking: {chunking}"),
    ];
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(uptime_secs = state.uptime_secs(), "gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Folio PDF assistant API is running",
    }))
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "chat_history_length": state.service.history_len().await,
    }))
}

async fn ask_handler(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<AskParams>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = params.q.unwrap_or_default();
    info!(question = %question, "processing question");

    let answer = state
        .service
        .answer(&question)
        .await
        .map_err(|e| ApiError::from_retrieval("Query failed", e))?;

    Ok(Json(AskResponse {
        answer: answer.answer,
        chat_history: answer.history,
    }))
}

async fn upload_handler(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let Some((file_name, bytes)) = read_file_field(&mut multipart).await? else {
        return Err(ApiError::BadRequest("No file uploaded".into()));
    };
    if !is_pdf_filename(&file_name) {
        return Err(ApiError::BadRequest("File must be a PDF".into()));
    }
    info!(file = %file_name, bytes = bytes.len(), "processing upload");

    let text = extract_blocking(Arc::clone(&state.extractor), bytes)
        .await
        .map_err(|e| ApiError::from_extract("Upload failed", e))?;
    info!(file = %file_name, chars = text.chars().count(), "extracted text");

    let report = state
        .service
        .ingest(&text)
        .await
        .map_err(|e| ApiError::from_retrieval("Upload failed", e))?;

    Ok(Json(UploadResponse {
        status: "success".into(),
        chunks: report.chunk_count,
    }))
}

/// Pull the `file` part out of the form. Other parts are skipped.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<(String, axum::body::Bytes)>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some((file_name, bytes)));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("Upload too large: {}", err.body_text()))
    } else {
        ApiError::BadRequest(format!("Invalid upload: {}", err.body_text()))
    }
}
