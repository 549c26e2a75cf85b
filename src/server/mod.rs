//! HTTP API server.
//!
//! REST endpoints for loading videos, playback-anchored chat, and
//! timestamped notes.

use crate::cli::Output;
use crate::config::Settings;
use crate::context::ContextChunk;
use crate::error::GraspError;
use crate::orchestrator::Orchestrator;
use crate::store::{MessageRecord, NewNote, NoteRecord, VideoRecord};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_server(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/video/load", post(load_video))
        .route("/api/video/{video_id}", get(get_video))
        .route("/api/videos", get(list_videos))
        .route("/api/chat/message", post(chat_message))
        .route("/api/chat/history/{video_id}", get(chat_history))
        .route("/api/notes", post(create_note))
        .route(
            "/api/notes/{id}",
            get(list_notes).put(update_note).delete(delete_note),
        )
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Grasp API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Load Video", "POST   /api/video/load");
    Output::kv("Get Video", "GET    /api/video/:video_id");
    Output::kv("List Videos", "GET    /api/videos");
    Output::kv("Chat", "POST   /api/chat/message");
    Output::kv("Chat History", "GET    /api/chat/history/:video_id");
    Output::kv("Notes", "POST   /api/notes, GET/PUT/DELETE /api/notes/:id");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct VideoLoadRequest {
    url: String,
    #[serde(default)]
    force: bool,
}

#[derive(Serialize)]
struct VideoResponse {
    id: String,
    youtube_id: String,
    title: String,
    duration: i64,
    chunk_count: usize,
}

#[derive(Serialize)]
struct VideoDetailResponse {
    #[serde(flatten)]
    video: VideoRecord,
    chunk_count: usize,
}

#[derive(Deserialize)]
struct ChatMessageRequest {
    video_id: String,
    message: String,
    #[serde(default)]
    current_timestamp: f64,
}

#[derive(Serialize)]
struct ChatMessageResponse {
    role: &'static str,
    content: String,
    context_chunks: Vec<ContextChunk>,
}

#[derive(Deserialize)]
struct NoteCreateRequest {
    video_id: String,
    timestamp: f64,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct NoteUpdateRequest {
    content: Option<String>,
    tags: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map a pipeline error to an HTTP response.
fn error_response(e: GraspError) -> Response {
    let status = match &e {
        GraspError::InvalidInput(_) | GraspError::VideoSource(_) => StatusCode::BAD_REQUEST,
        GraspError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn load_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VideoLoadRequest>,
) -> Response {
    match state.orchestrator.load_video(&req.url, req.force).await {
        Ok(result) => Json(VideoResponse {
            id: result.video_id.clone(),
            youtube_id: result.video_id,
            title: result.title,
            duration: result.duration,
            chunk_count: result.chunk_count,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Response {
    let db = state.orchestrator.database();

    let video = match db.get_video(&video_id) {
        Ok(Some(v)) => v,
        Ok(None) => {
            return error_response(GraspError::NotFound(format!("Video {}", video_id)));
        }
        Err(e) => return error_response(e),
    };

    match db.chunk_count(&video_id) {
        Ok(chunk_count) => Json(VideoDetailResponse { video, chunk_count }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_videos(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.database().list_videos() {
        Ok(videos) => Json(videos).into_response(),
        Err(e) => error_response(e),
    }
}

async fn chat_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatMessageRequest>,
) -> Response {
    match state
        .orchestrator
        .answer(&req.video_id, &req.message, req.current_timestamp)
        .await
    {
        Ok(outcome) => Json(ChatMessageResponse {
            role: "assistant",
            content: outcome.answer,
            context_chunks: outcome.context,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn chat_history(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Response {
    match state.orchestrator.database().chat_history(&video_id) {
        Ok(messages) => Json::<Vec<MessageRecord>>(messages).into_response(),
        Err(e) => error_response(e),
    }
}

async fn create_note(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NoteCreateRequest>,
) -> Response {
    let note = NewNote {
        video_id: req.video_id,
        timestamp: req.timestamp,
        content: req.content,
        tags: req.tags,
    };

    match state.orchestrator.database().insert_note(&note) {
        Ok(created) => Json::<NoteRecord>(created).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_notes(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Response {
    match state.orchestrator.database().notes_for_video(&video_id) {
        Ok(notes) => Json::<Vec<NoteRecord>>(notes).into_response(),
        Err(e) => error_response(e),
    }
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
    Json(req): Json<NoteUpdateRequest>,
) -> Response {
    match state.orchestrator.database().update_note(
        note_id,
        req.content.as_deref(),
        req.tags.as_deref(),
    ) {
        Ok(updated) => Json::<NoteRecord>(updated).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
) -> Response {
    match state.orchestrator.database().delete_note(note_id) {
        Ok(()) => Json(serde_json::json!({ "status": "deleted" })).into_response(),
        Err(e) => error_response(e),
    }
}
