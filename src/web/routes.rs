use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::page;
use crate::assistant::InteractionController;

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    controller: InteractionController,
    logo_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(controller: InteractionController, logo_path: PathBuf) -> Self {
        Self {
            controller,
            logo_path: Arc::new(logo_path),
        }
    }
}

/// Query string of the question form.
#[derive(Debug, Default, Deserialize)]
pub struct AskParams {
    #[serde(default)]
    pub question: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/logo", get(logo))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// One interaction cycle: read the question, run the controller, render the page.
async fn index(
    State(state): State<AppState>,
    Query(params): Query<AskParams>,
) -> (StatusCode, Html<String>) {
    match state.controller.run(&params.question).await {
        Ok(interaction) => (
            StatusCode::OK,
            Html(page::render_page(&params.question, &interaction)),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Interaction aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page::render_error_page(&params.question, &e.to_string())),
            )
        }
    }
}

async fn logo(State(state): State<AppState>) -> Response {
    let path = state.logo_path.as_path();
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, image_content_type(path))], bytes).into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Logo unavailable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn image_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
