mod maps;
mod parse;
mod upload;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;

pub use maps::*;
pub use parse::*;
pub use upload::*;

use crate::{
    app_context::AppContext,
    error::{ResolveError, StoreError},
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

impl ApiError {
    fn to_status_code(&self) -> StatusCode {
        match self {
            ApiError::Resolve(err) => match err.root() {
                ResolveError::Map(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ResolveError::Store(err) => store_status_code(err),
                ResolveError::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Store(err) => store_status_code(err),
            ApiError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn to_json(&self) -> Json<Value> {
        Json(json!({ "error": self.to_string() }))
    }
}

fn store_status_code(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidPath(_) | StoreError::Zip(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.to_status_code(), self.to_json()).into_response()
    }
}

async fn index() -> &'static str {
    "unminify service"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

pub fn get_router(context: Arc<AppContext>) -> Router {
    let max_body_size = context.config.max_body_size;

    Router::<Arc<AppContext>>::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(index)) // No background loops, axum being up is enough
        .route("/sourcemaps", get(list_sourcemaps))
        .route("/parse", post(parse_stacktrace))
        .route("/upload", post(upload_map))
        .route("/upload-zip", post(upload_zip))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(context)
}
