use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{app_context::AppContext, frames::StackFrame};

use super::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub map_file: String,
    pub stacktrace: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub parsed_stacktrace: String,
    pub frames: Vec<StackFrame>,
}

pub async fn parse_stacktrace(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<ParseRequest>,
) -> Result<Json<ParseResponse>, ApiError> {
    info!("Resolving stack trace against {}", request.map_file);

    let annotated = ctx
        .resolver
        .resolve(&request.map_file, &request.stacktrace)
        .await?;

    Ok(Json(ParseResponse {
        parsed_stacktrace: annotated.text,
        frames: annotated.frames,
    }))
}
