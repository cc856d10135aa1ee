use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::{
    app_context::AppContext,
    metric_consts::{ARCHIVE_UPLOADS, MAP_UPLOADS},
};

use super::ApiError;

const ARCHIVE_FIELD: &str = "zipFile";
const MAP_FIELD: &str = "mapFile";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<String>,
}

// Pull the named file field out of a multipart body, ignoring any other fields
async fn take_file(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidUpload(e.to_string()))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidUpload(format!("{} has no file name", field_name)))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidUpload(e.to_string()))?;
        return Ok((file_name, data));
    }

    Err(ApiError::InvalidUpload(format!(
        "missing {} field",
        field_name
    )))
}

pub async fn upload_map(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (file_name, data) = take_file(&mut multipart, MAP_FIELD).await?;
    let id = ctx.store.store_map(&file_name, &data).await?;
    metrics::counter!(MAP_UPLOADS).increment(1);

    Ok(Json(UploadResponse {
        message: "Map file uploaded successfully.".to_string(),
        files: vec![id],
    }))
}

pub async fn upload_zip(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (file_name, data) = take_file(&mut multipart, ARCHIVE_FIELD).await?;
    let files = ctx.store.extract_archive(&file_name, data.to_vec()).await?;
    metrics::counter!(ARCHIVE_UPLOADS).increment(1);

    Ok(Json(UploadResponse {
        message: "ZIP file uploaded and extracted successfully.".to_string(),
        files,
    }))
}
