use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::app_context::AppContext;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListMapsQuery {
    pub version: Option<String>,
}

pub async fn list_sourcemaps(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListMapsQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let maps = ctx.store.list_maps(query.version.as_deref()).await?;
    Ok(Json(maps))
}
