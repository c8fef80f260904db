//! Serving stored item images back to clients.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /media/{name}
pub async fn serve(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let (bytes, content_type) = state.media.open(&name).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
