use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
};
use serde_json::Value;

use super::AppState;
use crate::{
    compat::{AppJson, WithRevision},
    model::{network::parse_revision, sections, ApiError, Document},
};

/// `If-Match: "<revision>"`. A header that names no revision refuses the
/// write instead of making it unconditional.
fn expected_revision(headers: &HeaderMap) -> Result<Option<i64>, ApiError> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(parse_revision)
        .map(Some)
        .ok_or(ApiError::PreconditionFailed)
}

/// `GET /api/content`
pub async fn fetch_handler(State(state): State<AppState>) -> WithRevision<Document> {
    let snapshot = state.site.read().await;
    WithRevision(snapshot.document, snapshot.revision)
}

/// `POST /api/content`
///
/// Any object is accepted and its top-level keys persisted as sent.
pub async fn replace_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(patch): AppJson<Document>,
) -> Result<WithRevision<Document>, ApiError> {
    let expected = expected_revision(&headers)?;
    let snapshot = state.site.write(patch, expected).await?;
    Ok(WithRevision(snapshot.document, snapshot.revision))
}

/// `PUT /api/content/:section`
pub async fn section_handler(
    State(state): State<AppState>,
    Path(section): Path<String>,
    headers: HeaderMap,
    AppJson(payload): AppJson<Value>,
) -> Result<WithRevision<Document>, ApiError> {
    let mut patch = Document::new();
    patch.insert(section, payload);

    let expected = expected_revision(&headers)?;
    let snapshot = state.site.write(patch, expected).await?;
    Ok(WithRevision(snapshot.document, snapshot.revision))
}

/// `GET /api/news/:slug`
pub async fn news_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<AppJson<sections::NewsEntry>, ApiError> {
    let snapshot = state.site.read().await;
    sections::find_news(&snapshot.document, &slug)
        .map(AppJson)
        .ok_or(ApiError::NotFound)
}
