use axum::extract::State;
use serde_json::Value;
use tracing::warn;

use super::AppState;
use crate::{
    compat::AppJson,
    model::{
        network::{RestoreRequest, RestoreResponse},
        ApiError,
    },
};

/// Empty payloads: `null`, `false`, `0` and `""`. Empty objects and arrays
/// are restorable.
fn is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// `POST /api/restore-db`
///
/// Overwrites the stored document with `data`, no merge. Refused outright
/// when no secret is configured.
pub async fn restore_handler(
    State(state): State<AppState>,
    AppJson(request): AppJson<RestoreRequest>,
) -> Result<AppJson<RestoreResponse>, ApiError> {
    let authorized = match (&state.restore_secret, &request.key) {
        (Some(secret), Some(key)) => secret.as_bytes() == key.as_bytes(),
        _ => false,
    };
    if !authorized {
        warn!("restore refused: bad or missing key");
        return Err(ApiError::Unauthorized);
    }

    let data = match request.data {
        Some(data) if !is_empty(&data) => data,
        _ => return Err(ApiError::BadRequest("No data provided")),
    };

    let revision = state.site.restore(&data).await?;
    Ok(AppJson(RestoreResponse {
        success: true,
        message: "Data restored successfully",
        revision,
    }))
}
