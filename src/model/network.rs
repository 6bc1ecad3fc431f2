use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Debug)]
pub struct RestoreRequest {
    pub key: Option<String>,
    pub data: Option<Value>,
}

#[derive(Serialize, Debug)]
pub struct RestoreResponse {
    pub success: bool,
    pub message: &'static str,
    pub revision: i64,
}

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub url: String,
}

/// Parses an `ETag`/`If-Match` value of the form `"12"`.
pub fn parse_revision(value: &str) -> Option<i64> {
    let value = value.trim();
    let value = value.strip_prefix("W/").unwrap_or(value);
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .parse()
        .ok()
}

pub fn format_revision(revision: i64) -> String {
    format!("\"{}\"", revision)
}
