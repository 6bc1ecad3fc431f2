use std::error::Error;

use crate::model::{self, network::format_revision};
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        FromRequest,
    },
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(model::ApiError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> axum::response::Response {
        let Self(value) = self;
        axum::Json(value).into_response()
    }
}

/// A JSON body tagged with the store revision it reflects.
pub struct WithRevision<T>(pub T, pub i64);

impl<T: Serialize> IntoResponse for WithRevision<T> {
    fn into_response(self) -> axum::response::Response {
        let Self(value, revision) = self;
        let mut response = axum::Json(value).into_response();
        if let Ok(etag) = HeaderValue::from_str(&format_revision(revision)) {
            response.headers_mut().insert(header::ETAG, etag);
        }
        response
    }
}

fn chain(err: &dyn Error) -> String {
    let mut s = format!("{}", err);

    let mut source_ = err.source();
    while let Some(source) = source_ {
        s.push_str(&format!(": {}", source));
        source_ = source.source();
    }

    s
}

impl From<JsonRejection> for model::ApiError {
    fn from(value: JsonRejection) -> Self {
        model::ApiError::InvalidJson(chain(&value))
    }
}

impl From<MultipartRejection> for model::ApiError {
    fn from(value: MultipartRejection) -> Self {
        warn!("multipart rejected: {}", chain(&value));
        model::ApiError::BadRequest("No file uploaded")
    }
}

impl IntoResponse for model::ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = |status: StatusCode, message: String| {
            (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
        };

        match self {
            // Malformed bodies are not told apart from server faults.
            model::ApiError::InvalidJson(err) => {
                warn!("invalid json body: {}", err);
                body(StatusCode::INTERNAL_SERVER_ERROR, String::from("Internal Error"))
            }

            model::ApiError::Store(err) => {
                error!("store: {}", err);
                body(StatusCode::INTERNAL_SERVER_ERROR, String::from("Internal Error"))
            }

            model::ApiError::Io(err) => {
                error!("io: {}", err);
                body(StatusCode::INTERNAL_SERVER_ERROR, String::from("Internal Error"))
            }

            model::ApiError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),

            model::ApiError::Unauthorized => {
                body(StatusCode::UNAUTHORIZED, String::from("Unauthorized"))
            }

            model::ApiError::BadRequest(message) => {
                body(StatusCode::BAD_REQUEST, String::from(message))
            }

            err @ model::ApiError::PreconditionFailed => {
                body(StatusCode::PRECONDITION_FAILED, err.to_string())
            }

            err @ model::ApiError::Conflict { current, .. } => {
                let mut response = body(StatusCode::CONFLICT, err.to_string());
                if let Ok(etag) = HeaderValue::from_str(&format_revision(current)) {
                    response.headers_mut().insert(header::ETAG, etag);
                }
                response
            }

            model::ApiError::RangeNotSatisfiable { size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                "Requested Range Not Satisfiable",
            )
                .into_response(),
        }
    }
}
