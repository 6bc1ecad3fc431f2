use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::site::SiteData;

pub mod content;
pub mod restore;
pub mod upload;

#[derive(Clone)]
pub struct AppState {
    pub site: Arc<SiteData>,
    pub uploads: Arc<Uploads>,
    pub restore_secret: Option<Arc<str>>,
}

pub struct Uploads {
    pub dir: PathBuf,
    pub url_prefix: String,
    pub max_bytes: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    let upload_limit = match state.uploads.max_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };
    let files = format!("{}/*path", state.uploads.url_prefix.trim_end_matches('/'));

    Router::new()
        .route(
            "/api/content",
            get(content::fetch_handler).post(content::replace_handler),
        )
        .route("/api/content/:section", put(content::section_handler))
        .route("/api/news/:slug", get(content::news_handler))
        .route("/api/restore-db", post(restore::restore_handler))
        .route(
            "/api/upload",
            post(upload::upload_handler).layer(upload_limit),
        )
        .route(&files, get(upload::serve_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
