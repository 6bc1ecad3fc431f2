use std::io::{self, SeekFrom};

use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{stream, Stream};
use time::OffsetDateTime;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncSeekExt},
};
use tracing::info;

use super::AppState;
use crate::{
    compat::AppJson,
    model::{network::UploadResponse, ApiError},
    upload,
};

const CHUNK: usize = 64 * 1024;

/// `POST /api/upload`
///
/// Takes the multipart field `file` and writes it to the upload directory
/// under a timestamped, sanitized name.
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AppJson<UploadResponse>, ApiError> {
    let mut multipart = multipart?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("No file uploaded"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or("upload.bin").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("No file uploaded"))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("No file uploaded"));
        }

        let name = upload::stored_file_name(&original, OffsetDateTime::now_utc());
        tokio::fs::write(state.uploads.dir.join(&name), &data).await?;
        info!(file = %name, bytes = data.len(), "upload stored");

        let url = format!("{}/{}", state.uploads.url_prefix.trim_end_matches('/'), name);
        return Ok(AppJson(UploadResponse { url }));
    }

    Err(ApiError::BadRequest("No file uploaded"))
}

fn not_found(err: io::Error) -> ApiError {
    if err.kind() == io::ErrorKind::NotFound {
        ApiError::NotFound
    } else {
        ApiError::Io(err)
    }
}

fn chunks<R>(reader: R) -> impl Stream<Item = io::Result<Bytes>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::try_unfold(reader, |mut reader| async move {
        let mut buf = vec![0; CHUNK];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, io::Error>(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), reader)))
    })
}

/// `GET /uploads/*path`, with single byte-range support.
pub async fn serve_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = upload::resolve(&state.uploads.dir, &path).ok_or(ApiError::NotFound)?;
    let metadata = tokio::fs::metadata(&path).await.map_err(not_found)?;
    if !metadata.is_file() {
        return Err(ApiError::NotFound);
    }

    let size = metadata.len();
    let content_type = upload::content_type(&path);
    let mut file = File::open(&path).await.map_err(not_found)?;

    let Some(range) = headers.get(header::RANGE) else {
        return Ok((
            StatusCode::OK,
            [
                (header::ACCEPT_RANGES, String::from("bytes")),
                (header::CONTENT_LENGTH, size.to_string()),
                (header::CONTENT_TYPE, String::from(content_type)),
            ],
            Body::from_stream(chunks(file)),
        )
            .into_response());
    };

    let range = range
        .to_str()
        .ok()
        .and_then(|range| upload::parse_range(range, size))
        .ok_or(ApiError::RangeNotSatisfiable { size })?;
    let (start, end) = (*range.start(), *range.end());
    let length = end - start + 1;

    file.seek(SeekFrom::Start(start)).await?;

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, size)),
            (header::ACCEPT_RANGES, String::from("bytes")),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::CONTENT_TYPE, String::from(content_type)),
        ],
        Body::from_stream(chunks(file.take(length))),
    )
        .into_response())
}
