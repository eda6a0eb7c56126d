//! HTTP handlers for media upload and delivery.
//! Bodies are streamed straight from the blob store; nothing is buffered
//! whole in memory.

use crate::{
    errors::AppError,
    models::media_file::MediaFileResponse,
    services::media_service::{Delivery, MediaService},
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use std::io;

/// GET `/v1/media/image/{id}`: whole image, no range support.
pub async fn get_image(
    State(service): State<MediaService>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let delivery = service.deliver_static(&id).await?;
    Ok(delivery_response(delivery))
}

/// GET `/v1/media/video/{id}` and `/v1/media/resource/{id}`: video or
/// audio, honouring a single-interval `Range` header.
pub async fn get_streamable(
    State(service): State<MediaService>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    // A header that is not visible ASCII cannot be a valid range.
    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    let delivery = service.deliver_streamable(&id, range).await?;
    Ok(delivery_response(delivery))
}

/// GET `/v1/media/file/{id}`: anything that is not image, audio or video.
pub async fn get_file(
    State(service): State<MediaService>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let delivery = service.deliver_file(&id).await?;
    Ok(delivery_response(delivery))
}

/// POST `/v1/media/upload-file`: raw body upload typed by `Content-Type`.
pub async fn upload_file(
    State(service): State<MediaService>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<MediaFileResponse>), AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));

    let record = service
        .upload(content_type, None, Box::pin(stream))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MediaFileResponse::from_record(record, &service.public_url)),
    ))
}

fn delivery_response(delivery: Delivery) -> Response {
    let length = delivery.content_length();
    let total = delivery.record.size();
    let range = delivery.range;
    let accept_ranges = delivery.accept_ranges;
    let content_type = delivery.record.content_type.clone();

    let mut response = Response::new(Body::from_stream(delivery.body));
    *response.status_mut() = if range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let headers = response.headers_mut();
    let content_type = HeaderValue::from_str(&content_type)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if accept_ranges {
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    if let Some(range) = range {
        if let Ok(value) = HeaderValue::from_str(&range.content_range(total)) {
            headers.insert(header::CONTENT_RANGE, value);
        }
    }

    response
}
