// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection endpoint handler

use std::time::Instant;

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, info, warn};

use super::response::DetectionResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::decode_image_bytes;

/// Multipart field carrying the image
pub const FRAME_FIELD: &str = "frame";

/// POST /detect_faces - Detect objects in an uploaded frame
///
/// # Request
/// `multipart/form-data` with the encoded image under the `frame` field.
///
/// # Response
/// - `image_width`, `image_height`: Original image dimensions
/// - `detections`: `{box: [x1, y1, x2, y2], confidence, class_name}` per object
///
/// # Errors
/// - 400 Bad Request: no `frame` field, unreadable body, or undecodable image
/// - 500 Internal Server Error: inference failed
pub async fn detect_faces_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let Ok(mut multipart) = multipart else {
        warn!("Detection request is not a multipart upload");
        return Err(ApiError::MissingFrame);
    };

    // 1. Find the frame field
    let mut frame = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    {
        if field.name() == Some(FRAME_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
            frame = Some(bytes);
            break;
        }
    }

    let Some(bytes) = frame else {
        warn!("Detection request without '{}' field", FRAME_FIELD);
        return Err(ApiError::MissingFrame);
    };
    debug!("Frame received: {} bytes", bytes.len());

    // 2. Decode once and run the detector off the async runtime
    let detector = state.detector.clone();
    let conf_threshold = detector.config().conf_threshold;
    let started = Instant::now();

    let (info, detections) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let (image, info) = decode_image_bytes(&bytes).map_err(|e| {
            warn!("Failed to decode image: {}", e);
            ApiError::InvalidImage(e.to_string())
        })?;
        debug!("Decoded image: {}x{} ({:?})", info.width, info.height, info.format);

        let detections = detector
            .detect_image(&image, conf_threshold, false)
            .map_err(|e| {
                warn!("Detection failed: {}", e);
                ApiError::from(e)
            })?;
        Ok((info, detections))
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("detection task failed: {}", e)))??;

    info!(
        "Detection complete: {} objects in {}x{} image, {}ms",
        detections.len(),
        info.width,
        info.height,
        started.elapsed().as_millis()
    );

    // 3. Build response
    Ok(Json(DetectionResponse::new(info.width, info.height, &detections)))
}
