// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration tests
//!
//! These tests verify that:
//! - /detect_faces accepts POST only
//! - /health reports the loaded detector
//! - Unknown paths are 404
//! - Cross-origin requests are allowed from any origin

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use fabstir_detect_node::{
    api::HealthResponse,
    config::DetectorConfig,
    vision::LabelMap,
};
use tower::util::ServiceExt; // for `oneshot`

use crate::common::{
    app, face_model, multipart_body, multipart_content_type, noise_png, png_bytes, MockModel,
};

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[cfg(test)]
mod route_registration_tests {
    use super::*;

    /// Test 1: GET on the detection route is not allowed
    #[tokio::test]
    async fn test_detect_route_rejects_get() {
        let app = app(MockModel::new(), DetectorConfig::default());

        let response = app.oneshot(request(Method::GET, "/detect_faces")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    /// Test 2: Unknown routes are not found
    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = app(MockModel::new(), DetectorConfig::default());

        let response = app.oneshot(request(Method::POST, "/detect")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    /// Test 3: Health check describes the detector
    #[tokio::test]
    async fn test_health_reports_detector() {
        let mut model = MockModel::new();
        model
            .expect_labels()
            .return_const(LabelMap::from_names(["face", "person", "car"]));
        let config = DetectorConfig {
            conf_threshold: 0.4,
            ..DetectorConfig::default()
        };
        let app = app(model, config);

        let response = app.oneshot(request(Method::GET, "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.classes, 3);
        assert_eq!(health.device, "auto");
        assert!((health.conf_threshold - 0.4).abs() < f32::EPSILON);
    }

    /// Test 4: CORS allows any origin
    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = app(face_model(vec![]), DetectorConfig::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/detect_faces")
            .header(header::ORIGIN, "http://camera.local")
            .header(header::CONTENT_TYPE, multipart_content_type())
            .body(Body::from(multipart_body("frame", "frame.png", &png_bytes(8, 8))))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    /// Test 5: Preflight request succeeds
    #[tokio::test]
    async fn test_cors_preflight() {
        let app = app(MockModel::new(), DetectorConfig::default());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/detect_faces")
            .header(header::ORIGIN, "http://camera.local")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }

    /// Test 6: Frames larger than axum's default 2MB limit are accepted
    #[tokio::test]
    async fn test_large_frame_accepted() {
        let app = app(face_model(vec![]), DetectorConfig::default());
        let frame = noise_png(1100, 1100);
        assert!(frame.len() > 2 * 1024 * 1024, "fixture must exceed the default limit");
        let request = Request::builder()
            .method(Method::POST)
            .uri("/detect_faces")
            .header(header::CONTENT_TYPE, multipart_content_type())
            .body(Body::from(multipart_body("frame", "big.png", &frame)))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
