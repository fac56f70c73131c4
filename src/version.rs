// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Fabstir Detect Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-object-detection-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolo-onnx",
    "multipart-upload",
    "letterbox-preprocessing",
    "class-aware-nms",
    "end-to-end-exports",
    "crop-extraction",
    "cuda-fallback",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Detect Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
