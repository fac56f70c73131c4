// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_detect_node::{
    api::{start_server, AppState},
    config::NodeArgs,
    version,
    vision::ObjectDetector,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads environment fallbacks
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = NodeArgs::parse();
    let (detector_config, server_config) = args.into_configs();

    tracing::info!("📦 {}", version::get_version_string());
    tracing::info!(
        "🔧 weights: {}, conf: {}, iou: {}, max_det: {}, imgsz: {}, device: {}",
        detector_config.weights_path.display(),
        detector_config.conf_threshold,
        detector_config.iou_threshold,
        detector_config.max_detections,
        detector_config.image_size,
        detector_config.device
    );

    // Model load is blocking file + runtime work
    let detector = tokio::task::spawn_blocking(move || ObjectDetector::load(detector_config)).await??;
    tracing::info!(
        "✅ Detector ready: {} classes on {}",
        detector.labels().len(),
        detector.device()
    );

    let state = AppState::new(Arc::new(detector));
    start_server(&server_config, state).await
}
