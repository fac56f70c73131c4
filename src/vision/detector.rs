// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detector adapter
//!
//! Wraps a loaded [`DetectionModel`] and turns its raw output into
//! [`Detection`] records: integer boxes clamped to the source image,
//! resolved class names and, on request, base64 JPEG crops.

use std::sync::Arc;

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use super::crop::encode_crop;
use super::detection::Detection;
use super::image_utils::{decode_image_bytes, ImageError};
use super::labels::LabelMap;
use super::model::{DetectionModel, InferenceParams};
use super::yolo::OnnxYoloModel;
use crate::config::{DetectorConfig, Device};

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error(transparent)]
    Decode(#[from] ImageError),

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("failed to encode crop: {0}")]
    Crop(#[from] image::ImageError),
}

/// Process-wide detector handle, shared read-only by all requests
pub struct ObjectDetector {
    model: Arc<dyn DetectionModel>,
    config: DetectorConfig,
    device: Device,
}

impl std::fmt::Debug for ObjectDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectDetector")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("classes", &self.model.labels().len())
            .finish_non_exhaustive()
    }
}

impl ObjectDetector {
    /// Wrap an already loaded model
    pub fn new(model: Arc<dyn DetectionModel>, config: DetectorConfig) -> Self {
        let device = config.device;
        Self { model, config, device }
    }

    /// Load the ONNX YOLO model named by `config`
    pub fn load(config: DetectorConfig) -> anyhow::Result<Self> {
        let model = OnnxYoloModel::load(&config)?;
        let device = model.device();
        Ok(Self {
            model: Arc::new(model),
            config,
            device,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelMap {
        self.model.labels()
    }

    /// Device inference runs on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Decode `image_bytes` and detect objects in it
    pub fn detect(
        &self,
        image_bytes: &[u8],
        conf_threshold: f32,
        include_crops: bool,
    ) -> Result<Vec<Detection>, DetectorError> {
        let (image, info) = decode_image_bytes(image_bytes)?;
        debug!("Decoded image: {}x{}, {} bytes", info.width, info.height, info.size_bytes);
        self.detect_image(&image, conf_threshold, include_crops)
    }

    /// Detect objects in an already decoded RGB raster
    ///
    /// Detections keep the model's output order.
    pub fn detect_image(
        &self,
        image: &RgbImage,
        conf_threshold: f32,
        include_crops: bool,
    ) -> Result<Vec<Detection>, DetectorError> {
        let params = InferenceParams::from_config(&self.config, conf_threshold);
        let raw = self
            .model
            .predict(image, &params)
            .map_err(DetectorError::Inference)?;

        let labels = self.model.labels();
        let (width, height) = image.dimensions();

        let mut detections = Vec::with_capacity(raw.len());
        for det in raw.into_iter().filter(|d| d.confidence >= conf_threshold) {
            let bbox = clamp_box(det.xyxy, width, height);
            let crop_base64 = if include_crops {
                encode_crop(image, bbox, self.config.crop_jpeg_quality)?
            } else {
                None
            };

            detections.push(Detection {
                bbox,
                confidence: det.confidence,
                class_id: det.class_id,
                class_name: labels.name(det.class_id).into_owned(),
                crop_base64,
            });
        }

        Ok(detections)
    }
}

/// Truncate to integers and clamp into `[0, width-1] x [0, height-1]`
pub fn clamp_box(xyxy: [f32; 4], width: u32, height: u32) -> [i32; 4] {
    let max_x = width.saturating_sub(1) as i64;
    let max_y = height.saturating_sub(1) as i64;
    let clamp = |v: f32, max: i64| (v as i64).clamp(0, max) as i32;

    [
        clamp(xyxy[0], max_x),
        clamp(xyxy[1], max_y),
        clamp(xyxy[2], max_x),
        clamp(xyxy[3], max_y),
    ]
}
