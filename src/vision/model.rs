// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pretrained detection model interface

use anyhow::Result;
use image::RgbImage;

use super::labels::LabelMap;
use crate::config::{DetectorConfig, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS, INFERENCE_IMAGE_SIZE};

/// One detection as reported by the model
///
/// Coordinates are in the pixel space of the image passed to
/// [`DetectionModel::predict`], before any rounding or clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// `[x1, y1, x2, y2]`
    pub xyxy: [f32; 4],
    pub confidence: f32,
    pub class_id: u32,
}

/// Per-call inference settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    /// Longest side the image is resized to before inference
    pub image_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl InferenceParams {
    pub fn from_config(config: &DetectorConfig, conf_threshold: f32) -> Self {
        Self {
            image_size: config.image_size,
            conf_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            image_size: INFERENCE_IMAGE_SIZE,
            conf_threshold: crate::config::DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

/// A loaded, read-only object detection model
///
/// Implementations must be safe to call from several request handlers at
/// once; any exclusive access the runtime needs is handled internally.
pub trait DetectionModel: Send + Sync {
    /// Label mapping fixed at load time
    fn labels(&self) -> &LabelMap;

    /// Run inference on an RGB raster
    fn predict(&self, image: &RgbImage, params: &InferenceParams) -> Result<Vec<RawDetection>>;
}
