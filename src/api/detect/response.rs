// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::vision::Detection;

/// A detection as returned over HTTP (no class id, no crop)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedObject {
    /// `[x1, y1, x2, y2]` in original image pixels
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub class_name: String,
}

impl From<&Detection> for DetectedObject {
    fn from(det: &Detection) -> Self {
        Self {
            bbox: det.bbox,
            confidence: det.confidence,
            class_name: det.class_name.clone(),
        }
    }
}

/// Response from POST /detect_faces
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResponse {
    /// Original image width, for client-side scaling
    pub image_width: u32,
    /// Original image height
    pub image_height: u32,
    /// Detections in model output order
    pub detections: Vec<DetectedObject>,
}

impl DetectionResponse {
    pub fn new(image_width: u32, image_height: u32, detections: &[Detection]) -> Self {
        Self {
            image_width,
            image_height,
            detections: detections.iter().map(DetectedObject::from).collect(),
        }
    }
}
