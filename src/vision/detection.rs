// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// One detected object, in the original image's pixel space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x1, y1, x2, y2]`, clamped to `[0, width-1] x [0, height-1]`
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
    /// Base64 JPEG of the box region; only set when crops are requested
    /// and the region is non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_base64: Option<String>,
}

impl Detection {
    pub fn width(&self) -> i32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> i32 {
        self.bbox[3] - self.bbox[1]
    }
}
