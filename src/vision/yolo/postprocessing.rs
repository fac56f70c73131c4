// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding and non-maximum suppression

use anyhow::Result;
use ndarray::ArrayViewD;

use super::preprocessing::Letterbox;
use crate::vision::model::{InferenceParams, RawDetection};

/// Memory layout of the model's first output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `[1, 4 + nc, N]`: YOLOv8 / YOLO11 / YOLOv12 exports
    ChannelsFirst,
    /// `[1, N, 4 + nc]`
    ChannelsLast,
    /// `[1, N, 6]`: `x1, y1, x2, y2, score, class` with NMS already applied
    EndToEnd,
}

impl OutputLayout {
    pub fn detect(shape: &[usize]) -> Result<Self> {
        if shape.len() != 3 || shape[0] != 1 {
            anyhow::bail!("Unexpected YOLO output shape: {:?}, expected [1, C, N]", shape);
        }
        let (rows, cols) = (shape[1], shape[2]);
        if cols == 6 && rows > cols {
            Ok(OutputLayout::EndToEnd)
        } else if rows <= cols {
            if rows < 5 {
                anyhow::bail!("YOLO output has no class scores: {:?}", shape);
            }
            Ok(OutputLayout::ChannelsFirst)
        } else {
            if cols < 5 {
                anyhow::bail!("YOLO output has no class scores: {:?}", shape);
            }
            Ok(OutputLayout::ChannelsLast)
        }
    }
}

/// Decode the raw output tensor into detections in model input space
///
/// Box-and-score layouts are filtered by confidence and passed through
/// class-aware NMS; end-to-end layouts are only filtered.
pub fn decode_output(output: ArrayViewD<'_, f32>, params: &InferenceParams) -> Result<Vec<RawDetection>> {
    let shape = output.shape().to_vec();
    let layout = OutputLayout::detect(&shape)?;

    let detections = match layout {
        OutputLayout::EndToEnd => {
            let mut detections = Vec::new();
            for i in 0..shape[1] {
                let confidence = output[[0, i, 4]];
                if confidence <= params.conf_threshold {
                    continue;
                }
                detections.push(RawDetection {
                    xyxy: [output[[0, i, 0]], output[[0, i, 1]], output[[0, i, 2]], output[[0, i, 3]]],
                    confidence,
                    class_id: output[[0, i, 5]].max(0.0) as u32,
                });
                if detections.len() >= params.max_detections {
                    break;
                }
            }
            detections
        }
        OutputLayout::ChannelsFirst | OutputLayout::ChannelsLast => {
            let (channels, candidates) = if layout == OutputLayout::ChannelsFirst {
                (shape[1], shape[2])
            } else {
                (shape[2], shape[1])
            };
            let value = |candidate: usize, channel: usize| -> f32 {
                if layout == OutputLayout::ChannelsFirst {
                    output[[0, channel, candidate]]
                } else {
                    output[[0, candidate, channel]]
                }
            };

            let mut candidates_kept = Vec::new();
            for i in 0..candidates {
                let mut best_class = 0usize;
                let mut best_score = f32::MIN;
                for class_idx in 0..channels - 4 {
                    let score = value(i, 4 + class_idx);
                    if score > best_score {
                        best_score = score;
                        best_class = class_idx;
                    }
                }
                if best_score <= params.conf_threshold {
                    continue;
                }

                let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
                candidates_kept.push(RawDetection {
                    xyxy: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
                    confidence: best_score,
                    class_id: best_class as u32,
                });
            }
            nms(candidates_kept, params.iou_threshold, params.max_detections)
        }
    };

    Ok(detections)
}

/// Class-aware greedy NMS; output is ordered by descending confidence
pub fn nms(mut detections: Vec<RawDetection>, iou_threshold: f32, max_detections: usize) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::new();
    for candidate in detections {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && iou(&kept.xyxy, &candidate.xyxy) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection over union of two `xyxy` boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Undo the letterbox and clip boxes to the source image bounds
pub fn scale_to_source(detections: &mut [RawDetection], letterbox: &Letterbox, width: u32, height: u32) {
    let (max_x, max_y) = (width as f32, height as f32);
    for det in detections.iter_mut() {
        let (x1, y1) = letterbox.to_source(det.xyxy[0], det.xyxy[1]);
        let (x2, y2) = letterbox.to_source(det.xyxy[2], det.xyxy[3]);
        det.xyxy = [
            x1.clamp(0.0, max_x),
            y1.clamp(0.0, max_y),
            x2.clamp(0.0, max_x),
            y2.clamp(0.0, max_y),
        ];
    }
}
