// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection on ONNX Runtime
//!
//! Components:
//! - `preprocessing` - Letterbox resize and tensor conversion
//! - `postprocessing` - Output decoding and NMS
//! - `model` - Session loading and the `DetectionModel` implementation

pub mod model;
pub mod postprocessing;
pub mod preprocessing;

pub use model::OnnxYoloModel;
pub use postprocessing::{decode_output, iou, nms, OutputLayout};
pub use preprocessing::{letterbox, preprocess, Letterbox};
