// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for object detection
//!
//! This module provides:
//! - Image decoding for uploaded frames
//! - YOLO inference via ONNX Runtime (CPU or CUDA)
//! - The detector adapter that clamps, labels and optionally crops results

pub mod crop;
pub mod detection;
pub mod detector;
pub mod image_utils;
pub mod labels;
pub mod model;
pub mod yolo;

pub use crop::{crop_region, encode_crop};
pub use detection::Detection;
pub use detector::{clamp_box, DetectorError, ObjectDetector};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use labels::LabelMap;
pub use model::{DetectionModel, InferenceParams, RawDetection};
pub use yolo::OnnxYoloModel;
