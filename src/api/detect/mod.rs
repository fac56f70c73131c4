// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoint module
//!
//! Provides POST /detect_faces for running the detector on an uploaded frame.

pub mod handler;
pub mod response;

pub use handler::{detect_faces_handler, FRAME_FIELD};
pub use response::{DetectedObject, DetectionResponse};
