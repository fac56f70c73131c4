// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime backed YOLO model
//!
//! Loads an Ultralytics-style YOLO export and implements [`DetectionModel`]:
//! letterbox to the inference size, run the session, decode + NMS, and map
//! boxes back to the caller's pixel space.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::postprocessing::{decode_output, scale_to_source};
use super::preprocessing::preprocess;
use crate::config::{DetectorConfig, Device};
use crate::vision::labels::LabelMap;
use crate::vision::model::{DetectionModel, InferenceParams, RawDetection};

/// Metadata key Ultralytics uses for the class names
const NAMES_METADATA_KEY: &str = "names";

/// YOLO detection model running on ONNX Runtime
///
/// # Thread Safety
/// `Session::run` needs exclusive access, so the session sits behind a mutex;
/// concurrent requests are serialized at the `run` call only.
#[derive(Clone)]
pub struct OnnxYoloModel {
    /// ONNX Runtime session (wrapped in Arc<Mutex> for thread-safe shared access)
    session: Arc<Mutex<Session>>,
    /// Label mapping fixed at load time
    labels: Arc<LabelMap>,
    /// Model input name
    input_name: String,
    /// Device the session actually runs on
    device: Device,
}

impl std::fmt::Debug for OnnxYoloModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxYoloModel")
            .field("input_name", &self.input_name)
            .field("device", &self.device)
            .field("classes", &self.labels.len())
            .finish_non_exhaustive()
    }
}

impl OnnxYoloModel {
    /// Load the model described by `config`
    ///
    /// # Errors
    /// Returns error if:
    /// - Weights file not found
    /// - ONNX Runtime initialization fails, or an explicit CUDA device is unavailable
    /// - The label file is given but cannot be read
    pub fn load(config: &DetectorConfig) -> Result<Self> {
        let model_path = config.weights_path.as_path();
        if !model_path.exists() {
            anyhow::bail!("YOLO weights not found: {}", model_path.display());
        }

        info!("Loading YOLO model from {} (device: {})", model_path.display(), config.device);
        let (session, device) = build_session(model_path, config.device)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let labels = match config.labels_path {
            Some(ref path) => {
                let labels = LabelMap::from_file(path)?;
                info!("Loaded {} class labels from {}", labels.len(), path.display());
                labels
            }
            None => labels_from_metadata(&session),
        };

        info!(
            "✅ YOLO model loaded successfully ({} classes, device: {})",
            labels.len(),
            device
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            labels: Arc::new(labels),
            input_name,
            device,
        })
    }

    /// Device the session was created on
    pub fn device(&self) -> Device {
        self.device
    }
}

impl DetectionModel for OnnxYoloModel {
    fn labels(&self) -> &LabelMap {
        &self.labels
    }

    fn predict(&self, image: &RgbImage, params: &InferenceParams) -> Result<Vec<RawDetection>> {
        let (input, letterbox) = preprocess(image, params.image_size);
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut detections = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("ONNX session lock poisoned"))?;

            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("YOLO inference failed")?;

            let output = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?;
            debug!("YOLO output shape: {:?}", output.shape());

            decode_output(output, params)?
        };

        scale_to_source(&mut detections, &letterbox, image.width(), image.height());
        Ok(detections)
    }
}

fn build_session(model_path: &Path, device: Device) -> Result<(Session, Device)> {
    match device {
        Device::Cpu => Ok((cpu_session(model_path)?, Device::Cpu)),
        Device::Cuda(id) => Ok((cuda_session(model_path, id)?, Device::Cuda(id))),
        Device::Auto => {
            info!("   Attempting CUDA execution provider...");
            match cuda_session(model_path, 0) {
                Ok(session) => {
                    info!("✅ CUDA execution provider initialized successfully!");
                    Ok((session, Device::Cuda(0)))
                }
                Err(e) => {
                    warn!("⚠️  CUDA execution provider failed: {}", e);
                    warn!("   Falling back to CPU execution provider");
                    Ok((cpu_session(model_path)?, Device::Cpu))
                }
            }
        }
    }
}

fn cuda_session(model_path: &Path, device_id: i32) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default()
            .with_device_id(device_id)
            .build()
            .error_on_failure()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!("Failed to load YOLO model from {}", model_path.display()))
}

fn cpu_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!("Failed to load YOLO model from {}", model_path.display()))
}

fn labels_from_metadata(session: &Session) -> LabelMap {
    let raw = session
        .metadata()
        .ok()
        .and_then(|metadata| metadata.custom(NAMES_METADATA_KEY).ok().flatten());

    match raw {
        Some(raw) => match LabelMap::from_ultralytics_metadata(&raw) {
            Ok(labels) => labels,
            Err(e) => {
                warn!("⚠️ Could not parse class names from model metadata: {}", e);
                LabelMap::default()
            }
        },
        None => {
            warn!("⚠️ Model has no '{}' metadata, class names will be numeric", NAMES_METADATA_KEY);
            LabelMap::default()
        }
    }
}
