// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration
//!
//! Every setting is a CLI flag with an environment variable fallback
//! (a `.env` file is loaded first by `main`). The parsed arguments are split
//! into an immutable [`DetectorConfig`] and [`ServerConfig`] at startup.

pub mod device;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

pub use device::{Device, ParseDeviceError};

/// Inference resolution (longest side, letterboxed to a square)
pub const INFERENCE_IMAGE_SIZE: u32 = 640;

/// Default confidence threshold
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;

/// Default NMS IoU threshold (Ultralytics default)
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Default maximum number of detections per image
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

/// Default JPEG quality for crop encoding
pub const DEFAULT_CROP_JPEG_QUALITY: u8 = 80;

/// Fabstir Detect Node
#[derive(Parser, Debug, Clone)]
#[command(name = "fabstir-detect-node")]
#[command(version)]
#[command(about = "Object detection over HTTP backed by a YOLO ONNX model", long_about = None)]
pub struct NodeArgs {
    /// Path to the YOLO ONNX weights
    #[arg(long, env = "YOLO_WEIGHTS", default_value = "yolov12.onnx")]
    pub weights: PathBuf,

    /// Minimum confidence for a detection to be reported (0.0-1.0)
    #[arg(long, env = "CONF_THRES", default_value_t = DEFAULT_CONF_THRESHOLD, value_parser = parse_unit_interval)]
    pub conf_thres: f32,

    /// IoU threshold for non-maximum suppression (0.0-1.0)
    #[arg(long, env = "IOU_THRES", default_value_t = DEFAULT_IOU_THRESHOLD, value_parser = parse_unit_interval)]
    pub iou_thres: f32,

    /// Maximum detections kept per image
    #[arg(long, env = "MAX_DET", default_value_t = DEFAULT_MAX_DETECTIONS)]
    pub max_det: usize,

    /// Compute device (auto, cpu, cuda, cuda:N)
    #[arg(long, env = "DEVICE", default_value = "auto")]
    pub device: Device,

    /// Optional label file overriding the names embedded in the model
    #[arg(long, env = "LABELS_PATH")]
    pub labels: Option<PathBuf>,

    /// JPEG quality used when crops are requested (1-100)
    #[arg(long, env = "CROP_JPEG_QUALITY", default_value_t = DEFAULT_CROP_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub crop_quality: u8,

    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5001)]
    pub port: u16,
}

impl NodeArgs {
    /// Split the parsed arguments into detector and server settings
    pub fn into_configs(self) -> (DetectorConfig, ServerConfig) {
        let detector = DetectorConfig {
            weights_path: self.weights,
            labels_path: self.labels,
            conf_threshold: self.conf_thres,
            iou_threshold: self.iou_thres,
            max_detections: self.max_det,
            image_size: INFERENCE_IMAGE_SIZE,
            device: self.device,
            crop_jpeg_quality: self.crop_quality,
        };
        let server = ServerConfig {
            host: self.host,
            port: self.port,
        };
        (detector, server)
    }
}

fn parse_unit_interval(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} is outside 0.0-1.0", value));
    }
    Ok(value)
}

/// Immutable per-process detector settings
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub weights_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub image_size: u32,
    pub device: Device,
    pub crop_jpeg_quality: u8,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            weights_path: PathBuf::from("yolov12.onnx"),
            labels_path: None,
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            image_size: INFERENCE_IMAGE_SIZE,
            device: Device::Auto,
            crop_jpeg_quality: DEFAULT_CROP_JPEG_QUALITY,
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid listen address {}:{}: {}", self.host, self.port, e))?;
        Ok(addr)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}
