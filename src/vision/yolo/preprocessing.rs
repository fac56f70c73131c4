// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox preprocessing for YOLO models

use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Padding colour used by Ultralytics letterboxing
pub const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

/// Geometry of a letterbox transform, used to map boxes back to the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Source -> model scale factor
    pub scale: f32,
    /// Horizontal padding (left) in model pixels
    pub pad_x: f32,
    /// Vertical padding (top) in model pixels
    pub pad_y: f32,
    /// Resized (unpadded) width and height
    pub resized: (u32, u32),
    /// Square model input size
    pub size: u32,
}

impl Letterbox {
    /// Compute the transform that fits `width x height` into a `size x size` square
    pub fn new(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);

        let dw = (size - new_w) as f32 / 2.0;
        let dh = (size - new_h) as f32 / 2.0;

        Self {
            scale,
            pad_x: (dw - 0.1).round().max(0.0),
            pad_y: (dh - 0.1).round().max(0.0),
            resized: (new_w, new_h),
            size,
        }
    }

    /// Map a point from model input space back to source pixel space
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Resize keeping aspect ratio and pad to a square canvas
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let geometry = Letterbox::new(image.width(), image.height(), size);
    let (new_w, new_h) = geometry.resized;

    let mut canvas = RgbImage::from_pixel(size, size, LETTERBOX_FILL);
    if (new_w, new_h) == image.dimensions() {
        image::imageops::replace(&mut canvas, image, geometry.pad_x as i64, geometry.pad_y as i64);
    } else {
        let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);
        image::imageops::replace(&mut canvas, &resized, geometry.pad_x as i64, geometry.pad_y as i64);
    }

    (canvas, geometry)
}

/// Convert an RGB image to a normalized NCHW tensor in `[0, 1]`
pub fn to_input_tensor(image: &RgbImage) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let mut input = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }
    input
}

/// Letterbox and tensorize in one step
pub fn preprocess(image: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let (canvas, geometry) = letterbox(image, size);
    (to_input_tensor(&canvas), geometry)
}
