// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crop extraction for detections

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};

/// Cut the `[x1, y1, x2, y2)` region out of `image`
///
/// The end coordinates are exclusive, so a box with `x1 == x2` or
/// `y1 == y2` has no pixels and yields `None`.
pub fn crop_region(image: &RgbImage, bbox: [i32; 4]) -> Option<RgbImage> {
    let clip = |v: i32, max: u32| (v.max(0) as u32).min(max);
    let x1 = clip(bbox[0], image.width());
    let y1 = clip(bbox[1], image.height());
    let x2 = clip(bbox[2], image.width());
    let y2 = clip(bbox[3], image.height());

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(image::imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// JPEG-encode the crop and return it as standard base64
///
/// Returns `Ok(None)` for an empty region.
pub fn encode_crop(image: &RgbImage, bbox: [i32; 4], quality: u8) -> Result<Option<String>, image::ImageError> {
    let Some(crop) = crop_region(image, bbox) else {
        return Ok(None);
    };

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder.encode(crop.as_raw(), crop.width(), crop.height(), ExtendedColorType::Rgb8)?;

    Ok(Some(STANDARD.encode(jpeg)))
}
