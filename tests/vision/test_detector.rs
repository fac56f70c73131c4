// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detector adapter tests
//!
//! Drive `ObjectDetector::detect` with encoded frames and a mocked model,
//! checking box clamping, label resolution and crop encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use fabstir_detect_node::{
    config::DetectorConfig,
    vision::{DetectorError, LabelMap},
};
use image::ImageFormat;

use crate::common::{detector, encode, face_model, png_bytes, raw, test_image, MockModel};

fn decode_crop(b64: &str) -> image::DynamicImage {
    let bytes = STANDARD.decode(b64).expect("crop is standard base64");
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        ImageFormat::Jpeg,
        "crop must be JPEG"
    );
    image::load_from_memory(&bytes).expect("crop decodes")
}

#[cfg(test)]
mod detector_tests {
    use super::*;

    // =============================================================================
    // Boxes
    // =============================================================================

    /// Test 1: Every returned box lies inside the frame
    #[test]
    fn test_boxes_always_inside_frame() {
        let (width, height) = (64u32, 48u32);
        let edges = [-1000.0f32, -1.0, -0.5, 0.0, 0.5, 31.7, 47.0, 48.0, 63.0, 63.9, 64.0, 5000.0];
        let mut raws = Vec::new();
        for &a in &edges {
            for &b in &edges {
                raws.push(raw([a, b, b, a], 0.9, 0));
            }
        }
        let count = raws.len();
        let detector = detector(face_model(raws), DetectorConfig::default());

        let detections = detector
            .detect(&png_bytes(width, height), 0.25, false)
            .unwrap();

        assert_eq!(detections.len(), count);
        for det in &detections {
            let [x1, y1, x2, y2] = det.bbox;
            for x in [x1, x2] {
                assert!((0..width as i32).contains(&x), "x {} out of range", x);
            }
            for y in [y1, y2] {
                assert!((0..height as i32).contains(&y), "y {} out of range", y);
            }
        }
    }

    /// Test 2: Fractional coordinates truncate toward zero
    #[test]
    fn test_fractional_boxes_truncate() {
        let detector = detector(
            face_model(vec![raw([10.9, 20.5, 30.99, 40.01], 0.8, 0)]),
            DetectorConfig::default(),
        );

        let detections = detector.detect(&png_bytes(100, 100), 0.25, false).unwrap();

        assert_eq!(detections[0].bbox, [10, 20, 30, 40]);
    }

    /// Test 3: Output keeps the model's order
    #[test]
    fn test_order_preserved() {
        let detector = detector(
            face_model(vec![
                raw([1.0, 1.0, 2.0, 2.0], 0.4, 0),
                raw([3.0, 3.0, 4.0, 4.0], 0.9, 0),
                raw([5.0, 5.0, 6.0, 6.0], 0.6, 0),
            ]),
            DetectorConfig::default(),
        );

        let detections = detector.detect(&png_bytes(10, 10), 0.25, false).unwrap();
        let confidences: Vec<f32> = detections.iter().map(|d| d.confidence).collect();

        assert_eq!(confidences, vec![0.4, 0.9, 0.6]);
    }

    // =============================================================================
    // Threshold and labels
    // =============================================================================

    /// Test 4: Nothing below the requested threshold survives
    #[test]
    fn test_threshold_respected() {
        let detector = detector(
            face_model(vec![
                raw([1.0, 1.0, 5.0, 5.0], 0.1, 0),
                raw([1.0, 1.0, 5.0, 5.0], 0.49, 0),
                raw([1.0, 1.0, 5.0, 5.0], 0.5, 0),
                raw([1.0, 1.0, 5.0, 5.0], 0.99, 0),
            ]),
            DetectorConfig::default(),
        );

        let detections = detector.detect(&png_bytes(10, 10), 0.5, false).unwrap();

        assert_eq!(detections.len(), 2);
        assert!(detections.iter().all(|d| d.confidence >= 0.5));
    }

    /// Test 5: Threshold is forwarded to the model
    #[test]
    fn test_threshold_forwarded_to_model() {
        let mut model = MockModel::new();
        model.expect_labels().return_const(LabelMap::default());
        model
            .expect_predict()
            .withf(|_, params| (params.conf_threshold - 0.6).abs() < f32::EPSILON)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let detector = detector(model, DetectorConfig::default());

        assert!(detector.detect(&png_bytes(10, 10), 0.6, false).unwrap().is_empty());
    }

    /// Test 6: Every class id gets a name
    #[test]
    fn test_class_names_resolved() {
        let names = ["person", "bicycle", "car", "face"];
        let mut model = MockModel::new();
        model
            .expect_labels()
            .return_const(LabelMap::from_names(names));
        model.expect_predict().returning(|_, _| {
            Ok((0..5).map(|id| raw([0.0, 0.0, 4.0, 4.0], 0.9, id)).collect())
        });
        let detector = detector(model, DetectorConfig::default());

        let detections = detector.detect(&png_bytes(10, 10), 0.25, false).unwrap();
        let resolved: Vec<&str> = detections.iter().map(|d| d.class_name.as_str()).collect();

        assert_eq!(resolved, vec!["person", "bicycle", "car", "face", "4"]);
        assert_eq!(detections[3].class_id, 3);
    }

    // =============================================================================
    // Crops
    // =============================================================================

    /// Test 7: Crops are JPEGs sized like their boxes
    #[test]
    fn test_crops_match_boxes() {
        let detector = detector(
            face_model(vec![raw([10.0, 20.0, 50.0, 45.0], 0.9, 0)]),
            DetectorConfig::default(),
        );

        let detections = detector.detect(&png_bytes(80, 60), 0.25, true).unwrap();
        let crop = decode_crop(detections[0].crop_base64.as_deref().unwrap());

        assert_eq!((crop.width(), crop.height()), (40, 25));
    }

    /// Test 8: Zero-area boxes have no crop
    #[test]
    fn test_zero_area_crop_is_none() {
        let detector = detector(
            face_model(vec![
                raw([10.0, 10.0, 10.0, 30.0], 0.9, 0),
                raw([10.0, 10.0, 30.0, 10.0], 0.9, 0),
                raw([5.0, 5.0, 15.0, 15.0], 0.9, 0),
            ]),
            DetectorConfig::default(),
        );

        let detections = detector.detect(&png_bytes(40, 40), 0.25, true).unwrap();

        assert!(detections[0].crop_base64.is_none());
        assert!(detections[1].crop_base64.is_none());
        assert!(detections[2].crop_base64.is_some());
    }

    /// Test 9: Crops are skipped unless requested
    #[test]
    fn test_crops_off_by_default() {
        let detector = detector(
            face_model(vec![raw([5.0, 5.0, 15.0, 15.0], 0.9, 0)]),
            DetectorConfig::default(),
        );

        let detections = detector.detect(&png_bytes(40, 40), 0.25, false).unwrap();

        assert!(detections[0].crop_base64.is_none());
    }

    /// Test 10: JPEG input works the same as PNG
    #[test]
    fn test_jpeg_frame() {
        let jpeg = encode(&test_image(120, 90), ImageFormat::Jpeg);
        let detector = detector(
            face_model(vec![raw([0.0, 0.0, 200.0, 200.0], 0.9, 0)]),
            DetectorConfig::default(),
        );

        let detections = detector.detect(&jpeg, 0.25, true).unwrap();

        assert_eq!(detections[0].bbox, [0, 0, 119, 89]);
        let crop = decode_crop(detections[0].crop_base64.as_deref().unwrap());
        assert_eq!((crop.width(), crop.height()), (119, 89));
    }

    // =============================================================================
    // Errors
    // =============================================================================

    /// Test 11: Undecodable bytes never reach the model
    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let mut model = MockModel::new();
        model.expect_predict().never();
        let detector = detector(model, DetectorConfig::default());

        let err = detector.detect(b"GIF89a-not-really", 0.25, false).unwrap_err();

        assert!(matches!(err, DetectorError::Decode(_)));
    }

    /// Test 12: Model failures are reported as inference errors
    #[test]
    fn test_model_error_propagates() {
        let mut model = MockModel::new();
        model
            .expect_predict()
            .returning(|_, _| Err(anyhow::anyhow!("output tensor missing")));
        let detector = detector(model, DetectorConfig::default());

        let err = detector.detect(&png_bytes(10, 10), 0.25, false).unwrap_err();

        assert!(matches!(err, DetectorError::Inference(_)));
        assert!(err.to_string().contains("output tensor missing"));
    }
}
