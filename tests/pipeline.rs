mod common;

use common::{FakeEngine, labels, record};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use shelfscan::config::{CLASSIFIER_CLASSES, parse_labels};
use shelfscan::vision::check_tensor_names;
use shelfscan::{
    BoundingBox, Classifier, ClassifierConfig, Detection, DetectorConfig, PipelineError,
    YoloDetector, draw_detections,
};

fn shelf_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(832, 416, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    }))
}

fn detector_output() -> Vec<f32> {
    let mut output = record(208.0, 208.0, 100.0, 50.0, 0.9, &[0.1, 0.8]);
    // 与第一条高度重叠、同类别、置信度较低
    output.extend(record(212.0, 208.0, 100.0, 50.0, 0.7, &[0.0, 0.9]));
    // 低于默认置信度阈值
    output.extend(record(50.0, 50.0, 10.0, 10.0, 0.1, &[1.0, 0.0]));
    output
}

#[test]
fn test_detect_maps_back_to_original_image() {
    let engine = FakeEngine::new(416, 416, detector_output());
    let mut detector =
        YoloDetector::new(engine, labels(&["redbull", "toffifee"]), DetectorConfig::default())
            .unwrap();

    let detections = detector.detect(&shelf_image()).unwrap();

    assert_eq!(detections.len(), 1);
    let d = &detections[0];
    assert_eq!(d.class_name, "toffifee");
    assert_eq!(d.class_id, 1);
    assert!((d.confidence - 0.72).abs() < 1e-6);
    assert_eq!(d.bbox, BoundingBox::new(316.0, 158.0, 516.0, 258.0));
}

#[test]
fn test_detect_without_candidates() {
    let engine = FakeEngine::new(416, 416, Vec::new());
    let mut detector =
        YoloDetector::new(engine, labels(&["redbull"]), DetectorConfig::default()).unwrap();

    assert!(detector.detect(&shelf_image()).unwrap().is_empty());
    detector.run_inference_only().unwrap();
    detector.close().unwrap();
}

#[test]
fn test_detect_surfaces_engine_failure() {
    let engine = FakeEngine::failing(416, 416);
    let mut detector =
        YoloDetector::new(engine, labels(&["redbull"]), DetectorConfig::default()).unwrap();

    let err = detector.detect(&shelf_image()).unwrap_err();
    assert!(matches!(err, PipelineError::InferenceFailure(_)));

    // 失败不影响后续调用
    let err = detector.detect(&shelf_image()).unwrap_err();
    assert!(matches!(err, PipelineError::InferenceFailure(_)));
}

#[test]
fn test_detect_rejects_mismatched_output() {
    let engine = FakeEngine::new(416, 416, vec![0.0; 8]);
    let mut detector =
        YoloDetector::new(engine, labels(&["a", "b"]), DetectorConfig::default()).unwrap();

    let err = detector.detect(&shelf_image()).unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch { len: 8, stride: 7 }));
}

#[test]
fn test_detector_construction_is_validated() {
    let err = YoloDetector::new(
        FakeEngine::new(640, 640, Vec::new()),
        labels(&["a"]),
        DetectorConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let err = YoloDetector::new(
        FakeEngine::new(416, 416, Vec::new()),
        Vec::new(),
        DetectorConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let config = DetectorConfig::default().with_input_size(0, 416);
    let err = YoloDetector::new(FakeEngine::new(0, 416, Vec::new()), labels(&["a"]), config)
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
}

#[test]
fn test_detector_honours_configured_thresholds() {
    let engine = FakeEngine::new(416, 416, detector_output());
    let config = DetectorConfig::default()
        .with_confidence_threshold(0.05)
        .with_iou_threshold(0.95);
    let mut detector = YoloDetector::new(engine, labels(&["redbull", "toffifee"]), config).unwrap();

    let detections = detector.detect(&shelf_image()).unwrap();
    assert_eq!(detections.len(), 3);
    let confidences: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
    assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_classifier_maps_scores_to_labels() {
    let engine = FakeEngine::new(224, 224, vec![0.2, 0.8]);
    let labels: Vec<String> = CLASSIFIER_CLASSES.iter().map(|c| c.to_string()).collect();
    let mut classifier = Classifier::new(engine, labels, ClassifierConfig::default()).unwrap();

    let classifications = classifier.classify(&shelf_image()).unwrap();
    assert_eq!(classifications.len(), 2);
    assert_eq!(classifications[0].class_name, "empty");
    assert_eq!(classifications[1].class_name, "loaded");

    let best = classifier.best(&classifications).unwrap();
    assert_eq!(best.class_name, "loaded");
    assert_eq!(best.confidence, 0.8);
    classifier.close().unwrap();
}

#[test]
fn test_classifier_without_confident_class() {
    let engine = FakeEngine::new(224, 224, vec![0.1, 0.2, 0.05]);
    let mut classifier =
        Classifier::new(engine, labels(&["empty"]), ClassifierConfig::default()).unwrap();

    let classifications = classifier.classify(&shelf_image()).unwrap();
    assert_eq!(classifications[1].class_name, "1");
    assert!(classifier.best(&classifications).is_none());
}

#[test]
fn test_config_file_fills_defaults() {
    let path = std::env::temp_dir().join(format!("shelfscan-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "iou_threshold": 0.3, "input_name": "data" }"#).unwrap();
    let config = DetectorConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.iou_threshold, 0.3);
    assert_eq!(config.input_name, "data");
    assert_eq!(config.input_width, 416);
    assert_eq!(config.output_name, "output0");
    assert_eq!(config.conf_threshold, 0.15);
}

#[test]
fn test_parse_labels_skips_comments() {
    let parsed = parse_labels("# shelf\nredbull\n\n  toffifee  \n");
    assert_eq!(parsed, vec!["redbull".to_string(), "toffifee".to_string()]);
}

#[test]
fn test_draw_detections_strokes_class_color() {
    let image = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
    let detections = vec![Detection::new(
        BoundingBox::new(10.0, 10.0, 30.0, 30.0),
        1,
        "toffifee".to_string(),
        0.8,
    )];

    let drawn = draw_detections(&image, &detections).unwrap().to_rgba8();
    assert_eq!(drawn.dimensions(), (40, 40));
    assert_eq!(drawn.get_pixel(10, 20).0, [0, 255, 255, 255]);
    assert_eq!(drawn.get_pixel(20, 20).0, [0, 0, 0, 255]);
}

#[test]
fn test_draw_detections_labels_above_box() {
    let image = DynamicImage::ImageRgb8(RgbImage::new(80, 60));
    let detections = vec![Detection::new(
        BoundingBox::new(10.0, 30.0, 40.0, 50.0),
        1,
        "toffifee".to_string(),
        0.8,
    )];

    let drawn = draw_detections(&image, &detections).unwrap().to_rgba8();

    // 标签基线在 y = 25，文字位于框上方且使用类别颜色
    let label_pixels: Vec<_> = (10..27)
        .flat_map(|y| (10..80).map(move |x| (x, y)))
        .map(|(x, y)| drawn.get_pixel(x, y).0)
        .filter(|p| p[1] > 0 || p[2] > 0)
        .collect();
    assert!(!label_pixels.is_empty());
    assert!(label_pixels.iter().all(|p| p[0] == 0 && p[1] == p[2]));

    // 标签之上保持原样
    assert!((0..8).all(|y| (0..80).all(|x| drawn.get_pixel(x, y).0 == [0, 0, 0, 255])));
    assert_eq!(drawn.get_pixel(10, 40).0, [0, 255, 255, 255]);
}

#[test]
fn test_draw_detections_keeps_translucent_pixels() {
    let image =
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 128])));
    let drawn = draw_detections(&image, &[]).unwrap().to_rgba8();

    let [r, g, b, a] = drawn.get_pixel(4, 4).0;
    assert_eq!(a, 128);
    assert!(r.abs_diff(200) <= 2 && g.abs_diff(100) <= 2 && b.abs_diff(50) <= 2);
}

#[test]
fn test_tensor_names_are_checked_against_model() {
    let inputs = ["images"];
    let outputs = ["output0", "proto"];

    assert!(check_tensor_names(&inputs, &outputs, "images", "output0").is_ok());

    match check_tensor_names(&inputs, &outputs, "input", "output0") {
        Err(PipelineError::InvalidInput(msg)) => {
            assert!(msg.contains("input"));
            assert!(msg.contains("\"images\""));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    match check_tensor_names(&inputs, &outputs, "images", "empty_loaded") {
        Err(PipelineError::InvalidInput(msg)) => {
            assert!(msg.contains("empty_loaded"));
            assert!(msg.contains("\"output0\", \"proto\""));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
