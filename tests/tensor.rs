use image::{DynamicImage, Rgb, RgbImage, Rgba};
use ndarray::s;
use shelfscan::vision::image::{BACKGROUND, Canvas};
use shelfscan::vision::prevs::{
    fill_tensor, image_to_tensor, normalize_channel, preprocess_batch, preprocess_image,
    verify_tensor_data,
};
use shelfscan::{ImageSize, PipelineError};

#[test]
fn test_black_canvas_encodes_to_zeros() {
    let size = ImageSize::new(32, 16);
    let canvas = Canvas::from_pixel(32, 16, BACKGROUND);
    let tensor = image_to_tensor(&canvas, size).unwrap();

    assert_eq!(tensor.shape(), &[1, 3, 16, 32]);
    let data = tensor.as_slice().unwrap();
    assert_eq!(data.len(), 3 * 16 * 32);
    assert!(data.iter().all(|&v| v == 0.0));
    assert!(verify_tensor_data(data).is_ok());
}

#[test]
fn test_planar_layout() {
    let size = ImageSize::new(3, 2);
    let mut canvas = Canvas::from_pixel(3, 2, BACKGROUND);
    canvas.put_pixel(1, 0, Rgba([u16::MAX, 0, 128 * 257, u16::MAX]));
    canvas.put_pixel(2, 1, Rgba([0, 255 * 257, 0, u16::MAX]));

    let mut out = vec![0.0; 18];
    fill_tensor(&canvas, size, &mut out).unwrap();

    let plane = 6;
    assert_eq!(out[1], 1.0);
    assert_eq!(out[plane + 1], 0.0);
    assert_eq!(out[2 * plane + 1], 128.0 / 255.0);

    let idx = 1 * 3 + 2;
    assert_eq!(out[idx], 0.0);
    assert_eq!(out[plane + idx], 1.0);
    assert_eq!(out[2 * plane + idx], 0.0);
}

#[test]
fn test_normalize_discards_low_byte() {
    assert_eq!(normalize_channel(0), 0.0);
    assert_eq!(normalize_channel(0x00FF), 0.0);
    assert_eq!(normalize_channel(0xFFFF), 1.0);
    assert_eq!(normalize_channel(0x80FF), 128.0 / 255.0);
}

#[test]
fn test_verify_rejects_out_of_range() {
    assert!(verify_tensor_data(&[0.0, 0.5, 1.0]).is_ok());
    assert!(verify_tensor_data(&[]).is_ok());

    match verify_tensor_data(&[0.0, 1.5, -1.0]) {
        Err(PipelineError::InvalidTensorData { index, value }) => {
            assert_eq!(index, 1);
            assert_eq!(value, 1.5);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(
        verify_tensor_data(&[0.2, -0.1]),
        Err(PipelineError::InvalidTensorData { index: 1, .. })
    ));
    assert!(matches!(
        verify_tensor_data(&[f32::NAN]),
        Err(PipelineError::InvalidTensorData { index: 0, .. })
    ));
}

#[test]
fn test_canvas_size_must_match_target() {
    let canvas = Canvas::from_pixel(10, 10, BACKGROUND);
    let err = image_to_tensor(&canvas, ImageSize::new(12, 10)).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let mut short = vec![0.0; 10];
    let err = fill_tensor(&canvas, ImageSize::new(10, 10), &mut short).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
}

#[test]
fn test_batch_is_image_major() {
    let size = ImageSize::new(8, 8);
    let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([255, 255, 255])));
    let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 8, Rgb([255, 0, 0])));

    let (batch, params) = preprocess_batch(&[white.clone(), red.clone()], size).unwrap();
    assert_eq!(batch.shape(), &[2, 3, 8, 8]);
    assert_eq!(params.len(), 2);

    let (single, white_params) = preprocess_image(&white, size).unwrap();
    assert_eq!(params[&0], white_params);
    assert_eq!(batch.slice(s![0..1, .., .., ..]), single);

    let (single, red_params) = preprocess_image(&red, size).unwrap();
    assert_eq!(params[&1], red_params);
    assert_eq!(red_params.left, 2);
    assert_eq!(batch.slice(s![1..2, .., .., ..]), single);

    // 平面拼接: 第二张图的 R 平面紧跟第一张图的 B 平面
    let flat = batch.as_slice().unwrap();
    assert_eq!(flat[3 * 64 + 2], 1.0);
    assert_eq!(flat[3 * 64 + 64 + 2], 0.0);
    assert_eq!(flat[3 * 64], 0.0);
}

#[test]
fn test_empty_batch_is_rejected() {
    let err = preprocess_batch(&[], ImageSize::new(8, 8)).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
}

#[test]
fn test_alpha_is_premultiplied() {
    let img = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(4, 4, |x, _| {
        if x < 2 {
            Rgba([255, 255, 255, 0])
        } else {
            Rgba([255, 255, 255, 128])
        }
    }));
    let (tensor, _) = preprocess_image(&img, ImageSize::new(4, 4)).unwrap();

    for c in 0..3 {
        assert_eq!(tensor[[0, c, 1, 0]], 0.0);
        assert_eq!(tensor[[0, c, 1, 3]], 128.0 / 255.0);
    }
}
