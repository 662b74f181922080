//! 张量编码模块
//!
//! 把 letterbox 后的画布编码成模型输入：通道优先（平面）排列，
//! 每个像素值归一化到 [0, 1]。

use std::collections::HashMap;

use image::DynamicImage;
use ndarray::{Array4, s};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::vision::bounds::{ImageSize, LetterboxParams};
use crate::vision::image::{Canvas, letterbox};

/// 16 位通道值先去掉低 8 位，再除以 255
pub fn normalize_channel(sample: u16) -> f32 {
    (sample >> 8) as f32 / 255.0
}

/// 将画布写入一段平面排列的缓冲区
///
/// 缓冲区长度必须为 `3 * height * width`，R 平面在前，G、B 依次在后，
/// 每个平面内按行优先 `y * width + x` 排列。
pub fn fill_tensor(canvas: &Canvas, target: ImageSize, out: &mut [f32]) -> Result<()> {
    if canvas.width() != target.width || canvas.height() != target.height {
        return Err(PipelineError::invalid(format!(
            "画布尺寸 {}x{} 与目标尺寸 {}x{} 不一致",
            canvas.width(),
            canvas.height(),
            target.width,
            target.height
        )));
    }
    let plane = target.plane_len();
    if out.len() != 3 * plane {
        return Err(PipelineError::invalid(format!(
            "张量缓冲区长度应为 {}, 实际为 {}",
            3 * plane,
            out.len()
        )));
    }

    let width = target.width as usize;
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let idx = y as usize * width + x as usize;
        let [r, g, b, _] = pixel.0;
        out[idx] = normalize_channel(r);
        out[plane + idx] = normalize_channel(g);
        out[2 * plane + idx] = normalize_channel(b);
    }

    Ok(())
}

/// 将画布转换为模型输入张量
///
/// # 返回值
/// 返回形状为(1, 3, height, width)的四维张量，内存布局即平面缓冲区
pub fn image_to_tensor(canvas: &Canvas, target: ImageSize) -> Result<Array4<f32>> {
    let mut tensor = Array4::zeros((1, 3, target.height as usize, target.width as usize));
    let data = tensor
        .as_slice_mut()
        .ok_or_else(|| PipelineError::invalid("张量内存不连续"))?;
    fill_tensor(canvas, target, data)?;
    Ok(tensor)
}

/// 检查缓冲区的每个元素都在 [0, 1] 内
///
/// 送入推理前调用，NaN 同样视为无效。
pub fn verify_tensor_data(data: &[f32]) -> Result<()> {
    match data
        .iter()
        .enumerate()
        .find(|(_, v)| !(0.0..=1.0).contains(*v))
    {
        Some((index, &value)) => Err(PipelineError::InvalidTensorData { index, value }),
        None => Ok(()),
    }
}

/// letterbox 加编码
pub fn preprocess_image(
    img: &DynamicImage,
    target: ImageSize,
) -> Result<(Array4<f32>, LetterboxParams)> {
    let (canvas, params) = letterbox(img, target)?;
    let tensor = image_to_tensor(&canvas, target)?;
    Ok((tensor, params))
}

/// 批量预处理
///
/// 按图像顺序拼接为 (N, 3, height, width) 的张量，并返回每个批次索引对应的
/// letterbox 参数，供之后逐张映射坐标。
pub fn preprocess_batch(
    imgs: &[DynamicImage],
    target: ImageSize,
) -> Result<(Array4<f32>, HashMap<usize, LetterboxParams>)> {
    if imgs.is_empty() {
        return Err(PipelineError::invalid("批量预处理至少需要一张图像"));
    }

    let (h, w) = (target.height as usize, target.width as usize);
    let mut tensor = Array4::zeros((imgs.len(), 3, h, w));
    let mut params = HashMap::with_capacity(imgs.len());

    for (i, img) in imgs.iter().enumerate() {
        let (canvas, img_params) = letterbox(img, target)?;
        let mut slot = tensor.slice_mut(s![i, .., .., ..]);
        let data = slot
            .as_slice_mut()
            .ok_or_else(|| PipelineError::invalid("张量内存不连续"))?;
        fill_tensor(&canvas, target, data)?;
        params.insert(i, img_params);
    }

    debug!("批量预处理完成: {} 张图像", imgs.len());
    Ok((tensor, params))
}
