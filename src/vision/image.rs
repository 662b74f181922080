//! 图像加载与 letterbox 变换
//!
//! letterbox 在不改变宽高比的前提下把任意尺寸的图像放进固定大小的画布，
//! 并保存逆变换所需的参数。

use image::{DynamicImage, ImageBuffer, Rgba};
use std::path::Path;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::vision::bounds::{ImageSize, LetterboxParams};

/// letterbox 之后的画布，每通道 16 位
pub type Canvas = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// 画布背景：不透明黑色
pub const BACKGROUND: Rgba<u16> = Rgba([0, 0, 0, u16::MAX]);

/// 将颜色通道预乘 alpha
///
/// 画布存储预乘后的样本，完全透明的像素编码为 0。
pub fn premultiply(pixel: Rgba<u16>) -> Rgba<u16> {
    let [r, g, b, a] = pixel.0;
    let mul = |c: u16| (c as u32 * a as u32 / u16::MAX as u32) as u16;
    Rgba([mul(r), mul(g), mul(b), a])
}

/// 加载图像文件
///
/// # 参数
/// * `path` - 图像文件路径
///
/// # 错误处理
/// 文件不存在时返回 `Io`，解码失败时返回 `Image`
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("图像文件不存在: {}", path.display()),
        )));
    }

    let img = image::open(path)?;
    debug!("加载图像 {}: {}x{}", path.display(), img.width(), img.height());
    Ok(img)
}

/// 计算 letterbox 参数与缩放后的尺寸
///
/// 返回 `(params, new_width, new_height)`。
pub fn letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target: ImageSize,
) -> Result<(LetterboxParams, u32, u32)> {
    if orig_width == 0 || orig_height == 0 {
        return Err(PipelineError::invalid(format!(
            "图像尺寸必须为正数, 实际为 {}x{}",
            orig_width, orig_height
        )));
    }
    if target.width == 0 || target.height == 0 {
        return Err(PipelineError::invalid(format!(
            "目标尺寸必须为正数, 实际为 {}x{}",
            target.width, target.height
        )));
    }

    let scale_w = target.width as f64 / orig_width as f64;
    let scale_h = target.height as f64 / orig_height as f64;
    let scale = scale_w.min(scale_h);

    let new_width = (orig_width as f64 * scale).floor() as u32;
    let new_height = (orig_height as f64 * scale).floor() as u32;

    // 奇数余量时多出的一个像素留给右侧/底部
    let top = (target.height - new_height) / 2;
    let left = (target.width - new_width) / 2;

    Ok((LetterboxParams { scale, left, top }, new_width, new_height))
}

/// letterbox 变换
///
/// 按统一比例缩放图像（最近邻采样），再居中放到黑色背景的目标画布上。
/// 带透明通道的像素先预乘 alpha。
///
/// # 参数
/// * `img` - 原始图像
/// * `target` - 模型输入尺寸
///
/// # 返回值
/// 返回尺寸恰好为 `target` 的画布以及对应的变换参数
pub fn letterbox(img: &DynamicImage, target: ImageSize) -> Result<(Canvas, LetterboxParams)> {
    let (orig_width, orig_height) = (img.width(), img.height());
    let (params, new_width, new_height) = letterbox_params(orig_width, orig_height, target)?;

    let source = img.to_rgba16();
    let mut canvas = Canvas::from_pixel(target.width, target.height, BACKGROUND);

    for y in 0..new_height {
        let src_y = ((y as f64 / params.scale) as u32).min(orig_height - 1);
        for x in 0..new_width {
            let src_x = ((x as f64 / params.scale) as u32).min(orig_width - 1);
            let pixel = premultiply(*source.get_pixel(src_x, src_y));
            canvas.put_pixel(x + params.left, y + params.top, pixel);
        }
    }

    debug!(
        "letterbox {}x{} -> {}x{} (缩放 {:.4}, 左 {}, 上 {})",
        orig_width, orig_height, target.width, target.height, params.scale, params.left, params.top
    );

    Ok((canvas, params))
}

/// 将画布坐标映射回原始图像坐标
///
/// 先去掉填充，再除以缩放比例；`scale` 不为正时跳过除法。
pub fn unletterbox(x: f64, y: f64, params: &LetterboxParams) -> (f64, f64) {
    let mut unpad_x = x - params.left as f64;
    let mut unpad_y = y - params.top as f64;

    if params.scale > 0.0 {
        unpad_x /= params.scale;
        unpad_y /= params.scale;
    }

    (unpad_x, unpad_y)
}
