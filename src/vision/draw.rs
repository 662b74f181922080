//! 调试可视化
//!
//! 在原图上绘制检测框和 `类别 置信度` 标签，每个已知类别使用固定颜色，
//! 未知类别为白色。

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use raqote::{DrawOptions, DrawTarget, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};
use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::vision::bounds::Detection;

const STROKE_WIDTH: f32 = 2.0;

// 标签文本
const LABEL_FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");
const LABEL_FONT_SIZE: f32 = 13.0;
// 标签基线位于框上边缘之上的距离
const LABEL_OFFSET: f32 = 5.0;

/// 类别对应的框颜色
pub fn class_color(class_name: &str) -> SolidSource {
    let (r, g, b) = match class_name {
        "cigarettes" => (0xFF, 0x00, 0x00),
        "fresh_food_counter" => (0x00, 0xFF, 0x00),
        "generic_coffee" => (0x00, 0x00, 0xFF),
        "jack_daniels" => (0xFF, 0xFF, 0x00),
        "redbull" => (0xFF, 0x00, 0xFF),
        "toffifee" => (0x00, 0xFF, 0xFF),
        _ => (0xFF, 0xFF, 0xFF),
    };
    SolidSource { r, g, b, a: 0xFF }
}

/// 在图像上绘制检测结果
///
/// # 参数
/// * `image` - 原始图像
/// * `detections` - 原图坐标系下的检测结果
///
/// # 返回值
/// 返回绘制了检测框的图像
pub fn draw_detections(image: &DynamicImage, detections: &[Detection]) -> Result<DynamicImage> {
    let (img_width, img_height) = image.dimensions();
    let mut dt = DrawTarget::new(img_width as i32, img_height as i32);

    // raqote 使用预乘的 BGRA 像素
    let rgba_image = image.to_rgba8();
    let image_data: Vec<u32> = rgba_image
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            let mul = |c: u8| (c as u32 * a as u32 / 255) as u8;
            u32::from_le_bytes([mul(b), mul(g), mul(r), a])
        })
        .collect();

    let img = raqote::Image {
        width: img_width as i32,
        height: img_height as i32,
        data: &image_data,
    };
    dt.draw_image_at(0.0, 0.0, &img, &DrawOptions::new());

    for detection in detections {
        let bbox = &detection.bbox;

        let mut pb = PathBuilder::new();
        pb.rect(bbox.x1, bbox.y1, bbox.width(), bbox.height());
        let path = pb.finish();

        dt.stroke(
            &path,
            &Source::Solid(class_color(&detection.class_name)),
            &StrokeStyle {
                join: LineJoin::Round,
                width: STROKE_WIDTH,
                ..StrokeStyle::default()
            },
            &DrawOptions::default(),
        );
    }

    let pixels: Vec<u8> = dt
        .get_data()
        .iter()
        .flat_map(|&pixel| {
            let [b, g, r, a] = pixel.to_le_bytes();
            let unmul = |c: u8| match a {
                0 => 0,
                a => (c as u32 * 255 / a as u32).min(255) as u8,
            };
            [unmul(r), unmul(g), unmul(b), a]
        })
        .collect();

    let mut canvas: RgbaImage = ImageBuffer::from_raw(img_width, img_height, pixels)
        .ok_or_else(|| PipelineError::invalid("绘制结果的像素数量与图像尺寸不符"))?;
    draw_labels(&mut canvas, detections)?;

    Ok(DynamicImage::ImageRgba8(canvas))
}

fn label_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT_DATA)
        .map_err(|e| PipelineError::ResourceError(format!("无法加载标签字体: {e}")))
}

/// 在每个框上方绘制 `类别 置信度` 标签，基线距框上边缘 5 像素
fn draw_labels(canvas: &mut RgbaImage, detections: &[Detection]) -> Result<()> {
    if detections.is_empty() {
        return Ok(());
    }

    let font = label_font()?;
    let scale = PxScale::from(LABEL_FONT_SIZE);
    let ascent = font.as_scaled(scale).ascent();

    for detection in detections {
        let label = format!("{} {:.2}", detection.class_name, detection.confidence);
        let SolidSource { r, g, b, a } = class_color(&detection.class_name);

        // draw_text_mut 的 y 是文本顶部
        let x = detection.bbox.x1.round() as i32;
        let y = (detection.bbox.y1 - LABEL_OFFSET - ascent).round() as i32;
        draw_text_mut(canvas, Rgba([r, g, b, a]), x, y, scale, &font, &label);
    }

    Ok(())
}

/// 绘制检测结果并保存调试图像
pub fn save_debug_image(
    image: &DynamicImage,
    detections: &[Detection],
    output_path: impl AsRef<Path>,
) -> Result<()> {
    let output_path = output_path.as_ref();
    let result = draw_detections(image, detections)?;
    // JPEG 不支持透明通道
    result.to_rgb8().save(output_path)?;
    info!("调试图像已保存到: {}", output_path.display());
    Ok(())
}
