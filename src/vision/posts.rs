//! 后处理模块
//!
//! 解码模型输出、置信度过滤、按类别的非极大值抑制(NMS)，以及把结果映射回原图坐标。

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::vision::bounds::{BoundingBox, Detection, LetterboxParams};
use crate::vision::image::unletterbox;

/// 每条预测记录中类别分数之前的字段数: cx, cy, w, h, objectness
pub const RECORD_HEADER_LEN: usize = 5;

/// 解码模型输出
///
/// 输出按记录排列，每条记录为
/// `[cx, cy, w, h, objectness, class_0, ..., class_{n-1}]`。
///
/// # 参数
/// * `output` - 模型输出的平面缓冲区
/// * `classes` - 类别名称，索引对应记录内的类别分数偏移
/// * `confidence_threshold` - 置信度阈值，严格大于才保留
///
/// # 返回值
/// 画布坐标系下的检测结果，保持记录原始顺序
///
/// # 错误处理
/// 输出长度不能被步长整除时返回 `ShapeMismatch`
pub fn decode_predictions(
    output: &[f32],
    classes: &[String],
    confidence_threshold: f32,
) -> Result<Vec<Detection>> {
    if classes.is_empty() {
        return Err(PipelineError::invalid("类别列表不能为空"));
    }

    let stride = RECORD_HEADER_LEN + classes.len();
    if output.len() % stride != 0 {
        return Err(PipelineError::ShapeMismatch {
            len: output.len(),
            stride,
        });
    }

    let mut detections = Vec::new();
    for record in output.chunks_exact(stride) {
        let (cx, cy, w, h) = (record[0], record[1], record[2], record[3]);
        let objectness = record[4];

        // 最大类别分数，相同分数取索引最小者
        let scores = &record[RECORD_HEADER_LEN..];
        let (best_idx, best_score) = scores
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, scores[0]), |(bi, bs), (i, &s)| {
                if s > bs { (i, s) } else { (bi, bs) }
            });

        let confidence = objectness * best_score;
        if confidence > confidence_threshold {
            detections.push(Detection {
                bbox: BoundingBox::from_center(cx, cy, w, h),
                class_id: best_idx,
                class_name: classes[best_idx].clone(),
                confidence,
            });
        }
    }

    debug!(
        "{} 条预测中有 {} 个超过置信度阈值 {:.2}",
        output.len() / stride,
        detections.len(),
        confidence_threshold
    );
    Ok(detections)
}

/// 应用非极大值抑制
///
/// 按置信度降序（稳定排序）贪心选择；对每个被选中的框，抑制其后同类别且
/// IoU 严格大于阈值的框。
///
/// # 返回值
/// 保留的检测结果，按置信度降序
pub fn apply_nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut result = Vec::new();
    let mut picked_indices = vec![false; detections.len()];

    for i in 0..detections.len() {
        if picked_indices[i] {
            continue;
        }
        picked_indices[i] = true;

        for j in (i + 1)..detections.len() {
            if picked_indices[j] {
                continue;
            }
            if detections[i].class_name == detections[j].class_name
                && detections[i].bbox.iou(&detections[j].bbox) > iou_threshold
            {
                picked_indices[j] = true;
            }
        }

        result.push(detections[i].clone());
    }

    result
}

/// 将检测框从画布坐标映射回原始图像坐标
///
/// 只修改边界框，两个角点分别做逆变换。
pub fn unletterbox_detections(detections: &mut [Detection], params: &LetterboxParams) {
    for detection in detections.iter_mut() {
        let bbox = &mut detection.bbox;
        let (x1, y1) = unletterbox(bbox.x1 as f64, bbox.y1 as f64, params);
        let (x2, y2) = unletterbox(bbox.x2 as f64, bbox.y2 as f64, params);
        *bbox = BoundingBox::new(x1 as f32, y1 as f32, x2 as f32, y2 as f32);
    }
}
