//! 基础数据类型
//!
//! 图像尺寸、letterbox 参数、边界框与检测结果。

/// 模型输入分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 单张图像每个通道平面的元素个数
    pub fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// letterbox 变换参数
///
/// `scale` 同时作用于两个轴，`left`/`top` 是缩放后添加的填充偏移。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxParams {
    pub scale: f64,
    pub left: u32,
    pub top: u32,
}

/// 边界框结构
///
/// 解码阶段允许出现 `x1 > x2` 或 `y1 > y2` 的退化框。
#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct BoundingBox {
    /// 左上角x坐标
    pub x1: f32,
    /// 左上角y坐标
    pub y1: f32,
    /// 右下角x坐标
    pub x2: f32,
    /// 右下角y坐标
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 由中心点和宽高构造边界框，不做裁剪
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// 有符号面积，退化框可能为负
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 计算两个边界框的交并比
    ///
    /// 没有重叠时返回 0；并集面积不为正（两个零面积框）时同样返回 0。
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        if ix1 > ix2 || iy1 > iy2 {
            return 0.0;
        }

        let intersection = (ix2 - ix1) * (iy2 - iy1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// 检测结果结构
///
/// 由解码器创建；坐标映射只修改 `bbox`，类别和置信度创建后不变。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// 目标的边界框
    pub bbox: BoundingBox,
    /// 类别在类别列表中的索引
    pub class_id: usize,
    /// 类别名称
    pub class_name: String,
    /// 置信度，objectness 与最大类别分数的乘积
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_id: usize, class_name: String, confidence: f32) -> Self {
        Self { bbox, class_id, class_name, confidence }
    }
}

/// 分类结果
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub class_name: String,
    pub confidence: f32,
}
