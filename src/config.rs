//! 配置模块
//!
//! 默认超参数、检测器/分类器配置结构以及标签文件读取。

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};

// 目标检测超参数配置
pub const DEFAULT_INPUT_WIDTH: u32 = 416;
pub const DEFAULT_INPUT_HEIGHT: u32 = 416;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.15;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_INPUT_NAME: &str = "images";
pub const DEFAULT_OUTPUT_NAME: &str = "output0";

// 分类模型超参数配置
pub const CLASSIFIER_INPUT_WIDTH: u32 = 224;
pub const CLASSIFIER_INPUT_HEIGHT: u32 = 224;
pub const CLASSIFIER_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const CLASSIFIER_INPUT_NAME: &str = "input";
pub const CLASSIFIER_OUTPUT_NAME: &str = "empty_loaded";

/// 货架商品检测模型的默认类别，顺序与模型输出中的类别分数一致
pub const DEFAULT_CLASSES: [&str; 6] = [
    "cigarettes",
    "fresh_food_counter",
    "generic_coffee",
    "jack_daniels",
    "redbull",
    "toffifee",
];

/// 分类模型的默认类别
pub const CLASSIFIER_CLASSES: [&str; 2] = ["empty", "loaded"];

/// 检测器配置
///
/// 构造检测器时提供，之后不再修改。缺失的字段使用默认值。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 模型输入宽度
    pub input_width: u32,
    /// 模型输入高度
    pub input_height: u32,
    /// 置信度阈值，组合置信度必须严格大于此值才会保留
    pub conf_threshold: f32,
    /// 同类别检测框之间允许的最大 IoU
    pub iou_threshold: f32,
    /// 模型输入张量名称
    pub input_name: String,
    /// 模型输出张量名称
    pub output_name: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            conf_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            input_name: DEFAULT_INPUT_NAME.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

impl DetectorConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_width = width;
        self.input_height = height;
        self
    }

    /// 检查输入尺寸与张量名称
    pub fn validate(&self) -> Result<()> {
        validate_common(
            self.input_width,
            self.input_height,
            &self.input_name,
            &self.output_name,
        )?;
        if !self.iou_threshold.is_finite() {
            return Err(PipelineError::invalid(format!(
                "IoU 阈值无效: {}",
                self.iou_threshold
            )));
        }
        Ok(())
    }
}

/// 分类器配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub input_width: u32,
    pub input_height: u32,
    pub conf_threshold: f32,
    pub input_name: String,
    pub output_name: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_width: CLASSIFIER_INPUT_WIDTH,
            input_height: CLASSIFIER_INPUT_HEIGHT,
            conf_threshold: CLASSIFIER_CONFIDENCE_THRESHOLD,
            input_name: CLASSIFIER_INPUT_NAME.to_string(),
            output_name: CLASSIFIER_OUTPUT_NAME.to_string(),
        }
    }
}

impl ClassifierConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_common(
            self.input_width,
            self.input_height,
            &self.input_name,
            &self.output_name,
        )
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    debug!("读取配置文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn validate_common(width: u32, height: u32, input_name: &str, output_name: &str) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(PipelineError::invalid(format!(
            "模型输入尺寸必须为正数, 实际为 {}x{}",
            width, height
        )));
    }
    if input_name.is_empty() || output_name.is_empty() {
        return Err(PipelineError::invalid("输入/输出张量名称不能为空"));
    }
    Ok(())
}

/// 读取标签文件
///
/// 每行一个标签，空行和以 `#` 开头的行会被跳过。
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let labels = parse_labels(&text);
    if labels.is_empty() {
        return Err(PipelineError::invalid(format!(
            "标签文件为空: {}",
            path.display()
        )));
    }
    debug!("从 {} 读取到 {} 个标签", path.display(), labels.len());
    Ok(labels)
}

pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// 默认检测类别列表
pub fn default_classes() -> Vec<String> {
    DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect()
}
