use image::DynamicImage;
use ndarray::Array4;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::DetectorConfig;
use crate::error::{PipelineError, Result};
use crate::vision::bounds::{Detection, ImageSize};
use crate::vision::image::letterbox;
use crate::vision::model::{Engine, OrtEngine};
use crate::vision::posts::{apply_nms, decode_predictions, unletterbox_detections};
use crate::vision::prevs::{fill_tensor, verify_tensor_data};

/// YOLO目标检测器
///
/// 封装了完整的检测流程：letterbox、张量编码、模型推理、解码、NMS 和坐标映射。
/// 输入张量在构造时分配，每次检测复用。
///
/// # 示例
///
/// ```no_run
/// use shelfscan::{DetectorConfig, YoloDetector, default_classes, load_image};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DetectorConfig::default().with_iou_threshold(0.45);
/// let mut detector = YoloDetector::open("models/shelf.onnx", default_classes(), config)?;
/// let image = load_image("images/shelf.jpg")?;
/// let detections = detector.detect(&image)?;
/// detector.close()?;
/// # Ok(())
/// # }
/// ```
pub struct YoloDetector<E: Engine = OrtEngine> {
    engine: E,
    classes: Vec<String>,
    config: DetectorConfig,
    input: Array4<f32>,
}

impl YoloDetector<OrtEngine> {
    /// 加载模型并创建检测器
    pub fn open(
        model_path: impl AsRef<Path>,
        classes: Vec<String>,
        config: DetectorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let shape = [1, 3, config.input_height as usize, config.input_width as usize];
        let engine = OrtEngine::open(model_path, &config.input_name, &config.output_name, shape)?;
        let detector = Self::new(engine, classes, config)?;
        info!("检测器初始化完成, 类别数量: {}", detector.classes.len());
        Ok(detector)
    }
}

impl<E: Engine> YoloDetector<E> {
    /// 使用已有的推理引擎创建检测器
    ///
    /// # 错误处理
    /// 配置无效、类别列表为空或引擎输入形状与配置不一致时返回 `InvalidInput`
    pub fn new(engine: E, classes: Vec<String>, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        if classes.is_empty() {
            return Err(PipelineError::invalid("类别列表不能为空"));
        }

        let (h, w) = (config.input_height as usize, config.input_width as usize);
        let expected = [1, 3, h, w];
        if engine.input_shape() != expected {
            return Err(PipelineError::invalid(format!(
                "引擎输入形状 {:?} 与配置 {:?} 不一致",
                engine.input_shape(),
                expected
            )));
        }

        Ok(Self {
            engine,
            classes,
            config,
            input: Array4::zeros((1, 3, h, w)),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn input_size(&self) -> ImageSize {
        ImageSize::new(self.config.input_width, self.config.input_height)
    }

    /// 完整的检测流程：从图像到原图坐标系下的检测结果
    ///
    /// # 返回值
    /// 按置信度降序排列的检测结果
    pub fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
        let target = self.input_size();
        let (canvas, params) = letterbox(img, target)?;

        let input = self
            .input
            .as_slice_mut()
            .ok_or_else(|| PipelineError::invalid("输入张量内存不连续"))?;
        fill_tensor(&canvas, target, input)?;
        verify_tensor_data(input)?;

        let start_time = Instant::now();
        let output = self.engine.run(&self.input)?;
        debug!("模型推理耗时: {:?}", start_time.elapsed());

        let candidates = decode_predictions(&output, &self.classes, self.config.conf_threshold)?;
        debug!("NMS 前共 {} 个检测结果", candidates.len());

        let mut detections = apply_nms(candidates, self.config.iou_threshold);
        debug!("NMS 后剩余 {} 个检测结果", detections.len());

        unletterbox_detections(&mut detections, &params);
        Ok(detections)
    }

    /// 只执行模型推理，复用上一次写入的输入张量
    pub fn run_inference_only(&mut self) -> Result<()> {
        self.engine.run(&self.input)?;
        Ok(())
    }

    /// 释放推理引擎
    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}
