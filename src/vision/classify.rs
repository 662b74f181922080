use image::DynamicImage;
use ndarray::Array4;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ClassifierConfig;
use crate::error::{PipelineError, Result};
use crate::vision::bounds::{Classification, ImageSize};
use crate::vision::image::letterbox;
use crate::vision::model::{Engine, OrtEngine};
use crate::vision::prevs::{fill_tensor, verify_tensor_data};

/// 图像分类器
///
/// 与检测器共用 letterbox 和张量编码，模型输出为每个类别一个分数。
pub struct Classifier<E: Engine = OrtEngine> {
    engine: E,
    labels: Vec<String>,
    config: ClassifierConfig,
    input: Array4<f32>,
}

impl Classifier<OrtEngine> {
    pub fn open(
        model_path: impl AsRef<Path>,
        labels: Vec<String>,
        config: ClassifierConfig,
    ) -> Result<Self> {
        config.validate()?;
        let shape = [1, 3, config.input_height as usize, config.input_width as usize];
        let engine = OrtEngine::open(model_path, &config.input_name, &config.output_name, shape)?;
        let classifier = Self::new(engine, labels, config)?;
        info!("分类器初始化完成, 类别: {:?}", classifier.labels);
        Ok(classifier)
    }
}

impl<E: Engine> Classifier<E> {
    pub fn new(engine: E, labels: Vec<String>, config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
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
            labels,
            config,
            input: Array4::zeros((1, 3, h, w)),
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// 返回模型输出的原始分数
    pub fn scores(&mut self, img: &DynamicImage) -> Result<Vec<f32>> {
        let target = ImageSize::new(self.config.input_width, self.config.input_height);
        let (canvas, _) = letterbox(img, target)?;

        let input = self
            .input
            .as_slice_mut()
            .ok_or_else(|| PipelineError::invalid("输入张量内存不连续"))?;
        fill_tensor(&canvas, target, input)?;
        verify_tensor_data(input)?;

        let scores = self.engine.run(&self.input)?;
        debug!("分类分数: {:?}", scores);
        Ok(scores)
    }

    /// 对图像分类
    ///
    /// 每个分数按输出顺序对应一个标签；没有标签的位置以索引命名。
    pub fn classify(&mut self, img: &DynamicImage) -> Result<Vec<Classification>> {
        let scores = self.scores(img)?;
        Ok(scores
            .into_iter()
            .enumerate()
            .map(|(i, confidence)| Classification {
                class_name: self.labels.get(i).cloned().unwrap_or_else(|| i.to_string()),
                confidence,
            })
            .collect())
    }

    /// 分数最高且超过置信度阈值的类别
    pub fn best(&self, classifications: &[Classification]) -> Option<Classification> {
        classifications
            .iter()
            .filter(|c| c.confidence > self.config.conf_threshold)
            .fold(None, |best: Option<&Classification>, c| match best {
                Some(b) if b.confidence >= c.confidence => Some(b),
                _ => Some(c),
            })
            .cloned()
    }

    pub fn run_inference_only(&mut self) -> Result<()> {
        self.engine.run(&self.input)?;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}
