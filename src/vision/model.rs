//! 推理引擎边界
//!
//! 流水线只依赖 [`Engine`]：给定固定形状的输入张量，返回平面输出缓冲区。
//! [`OrtEngine`] 基于 ONNX Runtime 会话实现它。

use std::path::Path;

use ndarray::Array4;
use ort::{
    inputs,
    session::{Session, builder::GraphOptimizationLevel},
    value::Tensor,
};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

const RUNTIME_NAME: &str = "shelfscan";
const INTRA_THREADS: usize = 4;

/// 推理引擎
///
/// 输入形状在构造时确定，`run` 期间不可变更。共享同一引擎的调用方需要自行串行化访问。
pub trait Engine {
    /// 输入张量形状 `[N, C, H, W]`
    fn input_shape(&self) -> [usize; 4];

    /// 执行一次前向推理
    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>>;

    /// 释放引擎持有的资源
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// 初始化 ONNX Runtime 全局环境
///
/// 进程内调用一次，应早于任何会话的创建。
pub fn init_runtime() -> Result<()> {
    ort::init()
        .with_name(RUNTIME_NAME)
        .commit()
        .map_err(|e| PipelineError::ResourceError(format!("初始化 ONNX Runtime 失败: {e}")))?;
    info!("ONNX Runtime 环境已初始化");
    Ok(())
}

/// 加载ONNX模型
///
/// 应用三级图优化，使用固定的线程数。
///
/// # 错误处理
/// 模型文件不存在或会话创建失败时返回 `ResourceError`
pub fn load_model(model_path: impl AsRef<Path>) -> Result<Session> {
    let model_path = model_path.as_ref();
    if !model_path.exists() {
        return Err(PipelineError::ResourceError(format!(
            "模型文件不存在: {}",
            model_path.display()
        )));
    }

    info!("加载模型文件: {}", model_path.display());
    let session = Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(INTRA_THREADS))
        .and_then(|b| b.commit_from_file(model_path))
        .map_err(|e| PipelineError::ResourceError(format!("创建推理会话失败: {e}")))?;
    Ok(session)
}

/// 校验配置的张量名称确实由模型提供
///
/// # 错误处理
/// 名称不存在时返回 `InvalidInput`，错误信息列出模型实际的名称
pub fn check_tensor_names(
    inputs: &[&str],
    outputs: &[&str],
    input_name: &str,
    output_name: &str,
) -> Result<()> {
    if !inputs.contains(&input_name) {
        return Err(PipelineError::invalid(format!(
            "模型没有名为 {input_name} 的输入, 可用输入: {inputs:?}"
        )));
    }
    if !outputs.contains(&output_name) {
        return Err(PipelineError::invalid(format!(
            "模型没有名为 {output_name} 的输出, 可用输出: {outputs:?}"
        )));
    }
    Ok(())
}

/// 基于 ONNX Runtime 的推理引擎
///
/// 持有会话以及经过校验的输入/输出张量名称。会话通过 [`Engine::close`]
/// 显式释放；未显式关闭时在 `Drop` 中释放。
pub struct OrtEngine {
    session: Option<Session>,
    input_name: String,
    output_name: String,
    input_shape: [usize; 4],
}

impl OrtEngine {
    /// 打开模型并校验张量名称
    ///
    /// # 参数
    /// * `model_path` - 模型文件路径
    /// * `input_name` - 模型输入张量名称
    /// * `output_name` - 模型输出张量名称
    /// * `input_shape` - 输入张量形状 `[N, C, H, W]`
    pub fn open(
        model_path: impl AsRef<Path>,
        input_name: &str,
        output_name: &str,
        input_shape: [usize; 4],
    ) -> Result<Self> {
        let session = load_model(model_path)?;

        let input_names: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        debug!("模型输入: {:?}, 模型输出: {:?}", input_names, output_names);
        check_tensor_names(&input_names, &output_names, input_name, output_name)?;

        info!("输入形状: {:?}", input_shape);
        Ok(Self {
            session: Some(session),
            input_name: input_name.to_string(),
            output_name: output_name.to_string(),
            input_shape,
        })
    }
}

impl Engine for OrtEngine {
    fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PipelineError::ResourceError("推理会话已关闭".to_string()))?;

        let shape = input.shape();
        if shape != self.input_shape {
            return Err(PipelineError::invalid(format!(
                "输入张量形状 {:?} 与模型要求 {:?} 不一致",
                shape, self.input_shape
            )));
        }

        let data = input
            .as_slice()
            .ok_or_else(|| PipelineError::invalid("输入张量内存不连续"))?
            .to_vec();
        let tensor = Tensor::from_array((self.input_shape, data))
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;

        let outputs = session
            .run(inputs![self.input_name.as_str() => tensor])
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PipelineError::InferenceFailure(format!("推理结果中没有输出 {}", self.output_name))
        })?;
        let (out_shape, out_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;
        debug!("模型输出形状: {:?}", out_shape);

        Ok(out_data.to_vec())
    }

    fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => {
                drop(session);
                info!("推理会话已释放");
                Ok(())
            }
            None => Err(PipelineError::ResourceError("推理会话已被释放".to_string())),
        }
    }
}

impl Drop for OrtEngine {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            warn!("推理会话未显式关闭, 已在析构时释放");
        }
    }
}
