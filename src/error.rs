use thiserror::Error;

/// 检测流水线的错误类型
///
/// 每类错误都在最接近出错原因的边界上产生，直接返回给调用方，不做重试。
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 图像尺寸、目标尺寸或配置不合法
    #[error("输入无效: {0}")]
    InvalidInput(String),
    /// 模型输出长度不能被单条预测的步长整除
    #[error("输出形状不匹配: 长度 {len} 不能被步长 {stride} 整除")]
    ShapeMismatch { len: usize, stride: usize },
    /// 编码后的张量存在超出 [0, 1] 的值
    #[error("张量数据无效: 索引 {index} 处的值 {value} 不在 [0, 1] 内")]
    InvalidTensorData { index: usize, value: f32 },
    /// 推理引擎返回的错误，内容不做解释
    #[error("推理失败: {0}")]
    InferenceFailure(String),
    /// 推理会话的创建或释放失败
    #[error("资源错误: {0}")]
    ResourceError(String),
    #[error("图像错误: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("配置解析错误: {0}")]
    Config(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PipelineError::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
