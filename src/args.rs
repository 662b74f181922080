use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 货架商品检测与分类演示程序
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 运行目标检测
    Detect(DetectArgs),
    /// 运行图像分类
    Classify(ClassifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct DetectArgs {
    /// ONNX 模型文件路径
    #[arg(long, value_name = "FILE")]
    pub model: PathBuf,

    /// 输入图像路径
    #[arg(long, value_name = "IMAGE")]
    pub image: PathBuf,

    /// JSON 配置文件，未给出时使用默认配置
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 标签文件，每行一个类别
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,

    /// 置信度阈值，覆盖配置文件
    #[arg(long, value_name = "THRESHOLD")]
    pub confidence: Option<f32>,

    /// NMS IoU 阈值，覆盖配置文件
    #[arg(long, value_name = "THRESHOLD")]
    pub iou_threshold: Option<f32>,

    /// 统计加载与检测耗时的运行次数（0 表示跳过）
    #[arg(long, default_value = "10", value_name = "COUNT")]
    pub runs: u32,

    /// 仅推理基准测试的运行次数（0 表示跳过）
    #[arg(long, default_value = "100", value_name = "COUNT")]
    pub bench_runs: u32,

    /// 调试图像输出路径
    #[arg(long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ClassifyArgs {
    /// ONNX 模型文件路径
    #[arg(long, value_name = "FILE")]
    pub model: PathBuf,

    /// 输入图像路径
    #[arg(long, value_name = "IMAGE")]
    pub image: PathBuf,

    /// JSON 配置文件
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 标签文件
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,

    #[arg(long, default_value = "10", value_name = "COUNT")]
    pub runs: u32,

    #[arg(long, default_value = "100", value_name = "COUNT")]
    pub bench_runs: u32,
}
