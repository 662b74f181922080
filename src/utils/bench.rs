//! 计时工具
//!
//! 统计多次运行的平均加载/处理耗时，以及仅推理的平均耗时。

use image::DynamicImage;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::vision::bounds::{Classification, Detection};
use crate::vision::classify::Classifier;
use crate::vision::detect::YoloDetector;
use crate::vision::image::load_image;
use crate::vision::model::Engine;

/// 可计时的处理流水线
pub trait Pipeline {
    type Output;

    /// 完整处理一张图像
    fn process(&mut self, img: &DynamicImage) -> Result<Self::Output>;

    /// 只执行推理，复用上一次的输入
    fn run_inference_only(&mut self) -> Result<()>;
}

impl<E: Engine> Pipeline for YoloDetector<E> {
    type Output = Vec<Detection>;

    fn process(&mut self, img: &DynamicImage) -> Result<Self::Output> {
        self.detect(img)
    }

    fn run_inference_only(&mut self) -> Result<()> {
        YoloDetector::run_inference_only(self)
    }
}

impl<E: Engine> Pipeline for Classifier<E> {
    type Output = Vec<Classification>;

    fn process(&mut self, img: &DynamicImage) -> Result<Self::Output> {
        self.classify(img)
    }

    fn run_inference_only(&mut self) -> Result<()> {
        Classifier::run_inference_only(self)
    }
}

/// 仅推理的计时结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkResult {
    pub inference_time: Duration,
    pub num_runs: u32,
}

/// 加载加处理的计时结果，附带最后一次运行的输出
#[derive(Debug, Clone)]
pub struct TimingReport<T> {
    pub avg_load_time: Duration,
    pub avg_process_time: Duration,
    pub num_runs: u32,
    pub last_output: T,
}

fn check_runs(runs: u32) -> Result<()> {
    if runs == 0 {
        return Err(PipelineError::invalid("运行次数必须大于 0"));
    }
    Ok(())
}

/// 多次加载图像并处理，统计平均耗时
pub fn measure_processing_time<P: Pipeline>(
    pipeline: &mut P,
    image_path: impl AsRef<Path>,
    runs: u32,
) -> Result<TimingReport<P::Output>> {
    check_runs(runs)?;
    let image_path = image_path.as_ref();

    let mut total_load = Duration::ZERO;
    let mut total_process = Duration::ZERO;
    let mut last_output = None;

    for i in 0..runs {
        let load_start = Instant::now();
        let img = load_image(image_path)?;
        let load_time = load_start.elapsed();

        let process_start = Instant::now();
        let output = pipeline.process(&img)?;
        let process_time = process_start.elapsed();

        debug!("第 {} 次 - 加载: {:?}, 处理: {:?}", i + 1, load_time, process_time);
        total_load += load_time;
        total_process += process_time;
        last_output = Some(output);
    }

    let report = TimingReport {
        avg_load_time: total_load / runs,
        avg_process_time: total_process / runs,
        num_runs: runs,
        last_output: last_output.ok_or_else(|| PipelineError::invalid("没有任何运行结果"))?,
    };
    info!(
        "平均加载耗时: {:?}, 平均处理耗时: {:?}",
        report.avg_load_time, report.avg_process_time
    );
    Ok(report)
}

/// 先完整处理一次以写入输入张量，再多次只执行推理
pub fn measure_inference_time<P: Pipeline>(
    pipeline: &mut P,
    img: &DynamicImage,
    runs: u32,
) -> Result<BenchmarkResult> {
    check_runs(runs)?;
    pipeline.process(img)?;

    let mut total = Duration::ZERO;
    for _ in 0..runs {
        let start = Instant::now();
        pipeline.run_inference_only()?;
        total += start.elapsed();
    }

    let result = BenchmarkResult {
        inference_time: total / runs,
        num_runs: runs,
    };
    info!("{} 次推理平均耗时: {:?}", runs, result.inference_time);
    Ok(result)
}
