mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use args::{Args, ClassifyArgs, Command, DetectArgs};
use shelfscan::config::{CLASSIFIER_CLASSES, load_labels};
use shelfscan::utils::bench::{measure_inference_time, measure_processing_time};
use shelfscan::{
    Classifier, ClassifierConfig, DetectorConfig, YoloDetector, default_classes, init_runtime,
    load_image, save_debug_image,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    init_runtime()?;

    match args.command {
        Command::Detect(args) => run_detector(args),
        Command::Classify(args) => run_classifier(args),
    }
}

fn run_detector(args: DetectArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_file(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(confidence) = args.confidence {
        config = config.with_confidence_threshold(confidence);
    }
    if let Some(iou) = args.iou_threshold {
        config = config.with_iou_threshold(iou);
    }
    let classes = match &args.labels {
        Some(path) => load_labels(path)?,
        None => default_classes(),
    };

    info!("模型文件路径: {}", args.model.display());
    info!("输入图像: {}", args.image.display());
    info!(
        "置信度阈值: {}, IoU 阈值: {}",
        config.conf_threshold, config.iou_threshold
    );

    let mut detector = YoloDetector::open(&args.model, classes, config)?;
    // 出错时 detector 被析构，会话同样会释放
    let detections = detect_with(&mut detector, &args)?;
    detector.close()?;

    for det in &detections {
        println!(
            "发现 {} (置信度 {:.2}) 位置: ({:.1}, {:.1}, {:.1}, {:.1})",
            det.class_name, det.confidence, det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2
        );
    }
    Ok(())
}

fn detect_with(
    detector: &mut YoloDetector,
    args: &DetectArgs,
) -> Result<Vec<shelfscan::Detection>> {
    if args.runs > 0 {
        measure_processing_time(detector, &args.image, args.runs)?;
    }

    let image = load_image(&args.image)?;
    if args.bench_runs > 0 {
        let result = measure_inference_time(detector, &image, args.bench_runs)?;
        println!(
            "{} 次推理平均耗时: {:?}",
            result.num_runs, result.inference_time
        );
    }

    let detections = detector.detect(&image)?;
    if let Some(output) = &args.output {
        if let Err(e) = save_debug_image(&image, &detections, output) {
            warn!("保存调试图像失败: {}", e);
        }
    }
    Ok(detections)
}

fn run_classifier(args: ClassifyArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClassifierConfig::from_file(path)?,
        None => ClassifierConfig::default(),
    };
    let labels = match &args.labels {
        Some(path) => load_labels(path)?,
        None => CLASSIFIER_CLASSES.iter().map(|c| c.to_string()).collect(),
    };

    info!("模型文件路径: {}", args.model.display());
    let mut classifier = Classifier::open(&args.model, labels, config)?;

    if args.runs > 0 {
        measure_processing_time(&mut classifier, &args.image, args.runs)?;
    }
    let image = load_image(&args.image)?;
    if args.bench_runs > 0 {
        let result = measure_inference_time(&mut classifier, &image, args.bench_runs)?;
        println!(
            "{} 次推理平均耗时: {:?}",
            result.num_runs, result.inference_time
        );
    }

    let classifications = classifier.classify(&image)?;
    for c in &classifications {
        println!("{}: {:.4}", c.class_name, c.confidence);
    }
    match classifier.best(&classifications) {
        Some(best) => println!("分类结果: {} ({:.2})", best.class_name, best.confidence),
        None => println!("没有类别超过置信度阈值 {}", classifier.config().conf_threshold),
    }

    classifier.close()?;
    Ok(())
}
