pub mod config;
pub mod error;
pub mod utils;
pub mod vision;

// 重新导出vision模块中的常用类型和函数
pub use vision::{BoundingBox, Classification, Detection, ImageSize, LetterboxParams};
pub use vision::{Classifier, Engine, OrtEngine, YoloDetector};
pub use vision::{draw_detections, load_image, save_debug_image};
pub use vision::{init_runtime, load_model};

pub use config::{ClassifierConfig, DetectorConfig, default_classes};
pub use error::PipelineError;
