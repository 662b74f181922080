//! Vision模块 - 基于YOLO的货架商品检测与图像分类
//!
//! # 主要组件
//!
//! - image：图像加载、letterbox 变换及其逆变换
//! - prevs：张量编码与校验
//! - posts：预测解码、NMS、坐标映射
//! - model：推理引擎边界与 ONNX Runtime 实现
//! - detect / classify：完整的检测器与分类器
//! - draw：调试图像绘制
//!
//! # 工作流程
//!
//! 原图 → letterbox → 张量编码 → 推理 → 解码 → NMS → 映射回原图坐标

pub mod bounds;
pub mod classify;
pub mod detect;
pub mod draw;
pub mod image;
pub mod model;
pub mod posts;
pub mod prevs;

pub use bounds::{BoundingBox, Classification, Detection, ImageSize, LetterboxParams};
pub use classify::Classifier;
pub use detect::YoloDetector;
pub use draw::{draw_detections, save_debug_image};
pub use self::image::{Canvas, letterbox, load_image, unletterbox};
pub use model::{Engine, OrtEngine, check_tensor_names, init_runtime, load_model};
pub use posts::{apply_nms, decode_predictions, unletterbox_detections};
pub use prevs::{image_to_tensor, preprocess_batch, preprocess_image, verify_tensor_data};
