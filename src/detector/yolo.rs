// 该文件是 Haishao （海哨） 项目的一部分。
// src/detector/yolo.rs - YOLO11s 船舶检测器
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use image::RgbImage;
use ndarray::{Array4, ArrayD};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{TensorRef, ValueType};
use thiserror::Error;
use tracing::{debug, warn};

/// 船舶检测模型类别名称（yolo11s_tci 为单类别模型）
pub const VESSEL_CLASSES: [&str; 1] = ["vessel"];

/// 模型输入尺寸为动态维度时的回退值
const DEFAULT_INPUT_SIZE: u32 = 640;
/// NMS IOU 阈值
const DEFAULT_NMS_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("推理错误: {0}")]
  Ort(#[from] ort::Error),
  #[error("图像加载错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("模型输出格式错误: {0}")]
  BadOutput(String),
  #[error("瓦片化检测尚未实现")]
  TiledUnimplemented,
}

/// 检测结果
#[derive(Clone, Debug)]
pub struct Detection {
  /// 边界框 [x_min, y_min, x_max, y_max]（原图像素坐标）
  pub bbox: [f32; 4],
  /// 置信度
  pub confidence: f32,
  /// 类别索引
  pub class_id: usize,
  /// 类别名称
  pub class_name: String,
  /// 边界框中心 [x, y]
  pub center: [f32; 2],
}

impl Detection {
  pub fn new(bbox: [f32; 4], confidence: f32, class_id: usize) -> Self {
    Self {
      bbox,
      confidence,
      class_id,
      class_name: VESSEL_CLASSES
        .get(class_id)
        .unwrap_or(&"unknown")
        .to_string(),
      center: [(bbox[0] + bbox[2]) / 2.0, (bbox[1] + bbox[3]) / 2.0],
    }
  }
}

/// 基于 ONNX Runtime 的 YOLO11s 船舶检测器
pub struct VesselDetector {
  session: Session,
  input_name: String,
  output_name: String,
  /// 模型输入宽度
  input_width: u32,
  /// 模型输入高度
  input_height: u32,
  /// 置信度阈值
  confidence_threshold: f32,
  /// NMS IOU 阈值
  nms_threshold: f32,
  /// 实际使用的推理设备
  device: String,
}

impl VesselDetector {
  /// 创建一个新的船舶检测器。
  /// device 为 GPU 序号（如 "0"）或 "cpu"；GPU 不可用时回退到 CPU。
  pub fn new(
    model_path: &Path,
    device: &str,
    confidence_threshold: f32,
  ) -> Result<Self, DetectorError> {
    let builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "cuda")]
    let (builder, device) = if device != "cpu" {
      use ort::execution_providers::CUDAExecutionProvider;
      let ordinal: i32 = device.parse().unwrap_or(0);
      let builder = builder.with_execution_providers([
        CUDAExecutionProvider::default()
          .with_device_id(ordinal)
          .build(),
      ])?;
      (builder, device.to_string())
    } else {
      (builder, device.to_string())
    };
    #[cfg(not(feature = "cuda"))]
    let device = if device != "cpu" {
      warn!("请求 GPU 推理，但本构建未启用 cuda 特性，回退到 CPU");
      "cpu".to_string()
    } else {
      device.to_string()
    };

    let session = builder.commit_from_file(model_path)?;

    // 从模型输入张量读取尺寸；动态维度回退到默认值
    let (input_height, input_width) = match &session.inputs[0].input_type {
      ValueType::Tensor { shape, .. } if shape.len() == 4 && shape[2] > 0 && shape[3] > 0 => {
        (shape[2] as u32, shape[3] as u32)
      }
      _ => (DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE),
    };
    debug!("模型输入尺寸: {}x{}", input_width, input_height);

    let input_name = session.inputs[0].name.clone();
    let output_name = session.outputs[0].name.clone();

    Ok(Self {
      session,
      input_name,
      output_name,
      input_width,
      input_height,
      confidence_threshold,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
      device,
    })
  }

  pub fn device(&self) -> &str {
    &self.device
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.confidence_threshold
  }

  /// 预处理：缩放到模型输入尺寸，RGB → NCHW f32，归一化到 [0, 1]
  fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
      image,
      self.input_width,
      self.input_height,
      image::imageops::FilterType::Triangle,
    );

    let mut input = Array4::<f32>::zeros((
      1,
      3,
      self.input_height as usize,
      self.input_width as usize,
    ));
    for (x, y, pixel) in resized.enumerate_pixels() {
      let (x, y) = (x as usize, y as usize);
      input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
      input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
      input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }

    input
  }

  /// 对单幅图像运行推理
  pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
    let original_width = image.width() as f32;
    let original_height = image.height() as f32;

    let input = self.preprocess(image);

    let preds = {
      let outputs = self.session.run(ort::inputs![
        self.input_name.as_str() => TensorRef::from_array_view(&input)?
      ])?;
      outputs[self.output_name.as_str()]
        .try_extract_array::<f32>()?
        .to_owned()
    };

    let detections = decode_predictions(
      &preds,
      self.confidence_threshold,
      (self.input_width, self.input_height),
      (original_width, original_height),
    )?;

    Ok(nms(detections, self.nms_threshold))
  }

  /// 从磁盘加载图像并运行推理
  pub fn detect_file(&mut self, image_path: &Path) -> Result<Vec<Detection>, DetectorError> {
    let image: RgbImage = image::ImageReader::open(image_path)?.decode()?.into();
    self.detect(&image)
  }

  /// 滑窗瓦片化检测（带跨瓦片 NMS 去重）
  // TODO: v2.1 实现瓦片切分与跨瓦片 NMS
  pub fn detect_tiled(
    &mut self,
    _image_path: &Path,
    _tile_size: u32,
    _overlap: f32,
  ) -> Result<Vec<Detection>, DetectorError> {
    Err(DetectorError::TiledUnimplemented)
  }
}

/// 解码 ultralytics 检测头输出 [1, 4 + num_classes, num_anchors]：
/// 逐 anchor 取最高类别分数，按置信度过滤，cxcywh → xyxy 并缩放回原图尺寸
pub(crate) fn decode_predictions(
  preds: &ArrayD<f32>,
  confidence_threshold: f32,
  input_size: (u32, u32),
  original_size: (f32, f32),
) -> Result<Vec<Detection>, DetectorError> {
  let shape = preds.shape();
  if shape.len() != 3 || shape[0] != 1 {
    return Err(DetectorError::BadOutput(format!(
      "期望形状 [1, 4+nc, anchors]，实际 {shape:?}"
    )));
  }

  let num_attrs = shape[1];
  if num_attrs < 5 {
    return Err(DetectorError::BadOutput(format!(
      "输出属性数不足: {num_attrs}"
    )));
  }
  let num_classes = num_attrs - 4;
  let num_anchors = shape[2];

  let (input_width, input_height) = input_size;
  let (original_width, original_height) = original_size;
  let scale_x = original_width / input_width as f32;
  let scale_y = original_height / input_height as f32;

  let mut detections = Vec::new();

  for anchor in 0..num_anchors {
    // 找到最高类别分数
    let mut max_class_score = 0.0f32;
    let mut max_class_id = 0usize;
    for class_id in 0..num_classes {
      let score = preds[[0, 4 + class_id, anchor]];
      if score > max_class_score {
        max_class_score = score;
        max_class_id = class_id;
      }
    }

    if max_class_score < confidence_threshold {
      continue;
    }

    // 解码边界框
    let cx = preds[[0, 0, anchor]];
    let cy = preds[[0, 1, anchor]];
    let w = preds[[0, 2, anchor]];
    let h = preds[[0, 3, anchor]];

    let x_min = ((cx - w / 2.0) * scale_x).clamp(0.0, original_width);
    let y_min = ((cy - h / 2.0) * scale_y).clamp(0.0, original_height);
    let x_max = ((cx + w / 2.0) * scale_x).clamp(0.0, original_width);
    let y_max = ((cy + h / 2.0) * scale_y).clamp(0.0, original_height);

    detections.push(Detection::new(
      [x_min, y_min, x_max, y_max],
      max_class_score,
      max_class_id,
    ));
  }

  Ok(detections)
}

/// 非极大值抑制（同类别），按置信度降序输出
pub(crate) fn nms(mut detections: Vec<Detection>, nms_threshold: f32) -> Vec<Detection> {
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut result = Vec::new();

  while !detections.is_empty() {
    let best = detections.remove(0);

    detections.retain(|det| {
      if det.class_id != best.class_id {
        return true;
      }
      iou(&best, det) < nms_threshold
    });

    result.push(best);
  }

  result
}

/// 计算两个边界框的 IoU
pub(crate) fn iou(a: &Detection, b: &Detection) -> f32 {
  let x1 = a.bbox[0].max(b.bbox[0]);
  let y1 = a.bbox[1].max(b.bbox[1]);
  let x2 = a.bbox[2].min(b.bbox[2]);
  let y2 = a.bbox[3].min(b.bbox[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a.bbox[2] - a.bbox[0]) * (a.bbox[3] - a.bbox[1]);
  let area_b = (b.bbox[2] - b.bbox[0]) * (b.bbox[3] - b.bbox[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
