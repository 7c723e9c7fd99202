// 该文件是 Kanjian （看见） 项目的一部分。
// src/model.rs - 模型
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

use std::time::Duration;

use image::RgbaImage;

use crate::{tensor::Tensor, transform::Rect};

/// 带名字的张量，推理引擎的输入输出单元
#[derive(Debug, Clone)]
pub struct NamedTensor {
  pub name: String,
  pub tensor: Tensor,
}

impl NamedTensor {
  pub fn new(name: impl Into<String>, tensor: Tensor) -> Self {
    Self {
      name: name.into(),
      tensor,
    }
  }
}

/// 推理引擎
///
/// 名字由引擎决定；流水线只绑定第一个声明的输入和第一个声明的输出。
pub trait InferenceEngine {
  type Error: std::error::Error + Send + Sync + 'static;

  fn input_names(&self) -> &[String];
  fn output_names(&self) -> &[String];
  fn run(&self, inputs: Vec<NamedTensor>) -> Result<Vec<NamedTensor>, Self::Error>;
}

/// 检测框，坐标位于原始图像空间
#[derive(Debug, Clone)]
pub struct BoundingBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
  pub class_id: usize,
  pub label: String,
  pub probability: f32,
  /// 按框裁剪出的原图区域，仅在流水线最后一步附加
  pub patch: Option<RgbaImage>,
}

impl BoundingBox {
  pub fn rect(&self) -> Rect {
    Rect::new(self.x, self.y, self.width, self.height)
  }
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
  pub boxes: Vec<BoundingBox>,
  /// [推理耗时, 后处理耗时]
  pub latency: [Duration; 2],
  /// 原始图像
  pub image: RgbaImage,
}

impl DetectionResult {
  pub fn inference_latency(&self) -> Duration {
    self.latency[0]
  }

  pub fn postprocess_latency(&self) -> Duration {
    self.latency[1]
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }
}

mod labels;
pub use self::labels::{COCO_CLASSES, Labels, LabelsError};

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxEngine, OnnxEngineBuilder, OnnxEngineError};
