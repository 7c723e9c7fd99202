// 该文件是 Kanjian （看见） 项目的一部分。
// src/pipeline.rs - 检测流水线
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

use std::time::Instant;

use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  backend::ImageBackend,
  config::{ConfigError, DetectorConfig},
  decode::decode,
  input::{ImageSource, InputError},
  model::{BoundingBox, DetectionResult, InferenceEngine, NamedTensor},
  nms::suppress,
  preprocess::prepare,
  tensor::{OutputView, Tensor, TensorError},
  transform::{LetterboxTransform, TransformError},
};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
  #[error("图像处理错误: {0}")]
  Image(#[source] BoxedError),
  #[error("图像尺寸错误: {0}")]
  Transform(#[from] TransformError),
  #[error("推理错误: {0}")]
  Inference(#[source] BoxedError),
  #[error("模型没有声明{0}张量")]
  MissingTensor(&'static str),
  #[error("模型输出中缺少张量 {0}")]
  MissingOutput(String),
  #[error("形状不匹配: {0}")]
  ShapeMismatch(#[from] TensorError),
}

/// 单阶段检测器：预处理、推理、解码、坐标还原、NMS
pub struct Detector<E, B> {
  engine: E,
  backend: B,
  config: DetectorConfig,
}

impl<E: InferenceEngine, B: ImageBackend> Detector<E, B> {
  pub fn new(engine: E, backend: B, config: DetectorConfig) -> Result<Self, DetectError> {
    config.validate()?;
    if engine.input_names().is_empty() {
      error!("模型没有声明输入");
      return Err(DetectError::MissingTensor("输入"));
    }
    if engine.output_names().is_empty() {
      error!("模型没有声明输出");
      return Err(DetectError::MissingTensor("输出"));
    }
    info!(
      "检测器就绪: 输入 {}x{}, {} 个锚点, {} 个类别",
      config.net_width,
      config.net_height,
      config.anchor_count,
      config.class_count()
    );
    Ok(Self {
      engine,
      backend,
      config,
    })
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  /// 读取并解码图像后检测
  pub fn detect(
    &self,
    source: &ImageSource,
    filter: Option<&str>,
  ) -> Result<DetectionResult, DetectError> {
    let bytes = source.read()?;
    let image = self
      .backend
      .decode(&bytes)
      .map_err(|e| InputError::Decode(Box::new(e)))?;
    self.detect_image(image, filter)
  }

  /// 对已解码的图像检测
  pub fn detect_image(
    &self,
    image: RgbaImage,
    filter: Option<&str>,
  ) -> Result<DetectionResult, DetectError> {
    let (_, tensor) = prepare(
      &self.backend,
      &image,
      self.config.net_width,
      self.config.net_height,
    )
    .map_err(|e| DetectError::Image(Box::new(e)))?;

    let start = Instant::now();
    let output = self.infer(tensor)?;
    let inference = start.elapsed();
    debug!("推理完成，耗时: {:.2?}", inference);

    let start = Instant::now();
    let boxes = self.postprocess(&output, &image, filter)?;
    let postprocess = start.elapsed();
    debug!("后处理完成，耗时: {:.2?}", postprocess);

    Ok(DetectionResult {
      boxes,
      latency: [inference, postprocess],
      image,
    })
  }

  /// 以第一个声明的输入名运行引擎，并取第一个声明的输出
  pub fn infer(&self, input: Tensor) -> Result<Tensor, DetectError> {
    let input_name = self
      .engine
      .input_names()
      .first()
      .ok_or(DetectError::MissingTensor("输入"))?
      .clone();
    let output_name = self
      .engine
      .output_names()
      .first()
      .ok_or(DetectError::MissingTensor("输出"))?
      .clone();

    let outputs = self
      .engine
      .run(vec![NamedTensor::new(input_name, input)])
      .map_err(|e| DetectError::Inference(Box::new(e)))?;

    outputs
      .into_iter()
      .find(|t| t.name == output_name)
      .map(|t| t.tensor)
      .ok_or(DetectError::MissingOutput(output_name))
  }

  /// 解码 -> 坐标还原 -> NMS -> 类别过滤 -> 裁剪
  pub fn postprocess(
    &self,
    output: &Tensor,
    image: &RgbaImage,
    filter: Option<&str>,
  ) -> Result<Vec<BoundingBox>, DetectError> {
    let config = &self.config;
    let view = OutputView::new(output, config.class_count(), config.anchor_count)
      .inspect_err(|e| error!("{}", e))?;
    let transform = LetterboxTransform::new(
      image.width(),
      image.height(),
      config.net_width,
      config.net_height,
    )?;

    let candidates = decode(&view, config.confidence_threshold);
    let boxes: Vec<BoundingBox> = candidates
      .into_iter()
      .map(|c| {
        let rect = transform.forward(c.bbox);
        BoundingBox {
          x: rect.x,
          y: rect.y,
          width: rect.width,
          height: rect.height,
          class_id: c.class_id,
          // 视图的类别数等于标签数量
          label: config.labels.name(c.class_id).unwrap_or_default().to_string(),
          probability: c.probability,
          patch: None,
        }
      })
      .collect();

    let mut boxes = suppress(boxes, config.iou_threshold, config.suppression);

    if let Some(filter) = filter {
      boxes.retain(|b| b.label == filter);
    }

    if config.extract_patches {
      for b in boxes.iter_mut() {
        b.patch = self.backend.crop(image, b.x, b.y, b.width, b.height);
      }
    }

    info!("检测到 {} 个物体", boxes.len());
    Ok(boxes)
  }
}
