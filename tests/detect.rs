// 该文件是 Kanjian （看见） 项目的一部分。
// tests/detect.rs - 端到端检测测试
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

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

use kanjian::{
  DetectError, Detector, DetectorConfig, ImageCrate, InferenceEngine, Labels,
  input::{ImageSource, InputError},
  model::NamedTensor,
  output::{OutputWrapper, Render},
  task::{OneShotTask, Task},
  tensor::Tensor,
};

#[derive(Error, Debug)]
#[error("never fails")]
struct Never;

/// 不管输入是什么，都返回同一个 `[1, 4 + C, A]` 输出
struct FixedOutput {
  inputs: Vec<String>,
  outputs: Vec<String>,
  tensor: Tensor,
}

impl FixedOutput {
  /// 每个锚点给出 `[cx, cy, w, h, scores...]`
  fn new(classes: usize, anchors: &[[f32; 6]]) -> Self {
    let rows = 4 + classes;
    let count = anchors.len();
    let mut data = vec![0.0; rows * count];
    for (a, values) in anchors.iter().enumerate() {
      for r in 0..rows {
        data[r * count + a] = values[r];
      }
    }
    Self {
      inputs: vec!["images".into()],
      outputs: vec!["output0".into()],
      tensor: Tensor::new(data, &[1, rows, count]).unwrap(),
    }
  }
}

impl InferenceEngine for FixedOutput {
  type Error = Never;

  fn input_names(&self) -> &[String] {
    &self.inputs
  }

  fn output_names(&self) -> &[String] {
    &self.outputs
  }

  fn run(&self, inputs: Vec<NamedTensor>) -> Result<Vec<NamedTensor>, Self::Error> {
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].tensor.shape(), &[1, 3, 640, 640]);
    Ok(vec![NamedTensor::new("output0", self.tensor.clone())])
  }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
  let image = RgbaImage::from_pixel(width, height, Rgba([40, 120, 200, 255]));
  let mut bytes = Cursor::new(Vec::new());
  image.write_to(&mut bytes, ImageFormat::Png).unwrap();
  bytes.into_inner()
}

fn config(anchors: usize) -> DetectorConfig {
  DetectorConfig::default()
    .with_anchor_count(anchors)
    .with_labels(Labels::new(["cat", "dog"]).unwrap())
    .with_confidence_threshold(0.5)
    .with_iou_threshold(0.5)
}

#[test]
fn detects_and_maps_back_to_image_space() {
  let engine = FixedOutput::new(
    2,
    &[
      [320.0, 320.0, 100.0, 100.0, 0.9, 0.1],
      // 与第一个框完全重叠，类别无关 NMS 会抑制它
      [320.0, 320.0, 100.0, 100.0, 0.2, 0.6],
      [100.0, 100.0, 20.0, 20.0, 0.1, 0.3],
    ],
  );
  let detector = Detector::new(engine, ImageCrate::default(), config(3)).unwrap();

  let source = ImageSource::from(png_bytes(800, 600));
  let result = detector.detect(&source, None).unwrap();

  assert_eq!(result.image.dimensions(), (800, 600));
  assert_eq!(result.boxes.len(), 1);
  let b = &result.boxes[0];
  assert_eq!(b.label, "cat");
  assert_eq!(b.class_id, 0);
  assert!((b.probability - 0.9).abs() < 1e-6);
  assert!((b.x - 337.5).abs() < 1e-3);
  assert!((b.y - 237.5).abs() < 1e-3);
  assert!((b.width - 125.0).abs() < 1e-3);
  assert!((b.height - 125.0).abs() < 1e-3);

  let patch = b.patch.as_ref().unwrap();
  // 337.5..462.5 向外取整
  assert_eq!(patch.dimensions(), (126, 126));
  assert_eq!(patch.get_pixel(0, 0), &Rgba([40, 120, 200, 255]));
}

#[test]
fn low_confidence_gives_empty_result() {
  let engine = FixedOutput::new(
    2,
    &[
      [320.0, 320.0, 100.0, 100.0, 0.4, 0.1],
      [100.0, 100.0, 20.0, 20.0, 0.1, 0.49],
    ],
  );
  let detector = Detector::new(engine, ImageCrate::default(), config(2)).unwrap();

  let output = OutputWrapper::Log(kanjian::output::LogOutput);
  let result = OneShotTask::default()
    .run_task(&ImageSource::from(png_bytes(64, 48)), &detector, &output)
    .unwrap();
  assert!(result.is_empty());
  output.render_result(&result).unwrap();
}

#[test]
fn anchor_count_must_match_model_output() {
  let engine = FixedOutput::new(2, &[[320.0, 320.0, 100.0, 100.0, 0.9, 0.1]]);
  let detector = Detector::new(engine, ImageCrate::default(), config(8400)).unwrap();

  let err = detector
    .detect(&ImageSource::from(png_bytes(32, 32)), None)
    .unwrap_err();
  assert!(matches!(err, DetectError::ShapeMismatch(_)));
}

#[test]
fn missing_file_is_an_input_error() {
  let engine = FixedOutput::new(2, &[[0.0; 6]]);
  let detector = Detector::new(engine, ImageCrate::default(), config(1)).unwrap();

  let err = detector
    .detect(&ImageSource::from_path("/nonexistent/kanjian.png"), None)
    .unwrap_err();
  assert!(matches!(err, DetectError::Input(_)));
}

#[test]
fn undecodable_bytes_are_an_input_error() {
  let engine = FixedOutput::new(2, &[[0.0; 6]]);
  let detector = Detector::new(engine, ImageCrate::default(), config(1)).unwrap();

  let err = detector
    .detect(&ImageSource::from(b"not an image".to_vec()), None)
    .unwrap_err();
  assert!(matches!(err, DetectError::Input(InputError::Decode(_))));
}

#[cfg(feature = "save_image_file")]
#[test]
fn saves_annotated_image() {
  use kanjian::FromUrl;

  let engine = FixedOutput::new(2, &[[320.0, 320.0, 100.0, 100.0, 0.9, 0.1]]);
  let detector = Detector::new(engine, ImageCrate::default(), config(1)).unwrap();

  let path = std::env::temp_dir()
    .join(format!("kanjian-test-{}", std::process::id()))
    .join("annotated.png");
  let url = url::Url::from_file_path(&path).unwrap();
  let url = url::Url::parse(&url.as_str().replacen("file:", "image:", 1)).unwrap();
  let output = OutputWrapper::from_url(&url).unwrap();

  OneShotTask::default()
    .run_task(&ImageSource::from(png_bytes(800, 600)), &detector, &output)
    .unwrap();

  let saved = image::open(&path).unwrap();
  assert_eq!((saved.width(), saved.height()), (800, 600));
  let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
