// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectionResult,
  output::{Render, draw::Draw, record::Record},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期分目录保存：标注后的图像、每个检测框的裁剪图、JSON 记录
///
/// `folder:///path?record=id` 以类别编号记录标签，`always` 表示没有检测结果时也保存。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  record: Record,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let label_with_name = !uri.query_pairs().any(|(k, v)| k == "record" && v == "id");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: Draw::default(),
      record: Record { label_with_name },
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl AsRef<Path>) -> Self {
    Self {
      directory: directory.as_ref().to_path_buf(),
      draw: Draw::default(),
      record: Record {
        label_with_name: true,
      },
      frame_counter: AtomicU16::new(0),
      always: false,
    }
  }

  pub fn always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// `<dir>/YYYY/MM/DD/HH-MM-SS-XXXX`，不含扩展名
  fn frame_stem(&self, now: DateTime<Utc>) -> PathBuf {
    self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()))
      .join(format!("{}-{:04X}", now.format("%H-%M-%S"), self.frame_id()))
  }

  fn save(&self, stem: &Path, result: &DetectionResult) -> Result<(), DirectoryRecordOutputError> {
    if let Some(parent) = stem.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let image = self.draw.draw_on_copy(&result.image, &result.boxes);
    image.save(stem.with_extension("png"))?;

    for (i, b) in result.boxes.iter().enumerate() {
      if let Some(patch) = &b.patch {
        let name = format!(
          "{}-{}-{}.png",
          stem.file_name().unwrap_or_default().to_string_lossy(),
          i,
          file_safe(&b.label)
        );
        patch.save(stem.with_file_name(name))?;
      }
    }

    let json = serde_json::to_string_pretty(&self.record.record(result))?;
    std::fs::write(stem.with_extension("json"), json)?;

    debug!("记录 {} 个检测框到 {}", result.boxes.len(), stem.display());
    Ok(())
  }
}

/// 标签来自用户文件，只保留字母数字、`-` 和 `_`
fn file_safe(label: &str) -> String {
  let name: String = label
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect();
  if name.is_empty() { "_".to_string() } else { name }
}

impl Render<DetectionResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, result: &DetectionResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      info!("没有检测结果，跳过记录");
      return Ok(());
    }
    let stem = self.frame_stem(Utc::now());
    self.save(&stem, result)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn parses_query_options() {
    let url = url::Url::parse("folder:///tmp/records?record=id&always").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert!(output.always);
    assert!(!output.record.label_with_name);
    assert_eq!(output.directory, PathBuf::from("/tmp/records"));

    let url = url::Url::parse("image:///tmp/records").unwrap();
    assert!(matches!(
      DirectoryRecordOutput::from_url(&url),
      Err(DirectoryRecordOutputError::SchemeMismatch)
    ));
  }

  #[test]
  fn labels_cannot_escape_record_directory() {
    assert_eq!(file_safe("traffic light"), "traffic_light");
    assert_eq!(file_safe("../../etc/passwd"), "______etc_passwd");
    assert_eq!(file_safe("a\\b"), "a_b");
    assert_eq!(file_safe(""), "_");
  }

  #[test]
  fn patches_stay_next_to_the_frame() {
    let directory = std::env::temp_dir().join(format!("kanjian-record-{}", std::process::id()));
    let output = DirectoryRecordOutput::new(&directory);
    let stem = directory.join("frame");
    let result = DetectionResult {
      boxes: vec![crate::model::BoundingBox {
        x: 0.0,
        y: 0.0,
        width: 2.0,
        height: 2.0,
        class_id: 0,
        label: "../escape".into(),
        probability: 0.9,
        patch: Some(image::RgbaImage::new(2, 2)),
      }],
      latency: [std::time::Duration::ZERO; 2],
      image: image::RgbaImage::new(4, 4),
    };

    output.save(&stem, &result).unwrap();
    assert!(directory.join("frame-0-___escape.png").exists());
    assert!(directory.join("frame.json").exists());
    assert!(!std::env::temp_dir().join("escape.png").exists());
    let _ = std::fs::remove_dir_all(&directory);
  }

  #[test]
  fn frame_stem_is_date_bucketed() {
    let output = DirectoryRecordOutput::new("/records");
    let now = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
    assert_eq!(
      output.frame_stem(now),
      PathBuf::from("/records/2026/03/07/09-05-01-0001")
    );
    assert_eq!(
      output.frame_stem(now),
      PathBuf::from("/records/2026/03/07/09-05-01-0002")
    );
  }
}
