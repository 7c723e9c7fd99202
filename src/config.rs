// 该文件是 Kanjian （看见） 项目的一部分。
// src/config.rs - 检测器配置
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

use thiserror::Error;

use crate::{model::Labels, nms::SuppressionMode};

pub const DEFAULT_NET_WIDTH: u32 = 640;
pub const DEFAULT_NET_HEIGHT: u32 = 640;
pub const DEFAULT_ANCHOR_COUNT: usize = 8400;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("网络输入尺寸无效: {0}x{1}")]
  InvalidNetSize(u32, u32),
  #[error("锚点数量必须大于 0")]
  NoAnchors,
  #[error("标签表为空")]
  NoLabels,
  #[error("{name} 必须位于 [0, 1] 区间内, 实际为 {value}")]
  ThresholdOutOfRange { name: &'static str, value: f32 },
}

/// 检测器配置
///
/// `anchor_count` 与标签数量必须和加载的模型一致，否则后处理会以形状不匹配失败。
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
  pub net_width: u32,
  pub net_height: u32,
  pub anchor_count: usize,
  pub labels: Labels,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub suppression: SuppressionMode,
  /// 是否为每个检测框裁剪原图区域
  pub extract_patches: bool,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      net_width: DEFAULT_NET_WIDTH,
      net_height: DEFAULT_NET_HEIGHT,
      anchor_count: DEFAULT_ANCHOR_COUNT,
      labels: Labels::coco(),
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      suppression: SuppressionMode::ClassAgnostic,
      extract_patches: true,
    }
  }
}

impl DetectorConfig {
  pub fn with_net_size(mut self, width: u32, height: u32) -> Self {
    self.net_width = width;
    self.net_height = height;
    self
  }

  pub fn with_anchor_count(mut self, anchor_count: usize) -> Self {
    self.anchor_count = anchor_count;
    self
  }

  pub fn with_labels(mut self, labels: Labels) -> Self {
    self.labels = labels;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_suppression(mut self, mode: SuppressionMode) -> Self {
    self.suppression = mode;
    self
  }

  pub fn with_patches(mut self, extract_patches: bool) -> Self {
    self.extract_patches = extract_patches;
    self
  }

  pub fn class_count(&self) -> usize {
    self.labels.len()
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.net_width == 0 || self.net_height == 0 {
      return Err(ConfigError::InvalidNetSize(self.net_width, self.net_height));
    }
    if self.anchor_count == 0 {
      return Err(ConfigError::NoAnchors);
    }
    if self.labels.is_empty() {
      return Err(ConfigError::NoLabels);
    }
    check_unit("confidence_threshold", self.confidence_threshold)?;
    check_unit("iou_threshold", self.iou_threshold)?;
    Ok(())
  }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
  if (0.0..=1.0).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::ThresholdOutOfRange { name, value })
  }
}
