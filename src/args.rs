// 该文件是 Kanjian （看见） 项目的一部分。
// src/args.rs - 检测器命令行参数
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

use std::path::PathBuf;

use clap::Args;

use crate::{
  config::{
    DEFAULT_ANCHOR_COUNT, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_NET_HEIGHT,
    DEFAULT_NET_WIDTH, DetectorConfig,
  },
  model::{Labels, LabelsError},
  nms::SuppressionMode,
};

/// 检测器参数
#[derive(Args, Debug, Clone)]
pub struct DetectorArgs {
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou: f32,

  /// 只保留该类别的检测结果
  #[arg(long, value_name = "LABEL")]
  pub filter: Option<String>,

  /// 标签文件（JSON 字符串数组），默认使用 COCO 80 类
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 按类别分别做 NMS
  #[arg(long)]
  pub per_class: bool,

  /// 不裁剪检测框区域
  #[arg(long)]
  pub no_patches: bool,

  /// 模型输入宽度
  #[arg(long, default_value_t = DEFAULT_NET_WIDTH, value_name = "PIXELS")]
  pub net_width: u32,

  /// 模型输入高度
  #[arg(long, default_value_t = DEFAULT_NET_HEIGHT, value_name = "PIXELS")]
  pub net_height: u32,

  /// 模型输出的锚点数量
  #[arg(long, default_value_t = DEFAULT_ANCHOR_COUNT, value_name = "COUNT")]
  pub anchors: usize,
}

impl DetectorArgs {
  pub fn to_config(&self) -> Result<DetectorConfig, LabelsError> {
    let labels = match &self.labels {
      Some(path) => Labels::from_json_file(path)?,
      None => Labels::coco(),
    };
    let suppression = if self.per_class {
      SuppressionMode::PerClass
    } else {
      SuppressionMode::ClassAgnostic
    };

    Ok(
      DetectorConfig::default()
        .with_net_size(self.net_width, self.net_height)
        .with_anchor_count(self.anchors)
        .with_labels(labels)
        .with_confidence_threshold(self.confidence)
        .with_iou_threshold(self.iou)
        .with_suppression(suppression)
        .with_patches(!self.no_patches),
    )
  }
}
