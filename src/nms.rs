// 该文件是 Kanjian （看见） 项目的一部分。
// src/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::{model::BoundingBox, transform::Rect};

/// 抑制范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionMode {
  /// 不区分类别，任意两个重叠框都会互相抑制
  #[default]
  ClassAgnostic,
  /// 只抑制同类别的框
  PerClass,
}

/// 参与 NMS 的检测结果
pub trait Suppressible {
  fn rect(&self) -> Rect;
  fn probability(&self) -> f32;
  fn class_id(&self) -> usize;
}

impl Suppressible for BoundingBox {
  fn rect(&self) -> Rect {
    BoundingBox::rect(self)
  }

  fn probability(&self) -> f32 {
    self.probability
  }

  fn class_id(&self) -> usize {
    self.class_id
  }
}

/// 计算两个边界框的 IoU
///
/// 并集面积不为正（例如两个框面积都为 0）时返回 0。
pub fn iou(a: &Rect, b: &Rect) -> f32 {
  let x1 = a.x.max(b.x);
  let y1 = a.y.max(b.y);
  let x2 = a.right().min(b.right());
  let y2 = a.bottom().min(b.bottom());

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.area() + b.area() - intersection;

  if union > 0.0 {
    (intersection / union).clamp(0.0, 1.0)
  } else {
    0.0
  }
}

/// 贪心 NMS
///
/// 先按概率降序稳定排序一次，然后依次保留未被抑制的框，并标记其后与之
/// IoU 不小于阈值的框。输出顺序即保留顺序。
pub fn suppress<T: Suppressible>(
  mut candidates: Vec<T>,
  iou_threshold: f32,
  mode: SuppressionMode,
) -> Vec<T> {
  candidates.sort_by(|a, b| b.probability().total_cmp(&a.probability()));

  let rects: Vec<Rect> = candidates.iter().map(Suppressible::rect).collect();
  let mut suppressed = vec![false; candidates.len()];

  for i in 0..candidates.len() {
    if suppressed[i] {
      continue;
    }
    for j in (i + 1)..candidates.len() {
      if suppressed[j] {
        continue;
      }
      if mode == SuppressionMode::PerClass
        && candidates[i].class_id() != candidates[j].class_id()
      {
        continue;
      }
      if iou(&rects[i], &rects[j]) >= iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  let before = candidates.len();
  let kept: Vec<T> = candidates
    .into_iter()
    .zip(suppressed)
    .filter_map(|(c, s)| (!s).then_some(c))
    .collect();

  debug!("NMS: {} -> {} 个检测框", before, kept.len());
  kept
}
