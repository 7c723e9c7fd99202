// 该文件是 Kanjian （看见） 项目的一部分。
// src/decode.rs - 检测头输出解码
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

use crate::{tensor::OutputView, transform::NetBox};

/// 解码得到的候选框，坐标仍在网络输入空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub bbox: NetBox,
  pub class_id: usize,
  pub probability: f32,
}

/// 逐锚点取最高分类别，低于阈值的锚点被丢弃
pub fn decode(view: &OutputView<'_>, confidence_threshold: f32) -> Vec<Candidate> {
  let mut candidates = Vec::new();

  for anchor in 0..view.anchors() {
    let Some((class_id, probability)) = best_class(view, anchor) else {
      continue;
    };

    if probability.is_nan() || probability < confidence_threshold {
      continue;
    }

    let Some([xc, yc, w, h]) = view.geometry(anchor) else {
      continue;
    };

    candidates.push(Candidate {
      bbox: NetBox { xc, yc, w, h },
      class_id,
      probability,
    });
  }

  debug!(
    "{} 个锚点中 {} 个超过置信度阈值 {}",
    view.anchors(),
    candidates.len(),
    confidence_threshold
  );
  candidates
}

/// 线性扫描，分数相同时保留编号较小的类别，NaN 分数不参与比较
fn best_class(view: &OutputView<'_>, anchor: usize) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for class in 0..view.classes() {
    let score = view.score(class, anchor)?;
    if score.is_nan() {
      continue;
    }
    if best.is_none_or(|(_, b)| score > b) {
      best = Some((class, score));
    }
  }
  best
}
