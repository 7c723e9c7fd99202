// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/record.rs - 检测结果记录
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

use serde_json::{Value, json};

use crate::model::{BoundingBox, DetectionResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn item(&self, b: &BoundingBox) -> Value {
    let label = if self.label_with_name {
      json!(b.label)
    } else {
      json!(b.class_id)
    };
    json!({
      "label": label,
      "probability": b.probability,
      "bbox": [b.x, b.y, b.width, b.height],
    })
  }

  /// 整张图像的记录，延迟以秒为单位
  pub fn record(&self, result: &DetectionResult) -> Value {
    json!({
      "image": [result.image.width(), result.image.height()],
      "latency": [
        result.inference_latency().as_secs_f64(),
        result.postprocess_latency().as_secs_f64(),
      ],
      "boxes": result.boxes.iter().map(|b| self.item(b)).collect::<Vec<_>>(),
    })
  }
}
