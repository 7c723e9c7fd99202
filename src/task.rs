// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 任务
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

use anyhow::Context;
use tracing::{info, warn};

use crate::{
  backend::ImageBackend,
  input::ImageSource,
  model::{DetectionResult, InferenceEngine},
  output::Render,
  pipeline::Detector,
};

pub trait Task<E, B, O>: Sized {
  type Output;
  type Error;
  fn run_task(
    self,
    input: &ImageSource,
    detector: &Detector<E, B>,
    output: &O,
  ) -> Result<Self::Output, Self::Error>;
}

/// 单次检测
#[derive(Default, Debug)]
pub struct OneShotTask {
  filter: Option<String>,
}

impl OneShotTask {
  pub fn with_filter(mut self, filter: Option<String>) -> Self {
    self.filter = filter;
    self
  }
}

impl<
  E: InferenceEngine,
  B: ImageBackend,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<DetectionResult, Error = RE>,
> Task<E, B, O> for OneShotTask
{
  type Output = DetectionResult;
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: &ImageSource,
    detector: &Detector<E, B>,
    output: &O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let result = detector.detect(input, self.filter.as_deref())?;
    info!(
      "推理完成，耗时: {:.2?}，后处理耗时: {:.2?}",
      result.inference_latency(),
      result.postprocess_latency()
    );
    output.render_result(&result)?;
    info!("渲染完成");

    Ok(result)
  }
}

/// 平均耗时统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
  pub runs: usize,
  pub inference: Duration,
  pub postprocess: Duration,
}

/// 对同一张图像重复检测，统计平均耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat_times: usize,
  warmup: usize,
  filter: Option<String>,
}

const REPEAT_TIMES: usize = 1000;
const WARMUP_TIMES: usize = 2;

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat_times: REPEAT_TIMES,
      warmup: WARMUP_TIMES,
      filter: None,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }

  pub fn with_filter(mut self, filter: Option<String>) -> Self {
    self.filter = filter;
    self
  }
}

/// 跳过前 `warmup` 次后求平均
pub fn average_latency(samples: &[[Duration; 2]], warmup: usize) -> Option<LatencySummary> {
  let counted = samples.get(warmup..).filter(|s| !s.is_empty())?;
  let runs = counted.len();
  let inference = counted.iter().map(|s| s[0]).sum::<Duration>() / runs as u32;
  let postprocess = counted.iter().map(|s| s[1]).sum::<Duration>() / runs as u32;
  Some(LatencySummary {
    runs,
    inference,
    postprocess,
  })
}

impl<
  E: InferenceEngine,
  B: ImageBackend,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<DetectionResult, Error = RE>,
> Task<E, B, O> for RepeatShotTask
{
  type Output = LatencySummary;
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: &ImageSource,
    detector: &Detector<E, B>,
    output: &O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let bytes = input.read()?;
    let image = detector
      .backend()
      .decode(&bytes)
      .context("无法解码输入图像")?;
    info!("输入图像获取成功，开始推理...");

    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = None;
    for i in 0..self.repeat_times {
      let result = detector.detect_image(image.clone(), self.filter.as_deref())?;
      info!(
        "({})推理完成，耗时: {:.2?} / {:.2?}",
        i,
        result.inference_latency(),
        result.postprocess_latency()
      );
      times.push(result.latency);
      last = Some(result);
    }

    if let Some(result) = &last {
      output.render_result(result)?;
    }

    let summary = average_latency(&times, self.warmup)
      .ok_or_else(|| anyhow::anyhow!("重复次数 {} 不大于预热次数 {}", self.repeat_times, self.warmup))?;
    warn!(
      "平均推理时间: {:.2?}，平均后处理时间: {:.2?}（{} 次）",
      summary.inference, summary.postprocess, summary.runs
    );

    Ok(summary)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
  }

  #[test]
  fn averages_after_warmup() {
    let samples = [[ms(100), ms(50)], [ms(10), ms(2)], [ms(20), ms(4)], [ms(30), ms(6)]];
    let summary = average_latency(&samples, 1).unwrap();
    assert_eq!(summary.runs, 3);
    assert_eq!(summary.inference, ms(20));
    assert_eq!(summary.postprocess, ms(4));
  }

  #[test]
  fn not_enough_samples() {
    let samples = [[ms(1), ms(1)]];
    assert!(average_latency(&samples, 1).is_none());
    assert!(average_latency(&samples, 5).is_none());
    assert!(average_latency(&[], 0).is_none());
  }
}
