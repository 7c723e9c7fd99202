// 该文件是 Kanjian （看见） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复检测同一张图像，统计平均耗时
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use kanjian::{
  Detector, FromUrl, ImageCrate,
  args::DetectorArgs,
  input::ImageSource,
  model::OnnxEngineBuilder,
  output::OutputWrapper,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Kanjian 基准测试参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: String,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,
  /// 重复次数
  #[arg(long, default_value_t = 1000)]
  pub repeat: usize,
  /// 不计入统计的预热次数
  #[arg(long, default_value_t = 2)]
  pub warmup: usize,

  #[command(flatten)]
  pub detector: DetectorArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = args.detector.to_config()?;
  let input = ImageSource::parse(&args.input)?;
  let engine = OnnxEngineBuilder::from_url(&args.model)?
    .input_size(config.net_width, config.net_height)
    .build()?;
  let detector = Detector::new(engine, ImageCrate::default(), config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let summary = RepeatShotTask::default()
    .with_repeat_times(args.repeat)
    .with_warmup(args.warmup)
    .with_filter(args.detector.filter)
    .run_task(&input, &detector, &output)?;
  info!(
    "{} 次平均：推理 {:.2?}，后处理 {:.2?}",
    summary.runs, summary.inference, summary.postprocess
  );

  Ok(())
}
