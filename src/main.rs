// 该文件是 Kanjian （看见） 项目的一部分。
// src/main.rs - 单张图像检测入口
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
use tracing::info;
use url::Url;

use kanjian::{
  Detector, FromUrl, ImageCrate,
  args::DetectorArgs,
  input::ImageSource,
  model::OnnxEngineBuilder,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// Kanjian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径，例如 onnx:///path/to/yolo.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，文件路径或 image:// URL
  #[arg(long, value_name = "SOURCE")]
  pub input: String,
  /// 输出方式：log:、image:///out.png 或 folder:///records
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

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
  info!(
    "置信度阈值: {}，IOU 阈值: {}，类别数: {}",
    config.confidence_threshold,
    config.iou_threshold,
    config.class_count()
  );

  let input = ImageSource::parse(&args.input)?;
  let engine = OnnxEngineBuilder::from_url(&args.model)?
    .input_size(config.net_width, config.net_height)
    .build()?;
  let detector = Detector::new(engine, ImageCrate::default(), config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let result = OneShotTask::default()
    .with_filter(args.detector.filter)
    .run_task(&input, &detector, &output)?;
  info!("共检测到 {} 个对象", result.boxes.len());

  Ok(())
}
