// 该文件是 Kanjian （看见） 项目的一部分。
// src/preprocess.rs - 输入预处理
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

use image::RgbaImage;
use tracing::debug;

use crate::{backend::ImageBackend, tensor::Tensor};

const RGB_CHANNELS: usize = 3;
const RGBA_CHANNELS: usize = 4;

/// letterbox 缩放后转换为 `[1, 3, H, W]` 张量
pub fn prepare<B: ImageBackend>(
  backend: &B,
  image: &RgbaImage,
  net_width: u32,
  net_height: u32,
) -> Result<(RgbaImage, Tensor), B::Error> {
  let resized = backend.resize_letterbox(image, net_width, net_height)?;
  let tensor = to_nchw_tensor(&resized);
  debug!("预处理完成: 张量形状 {:?}", tensor.shape());
  Ok((resized, tensor))
}

/// RGBA 交错像素 -> 归一化的 RGB 平面（丢弃第四通道）
pub fn to_nchw_tensor(image: &RgbaImage) -> Tensor {
  let (width, height) = (image.width() as usize, image.height() as usize);
  let plane = width * height;
  let mut tensor = Tensor::zeros(&[1, RGB_CHANNELS, height, width]);
  let data = tensor.data_mut();

  for (idx, pixel) in image.as_raw().chunks_exact(RGBA_CHANNELS).enumerate() {
    for c in 0..RGB_CHANNELS {
      data[c * plane + idx] = pixel[c] as f32 / 255.0;
    }
  }

  tensor
}
