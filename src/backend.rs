// 该文件是 Kanjian （看见） 项目的一部分。
// src/backend.rs - 图像后端
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

use image::{RgbaImage, imageops};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ImageBackendError {
  #[error("图像解码错误: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("图像尺寸无效: {0}x{1}")]
  EmptyImage(u32, u32),
}

/// 解码、letterbox 缩放、裁剪
pub trait ImageBackend {
  type Error: std::error::Error + Send + Sync + 'static;

  fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, Self::Error>;

  /// 等比缩放并居中填充到 `width x height`
  fn resize_letterbox(
    &self,
    image: &RgbaImage,
    width: u32,
    height: u32,
  ) -> Result<RgbaImage, Self::Error>;

  /// 裁剪矩形区域，超出图像的部分被截断；没有任何像素落在图像内时返回 `None`
  fn crop(&self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32)
  -> Option<RgbaImage>;
}

/// 基于 `image` crate 的后端
#[derive(Debug, Clone)]
pub struct ImageCrate {
  filter: imageops::FilterType,
  padding: image::Rgba<u8>,
}

impl Default for ImageCrate {
  fn default() -> Self {
    Self {
      filter: imageops::FilterType::Triangle,
      padding: image::Rgba([0, 0, 0, 0]),
    }
  }
}

impl ImageCrate {
  pub fn with_filter(mut self, filter: imageops::FilterType) -> Self {
    self.filter = filter;
    self
  }

  pub fn with_padding(mut self, padding: [u8; 4]) -> Self {
    self.padding = image::Rgba(padding);
    self
  }
}

impl ImageBackend for ImageCrate {
  type Error = ImageBackendError;

  fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, Self::Error> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    debug!("解码图像: {}x{}", image.width(), image.height());
    Ok(image)
  }

  fn resize_letterbox(
    &self,
    image: &RgbaImage,
    width: u32,
    height: u32,
  ) -> Result<RgbaImage, Self::Error> {
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 {
      return Err(ImageBackendError::EmptyImage(iw, ih));
    }
    if width == 0 || height == 0 {
      return Err(ImageBackendError::EmptyImage(width, height));
    }

    let scale = (width as f32 / iw as f32).min(height as f32 / ih as f32);
    let new_w = ((iw as f32 * scale).round() as u32).clamp(1, width);
    let new_h = ((ih as f32 * scale).round() as u32).clamp(1, height);

    let resized = imageops::resize(image, new_w, new_h, self.filter);
    let mut canvas = RgbaImage::from_pixel(width, height, self.padding);
    let offset_x = (width - new_w) / 2;
    let offset_y = (height - new_h) / 2;
    imageops::replace(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    debug!(
      "letterbox: {}x{} -> {}x{} (偏移 {}, {})",
      iw, ih, new_w, new_h, offset_x, offset_y
    );
    Ok(canvas)
  }

  fn crop(
    &self,
    image: &RgbaImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
  ) -> Option<RgbaImage> {
    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
      return None;
    }

    let (iw, ih) = (image.width() as f32, image.height() as f32);
    let left = x.max(0.0).floor();
    let top = y.max(0.0).floor();
    let right = (x + width).min(iw).ceil();
    let bottom = (y + height).min(ih).ceil();

    if right <= left || bottom <= top {
      return None;
    }

    let (left, top) = (left as u32, top as u32);
    let (w, h) = (right as u32 - left, bottom as u32 - top);
    if w == 0 || h == 0 {
      return None;
    }

    Some(imageops::crop_imm(image, left, top, w, h).to_image())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, image::Rgba(color))
  }

  #[test]
  fn letterbox_centers_landscape_image() {
    let backend = ImageCrate::default();
    let image = solid(8, 4, [200, 100, 50, 255]);
    let out = backend.resize_letterbox(&image, 4, 4).unwrap();

    assert_eq!(out.dimensions(), (4, 4));
    // 上下各一行填充
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(out.get_pixel(3, 3).0, [0, 0, 0, 0]);
    for (x, y) in [(0, 1), (3, 2)] {
      let p = out.get_pixel(x, y).0;
      assert_eq!(p[3], 255);
      assert!(p[0].abs_diff(200) <= 1 && p[1].abs_diff(100) <= 1 && p[2].abs_diff(50) <= 1);
    }
  }

  #[test]
  fn letterbox_rejects_empty_image() {
    let backend = ImageCrate::default();
    assert!(matches!(
      backend.resize_letterbox(&RgbaImage::new(0, 3), 4, 4),
      Err(ImageBackendError::EmptyImage(0, 3))
    ));
  }

  #[test]
  fn crop_truncates_to_bounds() {
    let backend = ImageCrate::default();
    let image = solid(10, 10, [1, 2, 3, 255]);

    let patch = backend.crop(&image, -5.0, 2.5, 8.0, 100.0).unwrap();
    assert_eq!(patch.dimensions(), (3, 8));

    let patch = backend.crop(&image, 1.0, 1.0, 2.0, 3.0).unwrap();
    assert_eq!(patch.dimensions(), (2, 3));
  }

  #[test]
  fn crop_outside_or_degenerate_is_none() {
    let backend = ImageCrate::default();
    let image = solid(10, 10, [1, 2, 3, 255]);

    assert!(backend.crop(&image, 20.0, 0.0, 5.0, 5.0).is_none());
    assert!(backend.crop(&image, 0.0, -30.0, 5.0, 5.0).is_none());
    assert!(backend.crop(&image, 2.0, 2.0, -1.0, 5.0).is_none());
    assert!(backend.crop(&image, f32::NAN, 2.0, 1.0, 5.0).is_none());
  }

  #[test]
  fn decodes_png_bytes() {
    let backend = ImageCrate::default();
    let mut bytes = Vec::new();
    solid(3, 2, [9, 8, 7, 255])
      .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
      .unwrap();

    let image = backend.decode(&bytes).unwrap();
    assert_eq!(image.dimensions(), (3, 2));
    assert_eq!(image.get_pixel(2, 1).0, [9, 8, 7, 255]);

    assert!(matches!(
      backend.decode(b"not an image"),
      Err(ImageBackendError::DecodeError(_))
    ));
  }
}
