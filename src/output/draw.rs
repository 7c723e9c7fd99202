// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use image::{Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::model::BoundingBox;

const PALETTE_SIZE: usize = 80;
const BORDER_THICKNESS: i32 = 2;

pub struct Draw {
  colors: Vec<Rgba<u8>>,
  thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    // 每个类别一种颜色
    let colors = (0..PALETTE_SIZE)
      .map(|i| {
        let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
        hsv_to_rgba(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      colors,
      thickness: BORDER_THICKNESS,
    }
  }
}

impl Draw {
  pub fn with_thickness(mut self, thickness: i32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  pub fn color_of(&self, class_id: usize) -> Rgba<u8> {
    self.colors[class_id % self.colors.len()]
  }

  /// 在图像上绘制检测框，超出图像的部分被裁掉
  pub fn draw_detections(&self, image: &mut RgbaImage, boxes: &[BoundingBox]) {
    let (w, h) = (image.width() as f32, image.height() as f32);

    for b in boxes {
      let color = self.color_of(b.class_id);

      let x_min = b.x.max(0.0).floor() as i32;
      let y_min = b.y.max(0.0).floor() as i32;
      let x_max = (b.x + b.width).min(w).ceil() as i32;
      let y_max = (b.y + b.height).min(h).ceil() as i32;

      for t in 0..self.thickness {
        let (width, height) = (x_max - x_min - 2 * t, y_max - y_min - 2 * t);
        if width <= 0 || height <= 0 {
          break;
        }
        let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, color);
      }
    }
  }

  pub fn draw_on_copy(&self, image: &RgbaImage, boxes: &[BoundingBox]) -> RgbaImage {
    let mut canvas = image.clone();
    self.draw_detections(&mut canvas, boxes);
    canvas
  }
}

/// HSV 转 RGBA
fn hsv_to_rgba(h: f32, s: f32, v: f32) -> Rgba<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgba([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
    255,
  ])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bbox(x: f32, y: f32, width: f32, height: f32) -> BoundingBox {
    BoundingBox {
      x,
      y,
      width,
      height,
      class_id: 3,
      label: "thing".into(),
      probability: 0.9,
      patch: None,
    }
  }

  #[test]
  fn draws_border_inside_image() {
    let draw = Draw::default();
    let mut image = RgbaImage::new(20, 20);
    draw.draw_detections(&mut image, &[bbox(2.0, 2.0, 10.0, 10.0)]);

    let color = draw.color_of(3);
    assert_eq!(*image.get_pixel(2, 2), color);
    assert_eq!(*image.get_pixel(3, 3), color);
    assert_eq!(*image.get_pixel(11, 6), color);
    // 内部不填充
    assert_eq!(image.get_pixel(6, 6).0, [0, 0, 0, 0]);
  }

  #[test]
  fn ignores_boxes_outside_image() {
    let draw = Draw::default();
    let mut image = RgbaImage::new(10, 10);
    draw.draw_detections(
      &mut image,
      &[bbox(30.0, 30.0, 5.0, 5.0), bbox(-8.0, 2.0, -3.0, 4.0)],
    );
    assert!(image.pixels().all(|p| p.0 == [0, 0, 0, 0]));
  }

  #[test]
  fn palette_is_opaque_and_cycles() {
    let draw = Draw::default();
    assert_eq!(draw.color_of(0), draw.color_of(PALETTE_SIZE));
    assert_ne!(draw.color_of(0), draw.color_of(40));
    assert_eq!(draw.color_of(7).0[3], 255);
  }
}
