// 该文件是 Kanjian （看见） 项目的一部分。
// src/transform.rs - Letterbox 坐标变换
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

use thiserror::Error;

/// 网络输入空间中的边界框（中心点 + 宽高，单位为网络输入像素）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetBox {
  pub xc: f32,
  pub yc: f32,
  pub w: f32,
  pub h: f32,
}

/// 原始图像空间中的边界框（左上角 + 宽高，单位为原图像素）
///
/// 不会裁剪到图像范围内，宽高也可能为负。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl Rect {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  /// 面积，负的宽高按 0 处理
  pub fn area(&self) -> f32 {
    self.width.max(0.0) * self.height.max(0.0)
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
  #[error("图像尺寸无效: {0}x{1}")]
  EmptyImage(u32, u32),
  #[error("网络输入尺寸无效: {0}x{1}")]
  EmptyNetwork(u32, u32),
}

/// 网络输入空间与原始图像空间之间的 letterbox 映射
///
/// 缩放比例取两个方向比例中较大的一个，因此较短的一边被填充，从不裁剪。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
  scale: f32,
  x_padding: f32,
  y_padding: f32,
}

impl LetterboxTransform {
  pub fn new(
    image_width: u32,
    image_height: u32,
    net_width: u32,
    net_height: u32,
  ) -> Result<Self, TransformError> {
    if image_width == 0 || image_height == 0 {
      return Err(TransformError::EmptyImage(image_width, image_height));
    }
    if net_width == 0 || net_height == 0 {
      return Err(TransformError::EmptyNetwork(net_width, net_height));
    }

    let (iw, ih) = (image_width as f32, image_height as f32);
    let (nw, nh) = (net_width as f32, net_height as f32);

    let scale = (iw / nw).max(ih / nh);
    // 其中一个为 0，另一个是居中所需的填充
    let x_padding = (nw - iw / scale) / 2.0;
    let y_padding = (nh - ih / scale) / 2.0;

    Ok(Self {
      scale,
      x_padding,
      y_padding,
    })
  }

  pub fn scale(&self) -> f32 {
    self.scale
  }

  pub fn x_padding(&self) -> f32 {
    self.x_padding
  }

  pub fn y_padding(&self) -> f32 {
    self.y_padding
  }

  /// 网络空间 -> 原图空间
  pub fn forward(&self, b: NetBox) -> Rect {
    Rect {
      x: (b.xc - b.w / 2.0 - self.x_padding) * self.scale,
      y: (b.yc - b.h / 2.0 - self.y_padding) * self.scale,
      width: b.w * self.scale,
      height: b.h * self.scale,
    }
  }

  /// 原图空间 -> 网络空间，`forward` 的逆变换
  pub fn inverse(&self, r: Rect) -> NetBox {
    NetBox {
      xc: r.x / self.scale + self.x_padding + r.width / (2.0 * self.scale),
      yc: r.y / self.scale + self.y_padding + r.height / (2.0 * self.scale),
      w: r.width / self.scale,
      h: r.height / self.scale,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3 * (1.0 + a.abs().max(b.abs()))
  }

  #[test]
  fn landscape_image_pads_vertically() {
    let t = LetterboxTransform::new(800, 600, 640, 640).unwrap();
    assert_eq!(t.scale(), 1.25);
    assert_eq!(t.x_padding(), 0.0);
    assert_eq!(t.y_padding(), 80.0);

    let r = t.forward(NetBox {
      xc: 320.0,
      yc: 320.0,
      w: 100.0,
      h: 100.0,
    });
    assert_eq!(r, Rect::new(337.5, 237.5, 125.0, 125.0));
  }

  #[test]
  fn portrait_image_pads_horizontally() {
    let t = LetterboxTransform::new(300, 600, 640, 640).unwrap();
    assert!(close(t.scale(), 600.0 / 640.0));
    assert!(close(t.x_padding(), 160.0));
    assert!(close(t.y_padding(), 0.0));

    // 网络空间中填充区域的左上角映射到原图原点
    let r = t.forward(NetBox {
      xc: 170.0,
      yc: 10.0,
      w: 20.0,
      h: 20.0,
    });
    assert!(close(r.x, 0.0));
    assert!(close(r.y, 0.0));
  }

  #[test]
  fn boxes_in_padding_map_outside_image() {
    let t = LetterboxTransform::new(800, 600, 640, 640).unwrap();
    let r = t.forward(NetBox {
      xc: 320.0,
      yc: 20.0,
      w: 10.0,
      h: 10.0,
    });
    assert!(r.bottom() < 0.0);
  }

  #[test]
  fn forward_inverts_inverse() {
    let sizes = [(800, 600), (600, 800), (640, 640), (1, 1000), (1920, 1080), (37, 41)];
    let rects = [
      Rect::new(0.0, 0.0, 10.0, 10.0),
      Rect::new(12.5, 99.25, 300.0, 1.5),
      Rect::new(-20.0, 5.0, 40.0, 80.0),
      Rect::new(1000.0, 2000.0, 0.0, 0.0),
    ];
    for (w, h) in sizes {
      let t = LetterboxTransform::new(w, h, 640, 640).unwrap();
      assert!(t.x_padding() >= 0.0 && t.y_padding() >= 0.0);
      for r in rects {
        let back = t.forward(t.inverse(r));
        assert!(close(back.x, r.x), "{w}x{h}: {back:?} != {r:?}");
        assert!(close(back.y, r.y), "{w}x{h}: {back:?} != {r:?}");
        assert!(close(back.width, r.width), "{w}x{h}: {back:?} != {r:?}");
        assert!(close(back.height, r.height), "{w}x{h}: {back:?} != {r:?}");
      }
    }
  }

  #[test]
  fn rejects_empty_dimensions() {
    assert_eq!(
      LetterboxTransform::new(0, 10, 640, 640),
      Err(TransformError::EmptyImage(0, 10))
    );
    assert_eq!(
      LetterboxTransform::new(10, 10, 640, 0),
      Err(TransformError::EmptyNetwork(640, 0))
    );
  }
}
