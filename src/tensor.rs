// 该文件是 Kanjian （看见） 项目的一部分。
// src/tensor.rs - 张量与输出视图
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

/// 输出张量中框几何信息占用的行数（cx, cy, w, h）
pub const BOX_ROWS: usize = 4;

const CENTER_X_ROW: usize = 0;
const CENTER_Y_ROW: usize = 1;
const WIDTH_ROW: usize = 2;
const HEIGHT_ROW: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
  #[error("数据长度不匹配: 形状 {shape:?} 需要 {expected} 个元素, 实际 {actual} 个")]
  LengthMismatch {
    shape: Vec<usize>,
    expected: usize,
    actual: usize,
  },
  #[error("输出形状不匹配: 期望 [1, {rows}, {anchors}], 实际 {shape:?}")]
  OutputShapeMismatch {
    rows: usize,
    anchors: usize,
    shape: Vec<usize>,
  },
}

/// 扁平的 f32 缓冲区加形状描述
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  data: Box<[f32]>,
  shape: Box<[usize]>,
}

impl Tensor {
  pub fn new(data: Vec<f32>, shape: &[usize]) -> Result<Self, TensorError> {
    let expected: usize = shape.iter().product();
    if data.len() != expected {
      return Err(TensorError::LengthMismatch {
        shape: shape.to_vec(),
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      shape: shape.into(),
    })
  }

  pub fn zeros(shape: &[usize]) -> Self {
    let len = shape.iter().product();
    Self {
      data: vec![0.0; len].into_boxed_slice(),
      shape: shape.into(),
    }
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  pub fn data(&self) -> &[f32] {
    &self.data
  }

  pub fn data_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn into_data(self) -> Box<[f32]> {
    self.data
  }
}

/// 检测头输出 `[1, 4 + C, A]` 的类型化视图
///
/// 构造时检查形状，之后的访问器都在 `(行, 锚点)` 范围内。
#[derive(Debug, Clone, Copy)]
pub struct OutputView<'a> {
  data: &'a [f32],
  classes: usize,
  anchors: usize,
}

impl<'a> OutputView<'a> {
  pub fn new(tensor: &'a Tensor, classes: usize, anchors: usize) -> Result<Self, TensorError> {
    let rows = BOX_ROWS + classes;
    let shape = tensor.shape();
    let shape_ok = match shape {
      [1, r, a] | [r, a] => *r == rows && *a == anchors,
      _ => false,
    };

    if !shape_ok || tensor.len() != rows * anchors {
      return Err(TensorError::OutputShapeMismatch {
        rows,
        anchors,
        shape: shape.to_vec(),
      });
    }

    Ok(Self {
      data: tensor.data(),
      classes,
      anchors,
    })
  }

  pub fn classes(&self) -> usize {
    self.classes
  }

  pub fn anchors(&self) -> usize {
    self.anchors
  }

  /// 读取 `(row, anchor)` 处的值，越界返回 `None`
  pub fn get(&self, row: usize, anchor: usize) -> Option<f32> {
    if row >= BOX_ROWS + self.classes || anchor >= self.anchors {
      return None;
    }
    self.data.get(row * self.anchors + anchor).copied()
  }

  /// 某个锚点的类别分数
  pub fn score(&self, class: usize, anchor: usize) -> Option<f32> {
    if class >= self.classes {
      return None;
    }
    self.get(BOX_ROWS + class, anchor)
  }

  /// 某个锚点的框几何 `[cx, cy, w, h]`
  pub fn geometry(&self, anchor: usize) -> Option<[f32; 4]> {
    Some([
      self.get(CENTER_X_ROW, anchor)?,
      self.get(CENTER_Y_ROW, anchor)?,
      self.get(WIDTH_ROW, anchor)?,
      self.get(HEIGHT_ROW, anchor)?,
    ])
  }
}
