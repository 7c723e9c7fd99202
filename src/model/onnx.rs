// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/onnx.rs - ONNX 推理引擎
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
use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{InferenceEngine, NamedTensor},
  tensor::{Tensor, TensorError},
};

const ONNX_INPUT_CHANNELS: usize = 3;
const ONNX_DEFAULT_INPUT_W: usize = 640;
const ONNX_DEFAULT_INPUT_H: usize = 640;

#[derive(Error, Debug)]
pub enum OnnxEngineError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("Tract 错误: {0}")]
  TractError(TractError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("缺少输入张量: {0}")]
  MissingInput(String),
  #[error("张量错误: {0}")]
  TensorError(#[from] TensorError),
}

impl From<std::io::Error> for OnnxEngineError {
  fn from(err: std::io::Error) -> Self {
    OnnxEngineError::ModelLoadError(err)
  }
}

impl From<TractError> for OnnxEngineError {
  fn from(err: TractError) -> Self {
    OnnxEngineError::TractError(err)
  }
}

pub struct OnnxEngine {
  plan: TypedRunnableModel<TypedModel>,
  input_names: Vec<String>,
  output_names: Vec<String>,
}

pub struct OnnxEngineBuilder {
  model_path: String,
  input_width: usize,
  input_height: usize,
}

impl FromUrlWithScheme for OnnxEngineBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxEngineBuilder {
  type Error = OnnxEngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxEngineError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(OnnxEngineBuilder {
      model_path: url.path().to_string(),
      input_width: ONNX_DEFAULT_INPUT_W,
      input_height: ONNX_DEFAULT_INPUT_H,
    })
  }
}

impl OnnxEngineBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      input_width: ONNX_DEFAULT_INPUT_W,
      input_height: ONNX_DEFAULT_INPUT_H,
    }
  }

  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.input_width = width as usize;
    self.input_height = height as usize;
    self
  }

  pub fn build(self) -> Result<OnnxEngine, OnnxEngineError> {
    info!("加载模型文件: {}", self.model_path);
    let size = std::fs::metadata(&self.model_path)?.len();
    debug!("模型文件大小: {:.2} MB", size as f64 / (1024.0 * 1024.0));

    let model = tract_onnx::onnx().model_for_path(&self.model_path)?;

    let input_names = outlet_names(&model, model.input_outlets()?);
    let output_names = outlet_names(&model, model.output_outlets()?);

    check_outlets(&input_names, &output_names).inspect_err(|e| error!("{}", e))?;

    debug!("模型输入: {:?}", input_names);
    debug!("模型输出: {:?}", output_names);

    info!("优化模型计算图");
    let plan = model
      .with_input_fact(
        0,
        InferenceFact::dt_shape(
          f32::datum_type(),
          tvec![1, ONNX_INPUT_CHANNELS, self.input_height, self.input_width],
        ),
      )?
      .into_optimized()?
      .into_runnable()?;
    info!("模型加载完成");

    Ok(OnnxEngine {
      plan,
      input_names,
      output_names,
    })
  }
}

fn outlet_names(model: &InferenceModel, outlets: &[OutletId]) -> Vec<String> {
  outlets
    .iter()
    .map(|outlet| outlet_name(&model.node(outlet.node).name, outlet.slot))
    .collect()
}

/// 第一个输出槽沿用节点名，其余槽追加 `:slot`
fn outlet_name(node: &str, slot: usize) -> String {
  if slot == 0 {
    node.to_string()
  } else {
    format!("{}:{}", node, slot)
  }
}

/// 只支持单输入模型，且至少有一个输出
fn check_outlets(inputs: &[String], outputs: &[String]) -> Result<(), OnnxEngineError> {
  if inputs.len() != 1 || outputs.is_empty() {
    return Err(OnnxEngineError::ModelInvalid(format!(
      "需要 1 个输入和至少 1 个输出，模型输入数量为 {}, 输出数量为 {}",
      inputs.len(),
      outputs.len()
    )));
  }
  Ok(())
}

impl InferenceEngine for OnnxEngine {
  type Error = OnnxEngineError;

  fn input_names(&self) -> &[String] {
    &self.input_names
  }

  fn output_names(&self) -> &[String] {
    &self.output_names
  }

  fn run(&self, inputs: Vec<NamedTensor>) -> Result<Vec<NamedTensor>, Self::Error> {
    // 构建时已保证只有一个输入
    let name = self
      .input_names
      .first()
      .ok_or_else(|| OnnxEngineError::ModelInvalid("模型没有输入".to_string()))?;
    let input = inputs
      .iter()
      .find(|t| &t.name == name)
      .ok_or_else(|| OnnxEngineError::MissingInput(name.clone()))?;
    let tensor =
      tract_onnx::prelude::Tensor::from_shape(input.tensor.shape(), input.tensor.data())?;
    let values: TVec<TValue> = tvec![tensor.into()];

    debug!("执行模型推理");
    let outputs = self.plan.run(values)?;

    let mut named = Vec::with_capacity(outputs.len());
    for (name, value) in self.output_names.iter().zip(outputs.iter()) {
      let view = value.to_array_view::<f32>()?;
      let shape = view.shape().to_vec();
      let data: Vec<f32> = view.iter().copied().collect();
      debug!("模型输出 {}: {:?}", name, shape);
      named.push(NamedTensor::new(name.clone(), Tensor::new(data, &shape)?));
    }

    Ok(named)
  }
}
