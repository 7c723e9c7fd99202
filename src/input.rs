// 该文件是 Kanjian （看见） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

const FILE_SCHEME: &str = "file";

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无法读取图像文件 {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("无法解码图像: {0}")]
  Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 图像来源：本地文件或内存中的字节
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
  File(PathBuf),
  Bytes(Vec<u8>),
}

impl FromUrlWithScheme for ImageSource {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageSource {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME && url.scheme() != FILE_SCHEME {
      error!(
        "URI scheme mismatch: expected '{}' or '{}', found '{}'",
        Self::SCHEME,
        FILE_SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(ImageSource::File(PathBuf::from(url.path())))
  }
}

impl ImageSource {
  pub fn from_path(path: impl AsRef<Path>) -> Self {
    ImageSource::File(path.as_ref().to_path_buf())
  }

  /// 解析命令行参数：能解析为 `image://` 或 `file://` URL 时按 URL 处理，否则按路径处理
  pub fn parse(source: &str) -> Result<Self, InputError> {
    match Url::parse(source) {
      Ok(url) if url.scheme().len() > 1 => Self::from_url(&url),
      // Windows 盘符或普通路径
      _ => Ok(Self::from_path(source)),
    }
  }

  /// 读取原始字节
  pub fn read(&self) -> Result<Vec<u8>, InputError> {
    match self {
      ImageSource::File(path) => {
        debug!("读取图像文件: {}", path.display());
        std::fs::read(path).map_err(|source| InputError::IoError {
          path: path.clone(),
          source,
        })
      }
      ImageSource::Bytes(bytes) => Ok(bytes.clone()),
    }
  }
}

impl From<Vec<u8>> for ImageSource {
  fn from(bytes: Vec<u8>) -> Self {
    ImageSource::Bytes(bytes)
  }
}
