// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/input/mod.rs - 图像输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 推理输入：文件路径、内存中的编码字节流，或已解码的位图。
pub enum ImageInput {
  File(PathBuf),
  Memory(Vec<u8>),
  Decoded(DynamicImage),
}

impl ImageInput {
  /// 解码为 RGB 位图。解码失败向调用方传播 [`DecodeError`]。
  pub fn decode(self) -> Result<DynamicImage, DecodeError> {
    match self {
      ImageInput::File(path) => {
        debug!("解码图像文件: {}", path.display());
        let image = ImageReader::open(&path)?.decode()?;
        Ok(image)
      }
      ImageInput::Memory(bytes) => {
        debug!("解码内存图像, {} 字节", bytes.len());
        let image = ImageReader::new(Cursor::new(bytes))
          .with_guessed_format()?
          .decode()?;
        Ok(image)
      }
      ImageInput::Decoded(image) => Ok(image),
    }
  }
}

impl From<PathBuf> for ImageInput {
  fn from(path: PathBuf) -> Self {
    ImageInput::File(path)
  }
}

impl From<&str> for ImageInput {
  fn from(path: &str) -> Self {
    ImageInput::File(PathBuf::from(path))
  }
}

impl From<Vec<u8>> for ImageInput {
  fn from(bytes: Vec<u8>) -> Self {
    ImageInput::Memory(bytes)
  }
}

impl From<DynamicImage> for ImageInput {
  fn from(image: DynamicImage) -> Self {
    ImageInput::Decoded(image)
  }
}

impl From<RgbImage> for ImageInput {
  fn from(image: RgbImage) -> Self {
    ImageInput::Decoded(DynamicImage::ImageRgb8(image))
  }
}
