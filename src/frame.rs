// 该文件是 Zaoye （枣椰叶诊） 项目的一部分。
// src/frame.rs - 归一化张量帧定义
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

use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;

pub const FRAME_WIDTH: u32 = 224;
pub const FRAME_HEIGHT: u32 = 224;
pub const RGB_CHANNELS: usize = 3;

/// 归一化后的 NHWC 张量帧，形状固定为 (1, 224, 224, 3)，
/// 像素值均在 [0.0, 1.0] 闭区间内。
#[derive(Debug, Clone)]
pub struct RgbTensorFrame {
  data: Array4<f32>,
}

impl From<&DynamicImage> for RgbTensorFrame {
  /// 等比缩放并居中裁剪到 224x224，再把 0-255 像素值缩放到单位区间。
  fn from(image: &DynamicImage) -> Self {
    let fitted = image
      .resize_to_fill(FRAME_WIDTH, FRAME_HEIGHT, FilterType::Lanczos3)
      .to_rgb8();

    let mut data = Array4::zeros((
      1,
      FRAME_HEIGHT as usize,
      FRAME_WIDTH as usize,
      RGB_CHANNELS,
    ));

    for (w, h, pixel) in fitted.enumerate_pixels() {
      for c in 0..RGB_CHANNELS {
        data[[0, h as usize, w as usize, c]] = f32::from(pixel[c]) / 255.0;
      }
    }

    Self { data }
  }
}

impl Default for RgbTensorFrame {
  fn default() -> Self {
    let data = Array4::zeros((
      1,
      FRAME_HEIGHT as usize,
      FRAME_WIDTH as usize,
      RGB_CHANNELS,
    ));
    Self { data }
  }
}

impl RgbTensorFrame {
  pub fn height(&self) -> usize {
    FRAME_HEIGHT as usize
  }

  pub fn width(&self) -> usize {
    FRAME_WIDTH as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_array(&self) -> &Array4<f32> {
    &self.data
  }

  pub fn into_array(self) -> Array4<f32> {
    self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let image = RgbImage::from_fn(width, height, |x, y| {
      Rgb([
        (x % 256) as u8,
        (y % 256) as u8,
        ((x + y) % 256) as u8,
      ])
    });
    DynamicImage::ImageRgb8(image)
  }

  #[test]
  fn frame_shape_is_fixed_for_any_input_size() {
    for (w, h) in [(224, 224), (50, 80), (1000, 300), (37, 991)] {
      let frame = RgbTensorFrame::from(&gradient_image(w, h));
      assert_eq!(frame.as_array().shape(), &[1, 224, 224, 3]);
    }
  }

  #[test]
  fn frame_values_stay_in_unit_interval() {
    let frame = RgbTensorFrame::from(&gradient_image(640, 480));
    for &v in frame.as_array().iter() {
      assert!((0.0..=1.0).contains(&v), "像素值越界: {v}");
    }
  }

  #[test]
  fn frame_layout_is_nhwc() {
    // 纯红图像：通道 0 全为 1.0，通道 1 与 2 全为 0.0。
    let red = RgbImage::from_pixel(300, 300, Rgb([255, 0, 0]));
    let frame = RgbTensorFrame::from(&DynamicImage::ImageRgb8(red));
    let array = frame.as_array();
    assert_eq!(array[[0, 0, 0, 0]], 1.0);
    assert_eq!(array[[0, 0, 0, 1]], 0.0);
    assert_eq!(array[[0, 112, 57, 2]], 0.0);
    assert_eq!(array[[0, 223, 223, 0]], 1.0);
  }

  #[test]
  fn default_frame_is_zeroed() {
    let frame = RgbTensorFrame::default();
    assert_eq!(frame.height(), 224);
    assert_eq!(frame.width(), 224);
    assert_eq!(frame.channels(), 3);
    assert!(frame.as_array().iter().all(|&v| v == 0.0));
  }
}
