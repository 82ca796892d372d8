// 该文件是 Kanjian （看见） 项目的一部分。
// src/frame.rs - CHW 图像定义
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

use image::{ImageBuffer, Rgb, Rgb32FImage, RgbImage};
use ndarray::{Array3, ArrayView3};

use crate::visualize::VisualizeError;

pub const RGB_CHANNELS: usize = 3;

/// 像素取值范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelRange {
  /// [0, 1]
  #[default]
  Unit,
  /// [0, 255]
  Byte,
}

impl PixelRange {
  pub fn byte_to_value(&self, value: u8) -> f32 {
    match self {
      PixelRange::Unit => value as f32 / 255.0,
      PixelRange::Byte => value as f32,
    }
  }

  /// 超出范围的值被截断
  pub fn to_byte(&self, value: f32) -> u8 {
    let value = match self {
      PixelRange::Unit => value * 255.0,
      PixelRange::Byte => value,
    };
    value.round().clamp(0.0, 255.0) as u8
  }

  pub fn scale_color(&self, color: [u8; 3]) -> Rgb<f32> {
    Rgb(color.map(|c| self.byte_to_value(c)))
  }
}

/// 形状为 (C, H, W) 的浮点图像
#[derive(Debug, Clone, PartialEq)]
pub struct ChwImage {
  data: Array3<f32>,
}

impl ChwImage {
  pub fn new(data: Array3<f32>) -> Result<Self, VisualizeError> {
    let channels = data.dim().0;
    if channels != RGB_CHANNELS {
      return Err(VisualizeError::Shape {
        what: "图像通道数",
        expected: RGB_CHANNELS,
        actual: channels,
      });
    }
    Ok(Self { data })
  }

  pub fn from_view(view: ArrayView3<f32>) -> Result<Self, VisualizeError> {
    Self::new(view.to_owned())
  }

  pub fn channels(&self) -> usize {
    self.data.dim().0
  }

  pub fn height(&self) -> usize {
    self.data.dim().1
  }

  pub fn width(&self) -> usize {
    self.data.dim().2
  }

  pub fn shape(&self) -> (usize, usize, usize) {
    self.data.dim()
  }

  pub fn data(&self) -> &Array3<f32> {
    &self.data
  }

  pub fn into_inner(self) -> Array3<f32> {
    self.data
  }

  pub fn to_rgb32f(&self) -> Rgb32FImage {
    ImageBuffer::from_fn(self.width() as u32, self.height() as u32, |x, y| {
      let (x, y) = (x as usize, y as usize);
      Rgb([
        self.data[[0, y, x]],
        self.data[[1, y, x]],
        self.data[[2, y, x]],
      ])
    })
  }

  pub fn from_rgb32f(image: &Rgb32FImage) -> Self {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let data = Array3::from_shape_fn((RGB_CHANNELS, height, width), |(c, y, x)| {
      image.get_pixel(x as u32, y as u32)[c]
    });
    Self { data }
  }

  pub fn to_rgb_image(&self, range: PixelRange) -> RgbImage {
    ImageBuffer::from_fn(self.width() as u32, self.height() as u32, |x, y| {
      let (x, y) = (x as usize, y as usize);
      let px = |c: usize| range.to_byte(self.data[[c, y, x]]);
      Rgb([px(0), px(1), px(2)])
    })
  }

  pub fn from_rgb_image(image: &RgbImage, range: PixelRange) -> Self {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let data = Array3::from_shape_fn((RGB_CHANNELS, height, width), |(c, y, x)| {
      range.byte_to_value(image.get_pixel(x as u32, y as u32)[c])
    });
    Self { data }
  }
}
