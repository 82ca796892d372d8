// 该文件是 Kanjian （看见） 项目的一部分。
// src/detection.rs - 检测结果定义与坐标修正
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

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::{convert::BoxXyxy, visualize::VisualizeError};

/// 小于 0 的坐标修正值
pub const COORD_LOW_FIX: f32 = 0.001;
/// 大于 1 的坐标修正值
pub const COORD_HIGH_FIX: f32 = 0.99;

/// 检测张量每行的字段布局，由调用方显式指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionLayout {
  /// (image_index, class_id, score, x1, y1, x2, y2)
  #[default]
  Detection,
  /// (image_index, class_id, x1, y1, x2, y2)
  GroundTruth,
}

impl DetectionLayout {
  pub fn width(&self) -> usize {
    match self {
      DetectionLayout::Detection => 7,
      DetectionLayout::GroundTruth => 6,
    }
  }

  /// 第一个坐标字段所在的列
  pub fn coord_offset(&self) -> usize {
    match self {
      DetectionLayout::Detection => 3,
      DetectionLayout::GroundTruth => 2,
    }
  }

  fn check_width(&self, actual: usize) -> Result<(), VisualizeError> {
    if actual != self.width() {
      return Err(VisualizeError::Shape {
        what: "检测张量列数",
        expected: self.width(),
        actual,
      });
    }
    Ok(())
  }
}

impl std::str::FromStr for DetectionLayout {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "detection" => Ok(DetectionLayout::Detection),
      "ground-truth" | "gt" => Ok(DetectionLayout::GroundTruth),
      other => Err(format!("未知的检测布局: {}", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub image_index: usize,
  pub class_id: usize,
  pub score: Option<f32>,
  pub bbox: BoxXyxy,
}

impl Detection {
  /// 修正越界坐标，返回被修改的字段数量
  pub fn sanitize(&mut self) -> usize {
    let mut fixed = 0;
    for value in self.bbox.0.iter_mut() {
      let repaired = sanitize_coordinate(*value);
      if repaired.to_bits() != value.to_bits() {
        *value = repaired;
        fixed += 1;
      }
    }
    fixed
  }
}

/// 单个归一化坐标的修正规则：负数改为 0.001，大于 1 改为 0.99
pub fn sanitize_coordinate(value: f32) -> f32 {
  if value < 0.0 {
    COORD_LOW_FIX
  } else if value > 1.0 {
    COORD_HIGH_FIX
  } else {
    value
  }
}

/// 在原始检测张量上就地修正坐标，返回被修改的字段数量
pub fn sanitize_tensor(
  tensor: &mut Array2<f32>,
  layout: DetectionLayout,
) -> Result<usize, VisualizeError> {
  layout.check_width(tensor.ncols())?;
  let offset = layout.coord_offset();
  let mut fixed = 0;
  for mut row in tensor.rows_mut() {
    for value in row.iter_mut().skip(offset) {
      let repaired = sanitize_coordinate(*value);
      if repaired.to_bits() != value.to_bits() {
        *value = repaired;
        fixed += 1;
      }
    }
  }
  Ok(fixed)
}

// 只接受有限的非负整数，填充行 (-1) 与小数不对应任何图像或类别
fn index_field(value: f32) -> Option<usize> {
  (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionBatch {
  pub items: Vec<Detection>,
}

impl DetectionBatch {
  pub fn from_array(
    array: ArrayView2<f32>,
    layout: DetectionLayout,
  ) -> Result<Self, VisualizeError> {
    layout.check_width(array.ncols())?;
    let offset = layout.coord_offset();

    let mut dropped = 0;
    let items = array
      .rows()
      .into_iter()
      .filter_map(|row| {
        let (Some(image_index), Some(class_id)) = (index_field(row[0]), index_field(row[1]))
        else {
          dropped += 1;
          return None;
        };
        Some(Detection {
          image_index,
          class_id,
          score: match layout {
            DetectionLayout::Detection => Some(row[2]),
            DetectionLayout::GroundTruth => None,
          },
          bbox: BoxXyxy([
            row[offset],
            row[offset + 1],
            row[offset + 2],
            row[offset + 3],
          ]),
        })
      })
      .collect();

    if dropped > 0 {
      debug!("丢弃 {} 个图像下标或类别无效的检测", dropped);
    }
    Ok(Self { items })
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn sanitize(&mut self) -> usize {
    let fixed = self.items.iter_mut().map(Detection::sanitize).sum();
    if fixed > 0 {
      debug!("修正了 {} 个越界坐标", fixed);
    }
    fixed
  }
}
