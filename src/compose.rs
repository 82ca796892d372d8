// 该文件是 Kanjian （看见） 项目的一部分。
// src/compose.rs - 将标注后的图像堆叠为批次
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

use ndarray::{Array4, ArrayView3, Axis, stack};

use crate::{frame::ChwImage, visualize::VisualizeError};

/// 堆叠后的可视化结果，形状 (M, C, H, W)
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationBatch {
  /// 每张图像在源批次中的下标，升序
  pub image_indices: Vec<usize>,
  pub tensor: Array4<f32>,
}

impl VisualizationBatch {
  pub fn len(&self) -> usize {
    self.image_indices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.image_indices.is_empty()
  }

  pub fn shape(&self) -> (usize, usize, usize, usize) {
    self.tensor.dim()
  }

  pub fn image(&self, k: usize) -> ArrayView3<'_, f32> {
    self.tensor.index_axis(Axis(0), k)
  }
}

/// 按给定顺序堆叠图像；任意两张图像的形状不同即报错，不做缩放或填充
pub fn compose_batch(
  images: Vec<(usize, ChwImage)>,
) -> Result<VisualizationBatch, VisualizeError> {
  let Some((_, first)) = images.first() else {
    return Ok(VisualizationBatch {
      image_indices: Vec::new(),
      tensor: Array4::zeros((0, 0, 0, 0)),
    });
  };

  let expected = first.shape();
  if let Some((index, (_, image))) = images
    .iter()
    .enumerate()
    .find(|(_, (_, image))| image.shape() != expected)
  {
    return Err(VisualizeError::ShapeMismatch {
      index,
      expected,
      actual: image.shape(),
    });
  }

  let views: Vec<_> = images.iter().map(|(_, image)| image.data().view()).collect();
  let tensor = stack(Axis(0), &views)?;
  let image_indices = images.iter().map(|(i, _)| *i).collect();

  Ok(VisualizationBatch {
    image_indices,
    tensor,
  })
}
