// 该文件是 Kanjian （看见） 项目的一部分。
// src/visualize.rs - 检测结果可视化流水线
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

//! 修正 → 分组 → 筛选 → 坐标转换 → 绘制 → 堆叠。
//!
//! 每张图像的处理链互不依赖；[`Visualizer`] 与共享的 [`ClassColor`] 只读，
//! 可以在多个线程上分别调用 [`Visualizer::visualize_image`]。

use std::{sync::Arc, time::Instant};

use ndarray::{ArrayView2, ArrayView4, Axis};
use thiserror::Error;
use tracing::debug;

use crate::{
  color::ClassColor,
  compose::{VisualizationBatch, compose_batch},
  convert::convert_boxes,
  detection::{DetectionBatch, DetectionLayout},
  frame::{ChwImage, PixelRange},
  group::group_detections,
  render::{BoxRenderer, DEFAULT_THICKNESS},
  select::{LabeledBox, select_boxes},
};

#[derive(Error, Debug)]
pub enum VisualizeError {
  #[error("形状错误: {what} 期望 {expected}, 实际 {actual}")]
  Shape {
    what: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("类别 {class_id} 没有配置颜色 (共 {num_classes} 个类别)")]
  ColorLookup { class_id: usize, num_classes: usize },
  #[error("第 {index} 张图像形状不一致: 期望 {expected:?}, 实际 {actual:?}")]
  ShapeMismatch {
    index: usize,
    expected: (usize, usize, usize),
    actual: (usize, usize, usize),
  },
  #[error("张量错误: {0}")]
  Tensor(#[from] ndarray::ShapeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualizeConfig {
  /// 最多可视化的图像数
  pub max_images: usize,
  /// 每个类别最多绘制的框数，`None` 或 `Some(0)` 表示不限制
  pub max_box_per_class: Option<usize>,
  pub layout: DetectionLayout,
  pub pixel_range: PixelRange,
  pub thickness: u32,
}

impl Default for VisualizeConfig {
  fn default() -> Self {
    Self {
      max_images: 2,
      max_box_per_class: Some(10),
      layout: DetectionLayout::Detection,
      pixel_range: PixelRange::Unit,
      thickness: DEFAULT_THICKNESS,
    }
  }
}

impl VisualizeConfig {
  pub fn with_max_images(mut self, max_images: usize) -> Self {
    self.max_images = max_images;
    self
  }

  pub fn with_max_box_per_class(mut self, max_box_per_class: Option<usize>) -> Self {
    self.max_box_per_class = max_box_per_class;
    self
  }

  pub fn with_layout(mut self, layout: DetectionLayout) -> Self {
    self.layout = layout;
    self
  }

  pub fn with_pixel_range(mut self, pixel_range: PixelRange) -> Self {
    self.pixel_range = pixel_range;
    self
  }

  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness;
    self
  }
}

/// 单张图像待绘制的检测框
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlan {
  pub image_index: usize,
  pub boxes: Vec<LabeledBox>,
}

pub struct Visualizer {
  config: VisualizeConfig,
  colors: Arc<ClassColor>,
  renderer: BoxRenderer,
}

impl Visualizer {
  pub fn new(config: VisualizeConfig, colors: Arc<ClassColor>) -> Self {
    let renderer = BoxRenderer::new(config.thickness, config.pixel_range);
    Self {
      config,
      colors,
      renderer,
    }
  }

  pub fn config(&self) -> &VisualizeConfig {
    &self.config
  }

  pub fn colors(&self) -> &ClassColor {
    &self.colors
  }

  /// 修正、分组与筛选，得到每张被选中图像的绘制计划
  pub fn plan_batch(
    &self,
    batch_size: usize,
    detections: ArrayView2<f32>,
  ) -> Result<Vec<ImagePlan>, VisualizeError> {
    let mut batch = DetectionBatch::from_array(detections, self.config.layout)?;
    batch.sanitize();

    let plans = group_detections(&batch, batch_size, self.config.max_images)
      .iter()
      .map(|group| ImagePlan {
        image_index: group.image_index,
        boxes: select_boxes(group, self.config.max_box_per_class),
      })
      .collect();

    Ok(plans)
  }

  pub fn visualize_image(
    &self,
    image: &ChwImage,
    plan: &ImagePlan,
  ) -> Result<ChwImage, VisualizeError> {
    let boxes = convert_boxes(&plan.boxes);
    self.renderer.render(image, &boxes, &self.colors)
  }

  /// 可视化一个批次；任何错误只作用于本批次，不产生部分结果
  pub fn visualize_batch(
    &self,
    images: ArrayView4<f32>,
    detections: ArrayView2<f32>,
  ) -> Result<VisualizationBatch, VisualizeError> {
    let start = Instant::now();
    let plans = self.plan_batch(images.len_of(Axis(0)), detections)?;

    let drawn = plans
      .iter()
      .map(|plan| -> Result<_, VisualizeError> {
        let image = ChwImage::from_view(images.index_axis(Axis(0), plan.image_index))?;
        Ok((plan.image_index, self.visualize_image(&image, plan)?))
      })
      .collect::<Result<Vec<_>, VisualizeError>>()?;

    let batch = compose_batch(drawn)?;
    debug!(
      "可视化 {} 张图像, 形状 {:?}, 耗时 {:.2?}",
      batch.len(),
      batch.shape(),
      start.elapsed()
    );
    Ok(batch)
  }
}
