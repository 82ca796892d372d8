// 该文件是 Kanjian （看见） 项目的一部分。
// src/group.rs - 按图像与类别分组检测结果
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

use std::collections::BTreeMap;

use tracing::debug;

use crate::detection::{Detection, DetectionBatch};

/// 背景类别
pub const BACKGROUND_CLASS: usize = 0;

/// 单张图像的检测分组
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageGroup {
  pub image_index: usize,
  /// 非背景检测，保持原始顺序
  pub detections: Vec<Detection>,
  /// class_id -> detections 中的下标，类别升序，类内保持原始顺序
  pub classes: BTreeMap<usize, Vec<usize>>,
}

impl ImageGroup {
  pub fn class_detections(&self, class_id: usize) -> impl Iterator<Item = &Detection> {
    self
      .classes
      .get(&class_id)
      .into_iter()
      .flatten()
      .map(|&i| &self.detections[i])
  }

  pub fn len(&self) -> usize {
    self.detections.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 取前 min(batch_size, max_images) 张图像，将检测按图像、类别稳定划分
pub fn group_detections(
  batch: &DetectionBatch,
  batch_size: usize,
  max_images: usize,
) -> Vec<ImageGroup> {
  let num_images = batch_size.min(max_images);
  let mut groups: Vec<ImageGroup> = (0..num_images)
    .map(|image_index| ImageGroup {
      image_index,
      ..Default::default()
    })
    .collect();

  for det in batch.items.iter() {
    if det.class_id == BACKGROUND_CLASS {
      continue;
    }
    let Some(group) = groups.get_mut(det.image_index) else {
      continue;
    };
    let idx = group.detections.len();
    group.detections.push(det.clone());
    group.classes.entry(det.class_id).or_default().push(idx);
  }

  for group in groups.iter() {
    debug!(
      "图像 {}: {} 个检测, {} 个类别",
      group.image_index,
      group.detections.len(),
      group.classes.len()
    );
  }

  groups
}
