// 该文件是 Kanjian （看见） 项目的一部分。
// src/select.rs - 限制每个类别绘制的框数
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

use crate::{convert::BoxXyxy, group::ImageGroup};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledBox {
  pub class_id: usize,
  pub bbox: BoxXyxy,
}

/// 每个类别只保留前 `max_box_per_class` 个检测（前缀截断，不按分数排序）。
///
/// `None` 或 `Some(0)` 表示不限制，此时按原始顺序返回该图像的全部检测；
/// 否则按类别升序拼接，类内保持原始顺序。
pub fn select_boxes(group: &ImageGroup, max_box_per_class: Option<usize>) -> Vec<LabeledBox> {
  let to_box = |det: &crate::detection::Detection| LabeledBox {
    class_id: det.class_id,
    bbox: det.bbox,
  };

  match max_box_per_class {
    None | Some(0) => group.detections.iter().map(to_box).collect(),
    Some(limit) => group
      .classes
      .keys()
      .flat_map(move |&class_id| group.class_detections(class_id).take(limit))
      .map(to_box)
      .collect(),
  }
}
