// 该文件是 Kanjian （看见） 项目的一部分。
// src/convert.rs - 边界框坐标顺序转换
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

use crate::select::LabeledBox;

/// 归一化坐标 [x1, y1, x2, y2]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxXyxy(pub [f32; 4]);

/// 归一化坐标 [y1, x1, y2, x2]，绘制时使用
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxYxyx(pub [f32; 4]);

impl BoxXyxy {
  pub fn to_yxyx(self) -> BoxYxyx {
    let [x1, y1, x2, y2] = self.0;
    BoxYxyx([y1, x1, y2, x2])
  }
}

impl BoxYxyx {
  pub fn to_xyxy(self) -> BoxXyxy {
    let [y1, x1, y2, x2] = self.0;
    BoxXyxy([x1, y1, x2, y2])
  }
}

impl From<BoxXyxy> for BoxYxyx {
  fn from(bbox: BoxXyxy) -> Self {
    bbox.to_yxyx()
  }
}

impl From<BoxYxyx> for BoxXyxy {
  fn from(bbox: BoxYxyx) -> Self {
    bbox.to_xyxy()
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBox {
  pub class_id: usize,
  pub bbox: BoxYxyx,
}

/// 将筛选后的检测框逐个转为绘制顺序，空列表与单个框同样返回序列
pub fn convert_boxes(boxes: &[LabeledBox]) -> Vec<RenderBox> {
  boxes
    .iter()
    .map(|b| RenderBox {
      class_id: b.class_id,
      bbox: b.bbox.to_yxyx(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn swap_reorders_axes() {
    let converted = BoxXyxy([0.1, 0.2, 0.3, 0.4]).to_yxyx();
    assert_eq!(converted, BoxYxyx([0.2, 0.1, 0.4, 0.3]));
  }

  #[test]
  fn swap_round_trips_exactly() {
    let original = BoxXyxy([0.001, 0.99, 0.123_456_7, 0.5]);
    assert_eq!(original.to_yxyx().to_xyxy(), original);
    assert_eq!(BoxXyxy::from(BoxYxyx::from(original)), original);
  }

  #[test]
  fn empty_and_single_lists_are_sequences() {
    assert!(convert_boxes(&[]).is_empty());

    let single = [LabeledBox {
      class_id: 3,
      bbox: BoxXyxy([0.1, 0.2, 0.3, 0.4]),
    }];
    let converted = convert_boxes(&single);
    assert_eq!(
      converted,
      vec![RenderBox {
        class_id: 3,
        bbox: BoxYxyx([0.2, 0.1, 0.4, 0.3]),
      }]
    );
  }
}
